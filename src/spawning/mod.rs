//! Spawn orders, queues and body composition

pub mod order;
pub mod profile;
pub mod queue;

pub use order::{Order, Priority};
pub use profile::{body_cost, compose_body, max_affordable_tier, rcl2_harvester_body, BodyProfile};
pub use queue::{OrderBook, OrderQueue};
