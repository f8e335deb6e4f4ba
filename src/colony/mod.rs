//! Colony-level view of the world for a single tick

pub mod classify;
pub mod context;

pub use classify::{classify, RoomType, DEVELOPED_LEVEL};
pub use context::{Tank, TankNode, TickContext};
