//! Colony Overseer - rule-based controller for a tick-driven colony simulation
//!
//! Units follow per-role state machines. Demand managers decide how many
//! units each room needs and queue prioritised spawn orders. Towers and links
//! react to the room every tick.

pub mod colony;
pub mod core;
pub mod host;
pub mod managers;
pub mod overseer;
pub mod spawning;
pub mod structures;
pub mod units;

pub use crate::core::config::OverseerConfig;
pub use crate::core::error::{OverseerError, Result};
pub use crate::host::{Host, SimHost};
pub use crate::overseer::{Overseer, TickReport};
