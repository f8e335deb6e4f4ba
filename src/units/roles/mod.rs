//! One state machine per role

pub mod builder;
pub mod claimer;
pub mod harvester;
pub mod hauler;
pub mod pioneer;
pub mod remote_builder;
pub mod remote_defender;
pub mod scout;
pub mod upgrader;
