//! Structure reactors: towers and links act on their own every tick

pub mod link;
pub mod tower;

pub use link::LinkManager;
pub use tower::TowerManager;
