pub mod config;
pub mod error;
pub mod types;

pub use config::OverseerConfig;
pub use error::{OverseerError, Result};
pub use types::{BodyPart, ObjectId, Position, RoomName, Store, Tick};
