//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Width and height of a room in tiles
pub const ROOM_SIZE: u8 = 50;

/// Name of a room on the world map (e.g. `E5S37`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Opaque host identifier of a world object (structure, source, site, hostile...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A tile position inside a named room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub room: RoomName,
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub fn new(room: impl Into<RoomName>, x: u8, y: u8) -> Self {
        Self { room: room.into(), x, y }
    }

    /// Center tile of a room, used as the default travel destination
    pub fn center_of(room: &RoomName) -> Self {
        Self { room: room.clone(), x: ROOM_SIZE / 2, y: ROOM_SIZE / 2 }
    }

    /// Chebyshev distance to another position.
    ///
    /// Positions in different rooms are treated as infinitely far apart (`u32::MAX`).
    pub fn range_to(&self, other: &Position) -> u32 {
        if self.room != other.room {
            return u32::MAX;
        }
        let dx = (self.x as i32 - other.x as i32).unsigned_abs();
        let dy = (self.y as i32 - other.y as i32).unsigned_abs();
        dx.max(dy)
    }

    pub fn in_range_to(&self, other: &Position, range: u32) -> bool {
        self.range_to(other) <= range
    }

    /// One step toward `goal` inside the same room
    pub fn step_toward(&self, goal: &Position) -> Position {
        let step = |from: u8, to: u8| match from.cmp(&to) {
            std::cmp::Ordering::Less => from + 1,
            std::cmp::Ordering::Greater => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        Position {
            room: self.room.clone(),
            x: step(self.x, goal.x),
            y: step(self.y, goal.y),
        }
    }
}

/// Energy store of a unit or structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub energy: u32,
    pub capacity: u32,
}

impl Store {
    pub fn new(energy: u32, capacity: u32) -> Self {
        Self { energy, capacity }
    }

    pub fn empty(capacity: u32) -> Self {
        Self { energy: 0, capacity }
    }

    pub fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.energy)
    }

    /// A store with no capacity is never full
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.free() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.energy == 0
    }
}

/// Body part tokens. The manifest determines what a unit can do and what it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Heal,
    Claim,
    Tough,
}

impl BodyPart {
    /// Spawn cost in energy
    pub fn cost(self) -> u32 {
        match self {
            BodyPart::Move => 50,
            BodyPart::Work => 100,
            BodyPart::Carry => 50,
            BodyPart::Attack => 80,
            BodyPart::RangedAttack => 150,
            BodyPart::Heal => 250,
            BodyPart::Claim => 600,
            BodyPart::Tough => 10,
        }
    }
}

/// Energy capacity contributed by a single CARRY part
pub const CARRY_CAPACITY: u32 = 50;

/// Count parts of one kind in a body
pub fn count_parts(body: &[BodyPart], part: BodyPart) -> u32 {
    body.iter().filter(|p| **p == part).count() as u32
}
