//! Host capability surface
//!
//! The simulation itself lives outside this crate. Everything the controller
//! needs from it goes through the [`Host`] trait: point-in-time snapshots of
//! rooms and units, and intent submission. Intents are queued by the host and
//! resolved together at the end of the tick, so every read during a tick sees
//! the state the tick started with.

pub mod sim;

use serde::{Deserialize, Serialize};

use crate::core::types::{count_parts, BodyPart, ObjectId, Position, RoomName, Store, Tick};
use crate::units::memory::UnitMemory;

pub use sim::SimHost;

/// Kinds of structure the controller reasons about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Spawn,
    Extension,
    Tower,
    Container,
    Storage,
    Link,
    Road,
    Wall,
    Rampart,
    Extractor,
}

impl StructureKind {
    /// Walls and ramparts are maintained by towers, never by worker units
    pub fn is_fortification(self) -> bool {
        matches!(self, StructureKind::Wall | StructureKind::Rampart)
    }

    /// Structures that feed spawning (spawn, extensions) or defence (towers)
    pub fn is_energy_sink(self) -> bool {
        matches!(
            self,
            StructureKind::Spawn | StructureKind::Extension | StructureKind::Tower
        )
    }
}

/// Snapshot of a structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: ObjectId,
    pub kind: StructureKind,
    pub pos: Position,
    pub hits: u32,
    pub hits_max: u32,
    /// Energy store, for structures that hold energy
    pub store: Option<Store>,
}

impl Structure {
    pub fn energy(&self) -> u32 {
        self.store.map(|s| s.energy).unwrap_or(0)
    }

    pub fn free_capacity(&self) -> u32 {
        self.store.map(|s| s.free()).unwrap_or(0)
    }

    pub fn is_damaged(&self) -> bool {
        self.hits < self.hits_max
    }

    pub fn repair_debt(&self) -> u64 {
        self.hits_max.saturating_sub(self.hits) as u64
    }
}

/// Snapshot of a room controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub id: ObjectId,
    pub pos: Position,
    pub level: u8,
    pub my: bool,
}

/// Room-level state the controller reads every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub controller: Option<Controller>,
    /// Energy currently in spawns and extensions
    pub energy_available: u32,
    /// Total spawn + extension capacity
    pub energy_capacity_available: u32,
}

impl RoomSnapshot {
    pub fn is_mine(&self) -> bool {
        self.controller.as_ref().map(|c| c.my).unwrap_or(false)
    }

    pub fn controller_level(&self) -> u8 {
        self.controller.as_ref().map(|c| c.level).unwrap_or(0)
    }

    pub fn spawn_energy_full(&self) -> bool {
        self.energy_available >= self.energy_capacity_available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: ObjectId,
    pub pos: Position,
    pub energy: u32,
    pub energy_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mineral {
    pub id: ObjectId,
    pub pos: Position,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub id: ObjectId,
    pub pos: Position,
    pub kind: StructureKind,
    pub progress: u32,
    pub progress_total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedEnergy {
    pub id: ObjectId,
    pub pos: Position,
    pub amount: u32,
}

/// A unit owned by another player (or an NPC invader)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hostile {
    pub id: ObjectId,
    pub pos: Position,
    pub owner: String,
    pub hits: u32,
    pub body: Vec<BodyPart>,
}

/// Owner name of NPC invaders
pub const INVADER_OWNER: &str = "Invader";

impl Hostile {
    /// Whether the unit can deal damage (melee or ranged)
    pub fn is_armed(&self) -> bool {
        count_parts(&self.body, BodyPart::Attack) > 0
            || count_parts(&self.body, BodyPart::RangedAttack) > 0
    }

    pub fn is_invader(&self) -> bool {
        self.owner == INVADER_OWNER
    }
}

/// Snapshot of one of our own units, including its persisted memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub name: String,
    pub pos: Position,
    pub store: Store,
    pub body: Vec<BodyPart>,
    pub ticks_to_live: Option<u32>,
    pub spawning: bool,
    pub memory: Option<UnitMemory>,
}

impl UnitView {
    pub fn room(&self) -> &RoomName {
        &self.pos.room
    }

    pub fn parts(&self, part: BodyPart) -> u32 {
        count_parts(&self.body, part)
    }
}

/// Actions a unit can request. At most one is issued per unit per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitIntent {
    /// Step toward a position in the unit's current room
    Move(Position),
    Harvest(ObjectId),
    Transfer(ObjectId),
    /// Hand energy to another of our units, by name
    TransferToUnit(String),
    Withdraw(ObjectId),
    Pickup(ObjectId),
    /// Drop all carried energy on the current tile
    Drop,
    Build(ObjectId),
    Repair(ObjectId),
    Upgrade(ObjectId),
    Attack(ObjectId),
    Claim(ObjectId),
}

impl UnitIntent {
    /// Range the target must be within for the intent to succeed
    pub fn required_range(&self) -> u32 {
        match self {
            UnitIntent::Build(_) | UnitIntent::Repair(_) | UnitIntent::Upgrade(_) => 3,
            _ => 1,
        }
    }
}

/// Actions a static structure can request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureIntent {
    TowerAttack(ObjectId),
    TowerRepair(ObjectId),
    LinkTransfer(ObjectId),
}

/// Outcome of an intent submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentResult {
    Ok,
    /// The expected signal to start moving toward the target
    NotInRange,
    Full,
    NotEnoughEnergy,
    InvalidTarget,
    NoBodypart,
    NoPath,
    Busy,
}

impl IntentResult {
    pub fn is_ok(self) -> bool {
        self == IntentResult::Ok
    }
}

/// Everything the controller consumes from the world.
///
/// Reads are snapshots taken at tick start. Writes queue intents that the
/// host resolves atomically when the tick ends.
pub trait Host {
    fn tick(&self) -> Tick;

    /// Rooms we currently have visibility into
    fn visible_rooms(&self) -> Vec<RoomName>;
    fn room(&self, name: &RoomName) -> Option<RoomSnapshot>;
    fn structures(&self, room: &RoomName) -> Vec<Structure>;
    fn sources(&self, room: &RoomName) -> Vec<Source>;
    fn minerals(&self, room: &RoomName) -> Vec<Mineral>;
    fn construction_sites(&self, room: &RoomName) -> Vec<ConstructionSite>;
    fn dropped_energy(&self, room: &RoomName) -> Vec<DroppedEnergy>;
    fn hostiles(&self, room: &RoomName) -> Vec<Hostile>;
    /// Rooms reachable through this room's exits. Works without visibility.
    fn exits(&self, room: &RoomName) -> Vec<RoomName>;

    /// All of our units, with their persisted memory
    fn units(&self) -> Vec<UnitView>;
    fn set_unit_memory(&mut self, unit: &str, memory: UnitMemory);

    fn issue(&mut self, unit: &str, intent: UnitIntent) -> IntentResult;
    fn issue_structure(&mut self, structure: &ObjectId, intent: StructureIntent) -> IntentResult;

    /// Path toward a room. Returns `true` while the unit is still on its way,
    /// `false` once it is inside the destination room.
    fn travel_to(&mut self, unit: &str, room: &RoomName) -> bool;

    fn activate_safe_mode(&mut self, room: &RoomName) -> IntentResult;

    /// Attach a short diagnostic marker to a unit
    fn say(&mut self, unit: &str, message: &str);
}

/// Closest item to `from` by range, ties broken by input order
pub fn closest_by_range<'a, T>(
    from: &Position,
    items: impl IntoIterator<Item = &'a T>,
    pos_of: impl Fn(&T) -> &Position,
) -> Option<&'a T>
where
    T: 'a,
{
    let mut best: Option<(&'a T, u32)> = None;
    for item in items {
        let range = from.range_to(pos_of(item));
        if range == u32::MAX {
            continue;
        }
        match best {
            Some((_, best_range)) if best_range <= range => {}
            _ => best = Some((item, range)),
        }
    }
    best.map(|(item, _)| item)
}
