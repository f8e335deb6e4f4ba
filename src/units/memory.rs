//! Persisted per-unit memory
//!
//! The host stores this block alongside each unit and hands it back every
//! tick. Only the unit's own state machine writes it.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{ObjectId, RoomName};
use crate::units::roles::{
    builder::BuilderState, claimer::ClaimerState, harvester::HarvesterState,
    hauler::HaulerState, pioneer::PioneerState, remote_builder::RemoteBuilderState,
    remote_defender::RemoteDefenderState, scout::ScoutState, upgrader::UpgraderState,
};

/// Behavioral category of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Harvester,
    Upgrader,
    Builder,
    Hauler,
    Claimer,
    Pioneer,
    RemoteBuilder,
    Scout,
    RemoteDefender,
    RemoteHauler,
    Porter,
}

impl Role {
    pub const ALL: [Role; 11] = [
        Role::Harvester,
        Role::Upgrader,
        Role::Builder,
        Role::Hauler,
        Role::Claimer,
        Role::Pioneer,
        Role::RemoteBuilder,
        Role::Scout,
        Role::RemoteDefender,
        Role::RemoteHauler,
        Role::Porter,
    ];

    /// Short lowercase name, used for unit names and log fields
    pub fn name(self) -> &'static str {
        match self {
            Role::Harvester => "harvester",
            Role::Upgrader => "upgrader",
            Role::Builder => "builder",
            Role::Hauler => "hauler",
            Role::Claimer => "claimer",
            Role::Pioneer => "pioneer",
            Role::RemoteBuilder => "remote-builder",
            Role::Scout => "scout",
            Role::RemoteDefender => "remote-defender",
            Role::RemoteHauler => "remote-hauler",
            Role::Porter => "porter",
        }
    }
}

/// What a unit is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKey {
    /// A whole room (claim, scout, pioneer, remote work)
    Room(RoomName),
    /// A specific object, together with the room it lives in
    Object { room: RoomName, id: ObjectId },
}

impl TargetKey {
    pub fn object(room: impl Into<RoomName>, id: impl Into<ObjectId>) -> Self {
        TargetKey::Object { room: room.into(), id: id.into() }
    }

    pub fn room(&self) -> &RoomName {
        match self {
            TargetKey::Room(room) => room,
            TargetKey::Object { room, .. } => room,
        }
    }

    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            TargetKey::Room(_) => None,
            TargetKey::Object { id, .. } => Some(id),
        }
    }
}

/// State of a unit's state machine, tagged by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "machine", content = "state")]
pub enum RoleState {
    Harvester(HarvesterState),
    Hauler(HaulerState),
    Builder(BuilderState),
    Upgrader(UpgraderState),
    Claimer(ClaimerState),
    Pioneer(PioneerState),
    Scout(ScoutState),
    RemoteBuilder(RemoteBuilderState),
    RemoteDefender(RemoteDefenderState),
}

/// Persisted state slot.
///
/// Anything that does not decode as a [`RoleState`] is kept verbatim so the
/// state machine can report it and reset, instead of the whole memory block
/// failing to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedState {
    Known(RoleState),
    Unrecognized(serde_json::Value),
}

/// Memory block seeded by the spawn order and carried for the unit's life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMemory {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PersistedState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homeroom: Option<RoomName>,
    #[serde(default)]
    pub tier: u32,
}

impl UnitMemory {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: None,
            target: None,
            homeroom: None,
            tier: 0,
        }
    }

    pub fn with_target(mut self, target: TargetKey) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_homeroom(mut self, room: RoomName) -> Self {
        self.homeroom = Some(room);
        self
    }

    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    /// Whether this unit counts toward the (role, target, homeroom) key.
    /// `None` filters match anything.
    pub fn matches(
        &self,
        role: Role,
        target: Option<&TargetKey>,
        homeroom: Option<&RoomName>,
    ) -> bool {
        self.role == role
            && target.map_or(true, |t| self.target.as_ref() == Some(t))
            && homeroom.map_or(true, |h| self.homeroom.as_ref() == Some(h))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
