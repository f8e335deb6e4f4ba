//! Colony demand scheduler
//!
//! One manager per role family. Every tick a manager runs the state machines
//! of its units; every `demand_interval` ticks it also works out how many
//! units of its roles each room needs and queues spawn orders for the gap.
//!
//! Managers declare which priority phases they act in. The overseer calls
//! them phase by phase, highest first.

pub mod build;
pub mod claim;
pub mod harvest;
pub mod haul;
pub mod idle;
pub mod pioneer;
pub mod port;
pub mod remote;
pub mod upgrade;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::core::types::{RoomName, Tick};
use crate::spawning::{Order, OrderBook, Priority};
use crate::units::memory::{Role, TargetKey, UnitMemory};
use crate::units::run_role_units;

pub use build::{required_builders, BuildManager};
pub use claim::ClaimManager;
pub use harvest::HarvestManager;
pub use haul::HaulManager;
pub use idle::IdleManager;
pub use pioneer::PioneerManager;
pub use port::PortManager;
pub use remote::RemoteManager;
pub use upgrade::UpgradeManager;

/// Per-manager persisted state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerMemory {
    /// Tick of the last demand recomputation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<Tick>,
}

/// Colony-wide persisted state: spawn queues plus manager bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColonyMemory {
    #[serde(default)]
    pub orders: OrderBook,
    #[serde(default)]
    pub managers: BTreeMap<String, ManagerMemory>,
}

impl ColonyMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_run(&self, manager: &str) -> Option<Tick> {
        self.managers.get(manager).and_then(|m| m.last_run)
    }

    /// Whether `manager` should recompute demand at `tick`.
    ///
    /// Due on the first call, then once `interval` ticks have passed since the
    /// last recomputation. Records `tick` as the new last run when due.
    pub fn demand_due(&mut self, manager: &str, tick: Tick, interval: Tick) -> bool {
        let memory = self.managers.entry(manager.to_string()).or_default();
        let due = memory
            .last_run
            .map_or(true, |last| tick >= last.saturating_add(interval));
        if due {
            memory.last_run = Some(tick);
        }
        due
    }

    /// Queue `order` on the spawn queue of `room`
    pub fn place_order(&mut self, room: &RoomName, order: Order) {
        tracing::debug!(
            room = %room,
            role = order.memory.role.name(),
            priority = ?order.priority,
            target = ?order.memory.target,
            parts = order.body.len(),
            "spawn order queued"
        );
        self.orders.push(room, order);
    }
}

/// A demand scheduler or structure reactor
pub trait Manager {
    fn name(&self) -> &'static str;

    /// Priority phases this manager acts in
    fn phases(&self) -> &'static [Priority];

    fn run(
        &mut self,
        phase: Priority,
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
    ) -> Result<()>;
}

/// Phase every role family runs in
pub const ROLE_PHASE: &[Priority] = &[Priority::Low];

/// Run the units of `roles`, then recompute demand with `organize` when due
pub(crate) fn run_role_family(
    name: &str,
    roles: &[Role],
    ctx: &mut TickContext<'_>,
    colony: &mut ColonyMemory,
    organize: impl FnOnce(&mut TickContext<'_>, &mut ColonyMemory) -> Result<()>,
) -> Result<()> {
    for role in roles {
        run_role_units(ctx, *role);
    }

    let interval = ctx.config().demand_interval;
    if colony.demand_due(name, ctx.tick(), interval) {
        tracing::debug!(manager = name, tick = ctx.tick(), "recomputing demand");
        organize(ctx, colony)?;
    }
    Ok(())
}

/// Live units plus queued orders for a (role, target) key on `spawn_room`'s queue
pub(crate) fn outstanding(
    ctx: &mut TickContext<'_>,
    colony: &ColonyMemory,
    spawn_room: &RoomName,
    role: Role,
    target: Option<&TargetKey>,
    homeroom: Option<&RoomName>,
) -> u32 {
    ctx.count_units(role, target, homeroom) + colony.orders.count(spawn_room, role, target)
}

/// Seed memory for a unit ordered by `room`
pub(crate) fn seed(role: Role, room: &RoomName, tier: u32) -> UnitMemory {
    UnitMemory::new(role).with_homeroom(room.clone()).with_tier(tier)
}

/// Every manager in its default configuration
pub fn default_managers() -> Vec<Box<dyn Manager>> {
    vec![
        Box::new(crate::structures::TowerManager),
        Box::new(crate::structures::LinkManager),
        Box::new(HarvestManager),
        Box::new(HaulManager),
        Box::new(PortManager),
        Box::new(BuildManager),
        Box::new(UpgradeManager),
        Box::new(ClaimManager),
        Box::new(PioneerManager),
        Box::new(RemoteManager),
        Box::new(IdleManager),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BodyPart;

    #[test]
    fn test_first_run_is_always_due() {
        let mut colony = ColonyMemory::new();
        assert!(colony.demand_due("HarvestManager", 5, 20));
        assert_eq!(colony.last_run("HarvestManager"), Some(5));
    }

    #[test]
    fn test_debounce_window() {
        let mut colony = ColonyMemory::new();
        assert!(colony.demand_due("BuildManager", 100, 20));
        for tick in 101..120 {
            assert!(!colony.demand_due("BuildManager", tick, 20), "tick {tick}");
        }
        assert_eq!(colony.last_run("BuildManager"), Some(100));
        assert!(colony.demand_due("BuildManager", 120, 20));
        assert_eq!(colony.last_run("BuildManager"), Some(120));
    }

    #[test]
    fn test_managers_debounce_independently() {
        let mut colony = ColonyMemory::new();
        assert!(colony.demand_due("A", 10, 20));
        assert!(colony.demand_due("B", 15, 20));
        assert!(!colony.demand_due("A", 15, 20));
    }

    #[test]
    fn test_colony_memory_json() {
        let mut colony = ColonyMemory::new();
        colony.demand_due("HaulManager", 42, 20);
        colony.place_order(
            &RoomName::from("W1N1"),
            Order::new(vec![BodyPart::Move], Priority::Important, UnitMemory::new(Role::Scout)),
        );
        let json = serde_json::to_string(&colony).unwrap();
        let restored: ColonyMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, colony);
    }
}
