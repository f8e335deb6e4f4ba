//! Pioneer: bootstraps a freshly claimed room on its own
//!
//! A pioneer does every job in turn: harvest, refill spawn structures,
//! repair, build, upgrade. Each job hands over to the next once it runs out
//! of work, and any job goes back to harvesting once the pioneer is empty.

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{StructureKind, UnitIntent};
use crate::units::actions::{act_or_approach, transfer_energy};
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PioneerState {
    #[default]
    HarvestEnergy,
    Charge,
    Repair,
    Build,
    Upgrade,
}

impl StateMachine for PioneerState {
    fn wrap(self) -> RoleState {
        RoleState::Pioneer(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Pioneer(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            PioneerState::HarvestEnergy => "harvest",
            PioneerState::Charge => "charge",
            PioneerState::Repair => "repair",
            PioneerState::Build => "build",
            PioneerState::Upgrade => "upgrade",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<PioneerState>(unit) {
        PioneerState::HarvestEnergy => harvest(unit, ctx),
        PioneerState::Charge => charge(unit, ctx),
        PioneerState::Repair => repair(unit, ctx),
        PioneerState::Build => build(unit, ctx),
        PioneerState::Upgrade => upgrade(unit, ctx),
    }
}

/// Back to harvesting when out of energy. Returns `true` when it switched.
fn drained(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<bool> {
    if !unit.is_empty() {
        return Ok(false);
    }
    unit.transition(ctx, PioneerState::HarvestEnergy);
    harvest(unit, ctx)?;
    Ok(true)
}

fn harvest(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    let Some(target) = unit.target_room() else {
        unit.say(ctx, "no target");
        return Ok(());
    };
    if ctx.room(&target).is_none() {
        unit.say(ctx, "no room");
        return Ok(());
    }
    if unit.room() != &target {
        ctx.host_mut().travel_to(unit.name(), &target);
        return Ok(());
    }

    if unit.is_full() {
        unit.transition(ctx, PioneerState::Charge);
        return charge(unit, ctx);
    }

    let drops = ctx.dropped_energy(&target);
    if let Some(drop) = drops.iter().max_by_key(|d| d.amount) {
        act_or_approach(unit, ctx, UnitIntent::Pickup(drop.id.clone()), &drop.pos);
        return Ok(());
    }

    let sources = ctx.sources(&target);
    if let Some(source) = sources.iter().find(|s| s.energy > 0) {
        act_or_approach(unit, ctx, UnitIntent::Harvest(source.id.clone()), &source.pos);
        return Ok(());
    }

    match ctx.containers(&target).into_iter().next() {
        Some(container) => {
            act_or_approach(unit, ctx, UnitIntent::Withdraw(container.id.clone()), &container.pos);
        }
        None => unit.say(ctx, "no source"),
    }
    Ok(())
}

fn charge(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if drained(unit, ctx)? {
        return Ok(());
    }
    if transfer_energy(unit, ctx) {
        return Ok(());
    }
    unit.transition(ctx, PioneerState::Repair);
    repair(unit, ctx)
}

fn repair(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if drained(unit, ctx)? {
        return Ok(());
    }

    let room = unit.room().clone();
    let structures = ctx.structures(&room);
    let damaged = structures
        .iter()
        .find(|s| s.is_damaged() && s.kind != StructureKind::Wall);
    match damaged {
        Some(structure) => {
            act_or_approach(unit, ctx, UnitIntent::Repair(structure.id.clone()), &structure.pos);
            Ok(())
        }
        None => {
            unit.transition(ctx, PioneerState::Build);
            build(unit, ctx)
        }
    }
}

fn build(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if drained(unit, ctx)? {
        return Ok(());
    }

    let room = unit.room().clone();
    let sites = ctx.construction_sites(&room);
    match sites.first() {
        Some(site) => {
            act_or_approach(unit, ctx, UnitIntent::Build(site.id.clone()), &site.pos);
            Ok(())
        }
        None => {
            unit.transition(ctx, PioneerState::Upgrade);
            upgrade(unit, ctx)
        }
    }
}

fn upgrade(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    let room = unit.room().clone();
    let Some(controller) = ctx.room(&room).and_then(|r| r.controller.clone()) else {
        unit.say(ctx, "no controller");
        return Ok(());
    };
    if drained(unit, ctx)? {
        return Ok(());
    }

    act_or_approach(unit, ctx, UnitIntent::Upgrade(controller.id.clone()), &controller.pos);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::core::types::RoomName;
    use crate::host::{Host, SimHost};
    use crate::units::memory::{PersistedState, Role, TargetKey, UnitMemory};

    fn pioneer(state: Option<PioneerState>) -> UnitMemory {
        let mut memory = UnitMemory::new(Role::Pioneer)
            .with_target(TargetKey::Room(RoomName::from("W2N1")))
            .with_homeroom(RoomName::from("W1N1"));
        memory.state = state.map(|s| PersistedState::Known(s.wrap()));
        memory
    }

    fn run_once(host: &mut SimHost) -> Unit {
        let view = host.unit_view("p").unwrap();
        let mut unit = Unit::new(view.clone(), view.memory.unwrap());
        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(host, &config);
        run(&mut unit, &mut ctx).unwrap();
        unit
    }

    fn known(state: PioneerState) -> Option<PersistedState> {
        Some(PersistedState::Known(RoleState::Pioneer(state)))
    }

    fn new_colony() -> (SimHost, RoomName) {
        let mut host = SimHost::new();
        let target = RoomName::from("W2N1");
        host.add_room(&target, 1);
        (host, target)
    }

    #[test]
    fn test_travels_to_target_room_first() {
        let (mut host, _) = new_colony();
        host.add_room(&RoomName::from("W1N1"), 4);
        host.add_unit_at("p", &RoomName::from("W1N1"), 25, 25, pioneer(None));
        host.set_carry("p", 0, 100);

        run_once(&mut host);
        assert_eq!(host.travel_requests_of("p"), vec![RoomName::from("W2N1")]);
    }

    #[test]
    fn test_prefers_largest_drop_over_source() {
        let (mut host, target) = new_colony();
        host.add_source(&target, "src", 26, 25);
        host.add_drop(&target, 10, 10, 20);
        let big = host.add_drop(&target, 24, 25, 300);
        host.add_unit_at("p", &target, 25, 25, pioneer(None));
        host.set_carry("p", 0, 100);

        run_once(&mut host);
        assert_eq!(host.intents_of("p"), vec![UnitIntent::Pickup(big)]);
    }

    #[test]
    fn test_full_pioneer_falls_through_to_upgrade() {
        let (mut host, target) = new_colony();
        let controller = host.room(&target).unwrap().controller.unwrap();
        host.add_unit_at("p", &target, controller.pos.x, controller.pos.y + 1, pioneer(None));
        host.set_carry("p", 100, 100);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(PioneerState::Upgrade));
        assert_eq!(host.intents_of("p"), vec![UnitIntent::Upgrade(controller.id)]);
    }

    #[test]
    fn test_build_stage_uses_sites() {
        let (mut host, target) = new_colony();
        let site = host.add_site(&target, StructureKind::Spawn, 26, 26);
        host.add_unit_at("p", &target, 25, 25, pioneer(Some(PioneerState::Charge)));
        host.set_carry("p", 100, 100);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(PioneerState::Build));
        assert_eq!(host.intents_of("p"), vec![UnitIntent::Build(site)]);
    }

    #[test]
    fn test_empty_pioneer_returns_to_harvest() {
        let (mut host, target) = new_colony();
        host.add_source(&target, "src", 26, 25);
        host.add_unit_at("p", &target, 25, 25, pioneer(Some(PioneerState::Build)));
        host.set_carry("p", 0, 100);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(PioneerState::HarvestEnergy));
        assert_eq!(host.intents_of("p"), vec![UnitIntent::Harvest("src".into())]);
    }
}
