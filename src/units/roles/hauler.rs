//! Hauler state machine, shared by haulers, porters and remote haulers
//!
//! Haulers move energy from where it piles up (drops, tanks, storage) to
//! where it is consumed. Remote haulers do the same between the remote tanks
//! of their home room and the home room itself.

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::core::types::RoomName;
use crate::host::{closest_by_range, DroppedEnergy, Structure, UnitIntent};
use crate::units::actions::{act_or_approach, transfer_energy};
use crate::units::memory::{Role, RoleState};
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaulerState {
    #[default]
    HaulEnergy,
    TransferEnergy,
}

impl StateMachine for HaulerState {
    fn wrap(self) -> RoleState {
        RoleState::Hauler(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Hauler(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            HaulerState::HaulEnergy => "haul",
            HaulerState::TransferEnergy => "transfer",
        }
    }
}

/// Local haulers and porters
pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<HaulerState>(unit) {
        HaulerState::HaulEnergy => haul(unit, ctx, false),
        HaulerState::TransferEnergy => transfer(unit, ctx, false),
    }
}

/// Remote haulers
pub fn run_remote(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<HaulerState>(unit) {
        HaulerState::HaulEnergy => haul(unit, ctx, true),
        HaulerState::TransferEnergy => transfer(unit, ctx, true),
    }
}

fn haul(unit: &mut Unit, ctx: &mut TickContext<'_>, remote: bool) -> Result<()> {
    if unit.is_full() {
        unit.transition(ctx, HaulerState::TransferEnergy);
        return transfer(unit, ctx, remote);
    }

    let home = unit.homeroom();
    let Some(home_snapshot) = ctx.room(&home) else {
        unit.say(ctx, "no room");
        return Ok(());
    };
    if !remote && unit.room() != &home {
        ctx.host_mut().travel_to(unit.name(), &home);
        return Ok(());
    }

    let need = unit.free_capacity();
    let here = unit.room().clone();
    let drops = ctx.dropped_energy(&here);
    if let Some(drop) = largest_drop(&drops, need) {
        act_or_approach(unit, ctx, UnitIntent::Pickup(drop.id.clone()), &drop.pos);
        return Ok(());
    }

    let tanks = if remote { ctx.remote_tanks(&home) } else { ctx.tanks(&home) };
    let bank = fullest_tank(tanks.iter().map(|t| &t.structure), need)
        .cloned()
        .or_else(|| {
            ctx.storage(&home)
                .filter(|s| s.energy() >= need && !home_snapshot.spawn_energy_full())
        });

    let Some(bank) = bank else {
        tracing::debug!(unit = unit.name(), room = %home, "nothing to haul");
        return Ok(());
    };

    if remote && ctx.host_mut().travel_to(unit.name(), &bank.pos.room) {
        return Ok(());
    }
    act_or_approach(unit, ctx, UnitIntent::Withdraw(bank.id.clone()), &bank.pos);
    Ok(())
}

fn transfer(unit: &mut Unit, ctx: &mut TickContext<'_>, remote: bool) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, HaulerState::HaulEnergy);
        return haul(unit, ctx, remote);
    }

    let home = unit.homeroom();
    if unit.room() != &home {
        ctx.host_mut().travel_to(unit.name(), &home);
        return Ok(());
    }

    if transfer_energy(unit, ctx) {
        return Ok(());
    }

    // Containers away from sources are buffers for builders and upgraders
    let loose = ctx.non_tank_containers(&home);
    let container = loose
        .iter()
        .filter(|c| c.free_capacity() > 0)
        .min_by_key(|c| c.energy());
    if let Some(container) = container {
        act_or_approach(unit, ctx, UnitIntent::Transfer(container.id.clone()), &container.pos);
        return Ok(());
    }

    if let Some(storage) = ctx.storage(&home).filter(|s| s.free_capacity() > 0) {
        act_or_approach(unit, ctx, UnitIntent::Transfer(storage.id.clone()), &storage.pos);
        return Ok(());
    }

    donate(unit, ctx, &home);
    Ok(())
}

/// Hand energy straight to a worker, builders preferred for most of each period
fn donate(unit: &Unit, ctx: &mut TickContext<'_>, room: &RoomName) {
    let preferred = if ctx.config().donation_prefers_builder(ctx.tick()) {
        [Role::Builder, Role::Upgrader]
    } else {
        [Role::Upgrader, Role::Builder]
    };

    let units = ctx.units();
    for role in preferred {
        let candidates = units.iter().filter(|u| {
            u.name != unit.name()
                && !u.spawning
                && u.room() == room
                && u.store.free() > 0
                && u.memory.as_ref().is_some_and(|m| m.role == role)
        });
        if let Some(receiver) = closest_by_range(unit.pos(), candidates, |u| &u.pos) {
            act_or_approach(
                unit,
                ctx,
                UnitIntent::TransferToUnit(receiver.name.clone()),
                &receiver.pos,
            );
            return;
        }
    }
    tracing::debug!(unit = unit.name(), room = %room, "no receiver for energy");
}

/// Largest pile the unit can fill up from. Later piles win ties.
fn largest_drop(drops: &[DroppedEnergy], need: u32) -> Option<&DroppedEnergy> {
    drops
        .iter()
        .filter(|d| d.amount >= need)
        .max_by_key(|d| d.amount)
}

/// Tank with the least free capacity among those that can fill the unit
fn fullest_tank<'a>(
    tanks: impl Iterator<Item = &'a Structure>,
    need: u32,
) -> Option<&'a Structure> {
    tanks
        .filter(|t| t.energy() >= need)
        .min_by_key(|t| t.free_capacity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::core::types::{ObjectId, Position};
    use crate::host::{SimHost, StructureKind};
    use crate::units::memory::{PersistedState, UnitMemory};

    fn hauler_memory(role: Role) -> UnitMemory {
        UnitMemory::new(role).with_homeroom(RoomName::from("W1N1"))
    }

    fn setup() -> (SimHost, RoomName) {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 4);
        host.add_source(&room, "src1", 10, 10);
        host.add_source(&room, "src2", 40, 40);
        (host, room)
    }

    fn run_with(host: &mut SimHost, name: &str, config: &OverseerConfig) -> Unit {
        let view = host.unit_view(name).unwrap();
        let mut unit = Unit::new(view.clone(), view.memory.unwrap());
        let mut ctx = TickContext::new(host, config);
        let runner = if unit.memory.role == Role::RemoteHauler { run_remote } else { run };
        runner(&mut unit, &mut ctx).unwrap();
        unit
    }

    fn run_once(host: &mut SimHost, name: &str) -> Unit {
        run_with(host, name, &OverseerConfig::default())
    }

    #[test]
    fn test_picks_largest_sufficient_drop() {
        let (mut host, room) = setup();
        host.add_drop(&room, 20, 20, 30);
        let big = host.add_drop(&room, 22, 20, 120);
        host.add_drop(&room, 24, 20, 80);
        host.add_unit_at("c", &room, 21, 20, hauler_memory(Role::Hauler));
        host.set_carry("c", 0, 50);

        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::Pickup(big)]);
    }

    #[test]
    fn test_drains_tank_with_least_free_capacity() {
        let (mut host, room) = setup();
        host.add_container(&room, 11, 11, 600);
        let fuller = host.add_container(&room, 39, 39, 1500);
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 0, 100);

        run_once(&mut host, "c");
        assert_eq!(
            host.intents_of("c"),
            vec![UnitIntent::Move(host.structure(&fuller).unwrap().pos)]
        );
    }

    #[test]
    fn test_storage_only_when_spawn_energy_low() {
        let (mut host, room) = setup();
        let storage = host.add_structure(&room, StructureKind::Storage, 26, 25);
        host.set_store(&room, StructureKind::Storage, 5000);
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 0, 100);

        host.set_spawn_energy(&room, 300, 300);
        run_once(&mut host, "c");
        assert!(host.intents_of("c").is_empty());

        host.set_spawn_energy(&room, 100, 300);
        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::Withdraw(storage)]);
    }

    #[test]
    fn test_full_hauler_fills_sinks_first() {
        let (mut host, room) = setup();
        let spawn = host.add_structure(&room, StructureKind::Spawn, 26, 26);
        host.add_container(&room, 30, 30, 0);
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 100, 100);

        let unit = run_once(&mut host, "c");
        assert_eq!(
            unit.memory.state,
            Some(PersistedState::Known(RoleState::Hauler(HaulerState::TransferEnergy)))
        );
        assert_eq!(host.intents_of("c"), vec![UnitIntent::Transfer(spawn)]);
    }

    #[test]
    fn test_falls_back_to_least_full_loose_container() {
        let (mut host, room) = setup();
        let spawn = host.add_structure(&room, StructureKind::Spawn, 26, 26);
        host.fill_structure(&spawn);
        host.add_container(&room, 24, 24, 900);
        let emptier = host.add_container(&room, 26, 24, 100);
        // a tank next to the source is never a delivery target
        host.add_container(&room, 11, 10, 0);
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 100, 100);

        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::Transfer(emptier)]);
    }

    #[test]
    fn test_donation_alternates_by_tick() {
        let (mut host, room) = setup();
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 100, 100);
        host.add_unit_at("b", &room, 26, 25, UnitMemory::new(Role::Builder));
        host.add_unit_at("u", &room, 24, 25, UnitMemory::new(Role::Upgrader));

        host.set_tick(10);
        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::TransferToUnit("b".into())]);

        host.set_tick(170);
        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::TransferToUnit("u".into())]);
    }

    #[test]
    fn test_donation_falls_back_to_other_role() {
        let (mut host, room) = setup();
        host.add_unit_at("c", &room, 25, 25, hauler_memory(Role::Hauler));
        host.set_carry("c", 100, 100);
        host.add_unit_at("u", &room, 24, 25, UnitMemory::new(Role::Upgrader));

        host.set_tick(10);
        run_once(&mut host, "c");
        assert_eq!(host.intents_of("c"), vec![UnitIntent::TransferToUnit("u".into())]);
    }

    #[test]
    fn test_remote_hauler_travels_to_remote_tank() {
        let (mut host, home) = setup();
        let remote = RoomName::from("W2N1");
        host.add_room(&remote, 0);
        host.set_exits(&home, &["W2N1"]);
        host.add_source(&remote, "rsrc", 10, 10);
        host.add_container(&remote, 11, 10, 1000);
        host.add_unit_at("r", &home, 25, 25, hauler_memory(Role::RemoteHauler));
        host.set_carry("r", 0, 100);

        run_once(&mut host, "r");
        assert_eq!(host.travel_requests_of("r"), vec![remote]);
        assert!(host.intents_of("r").is_empty());
    }

    #[test]
    fn test_remote_hauler_returns_home_to_unload() {
        let (mut host, home) = setup();
        let remote = RoomName::from("W2N1");
        host.add_room(&remote, 0);
        host.add_unit_at("r", &remote, 10, 10, hauler_memory(Role::RemoteHauler));
        host.set_carry("r", 100, 100);

        run_once(&mut host, "r");
        assert_eq!(host.travel_requests_of("r"), vec![home]);
    }

    #[test]
    fn test_drop_selection_prefers_later_on_tie() {
        let drops = vec![
            DroppedEnergy { id: ObjectId::from("a"), pos: Position::new("W1N1", 1, 1), amount: 100 },
            DroppedEnergy { id: ObjectId::from("b"), pos: Position::new("W1N1", 2, 2), amount: 100 },
        ];
        assert_eq!(largest_drop(&drops, 50).unwrap().id, ObjectId::from("b"));
        assert!(largest_drop(&drops, 150).is_none());
    }
}
