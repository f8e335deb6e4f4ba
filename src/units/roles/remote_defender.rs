//! Remote defender: clears invaders out of a remote room

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{closest_by_range, UnitIntent};
use crate::units::actions::act_or_approach;
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteDefenderState {
    #[default]
    MoveToRoom,
    DefendRoom,
}

impl StateMachine for RemoteDefenderState {
    fn wrap(self) -> RoleState {
        RoleState::RemoteDefender(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::RemoteDefender(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            RemoteDefenderState::MoveToRoom => "march",
            RemoteDefenderState::DefendRoom => "defend",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<RemoteDefenderState>(unit) {
        RemoteDefenderState::MoveToRoom => move_to_room(unit, ctx),
        RemoteDefenderState::DefendRoom => defend(unit, ctx),
    }
}

fn move_to_room(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if let Some(target) = unit.target_room() {
        if unit.room() != &target {
            ctx.host_mut().travel_to(unit.name(), &target);
            return Ok(());
        }
    }
    unit.transition(ctx, RemoteDefenderState::DefendRoom);
    defend(unit, ctx)
}

fn defend(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    let room = unit.room().clone();
    let hostiles = ctx.hostiles(&room);
    if let Some(hostile) = closest_by_range(unit.pos(), hostiles.iter(), |h| &h.pos) {
        act_or_approach(unit, ctx, UnitIntent::Attack(hostile.id.clone()), &hostile.pos);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::core::types::RoomName;
    use crate::host::SimHost;
    use crate::units::memory::{PersistedState, Role, TargetKey, UnitMemory};

    fn run_once(host: &mut SimHost) -> Unit {
        let view = host.unit_view("d").unwrap();
        let mut unit = Unit::new(view.clone(), view.memory.unwrap());
        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(host, &config);
        run(&mut unit, &mut ctx).unwrap();
        unit
    }

    fn defender() -> UnitMemory {
        UnitMemory::new(Role::RemoteDefender).with_target(TargetKey::Room(RoomName::from("W2N1")))
    }

    #[test]
    fn test_marches_then_attacks_closest() {
        let mut host = SimHost::new();
        let remote = RoomName::from("W2N1");
        host.add_neutral_room(&remote);
        host.add_hostile(&remote, "far", 40, 40, true);
        let near = host.add_hostile(&remote, "near", 26, 25, true);
        host.add_unit_at("d", &remote, 25, 25, defender());

        let unit = run_once(&mut host);
        assert_eq!(
            unit.memory.state,
            Some(PersistedState::Known(RoleState::RemoteDefender(
                RemoteDefenderState::DefendRoom
            )))
        );
        assert_eq!(host.intents_of("d"), vec![UnitIntent::Attack(near)]);
    }

    #[test]
    fn test_travels_when_outside_target() {
        let mut host = SimHost::new();
        host.add_room(&RoomName::from("W1N1"), 3);
        host.add_unit_at("d", &RoomName::from("W1N1"), 25, 25, defender());

        run_once(&mut host);
        assert_eq!(host.travel_requests_of("d"), vec![RoomName::from("W2N1")]);
    }
}
