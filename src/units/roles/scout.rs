//! Scout: walks to a room and parks there to keep it visible

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoutState {
    #[default]
    ScoutRoom,
    Stay,
}

impl StateMachine for ScoutState {
    fn wrap(self) -> RoleState {
        RoleState::Scout(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Scout(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            ScoutState::ScoutRoom => "scout",
            ScoutState::Stay => "stay",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<ScoutState>(unit) {
        ScoutState::ScoutRoom => scout(unit, ctx),
        ScoutState::Stay => stay(unit, ctx),
    }
}

fn short_lived(unit: &Unit, ctx: &TickContext<'_>) -> bool {
    unit.view
        .ticks_to_live
        .is_some_and(|ttl| ttl < ctx.config().scout_stay_lifespan)
}

fn scout(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if let Some(target) = unit.target_room() {
        if !ctx.host_mut().travel_to(unit.name(), &target) {
            unit.transition(ctx, ScoutState::Stay);
            return Ok(());
        }
    }

    // Not worth walking further with little life left
    if short_lived(unit, ctx) {
        unit.transition(ctx, ScoutState::Stay);
    }
    Ok(())
}

fn stay(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    let displaced = unit.target_room().is_some_and(|t| unit.room() != &t);
    if displaced && !short_lived(unit, ctx) {
        unit.transition(ctx, ScoutState::ScoutRoom);
        return scout(unit, ctx);
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
        let view = host.unit_view("s").unwrap();
        let mut unit = Unit::new(view.clone(), view.memory.unwrap());
        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(host, &config);
        run(&mut unit, &mut ctx).unwrap();
        unit
    }

    fn scout_memory(state: Option<ScoutState>) -> UnitMemory {
        let mut memory =
            UnitMemory::new(Role::Scout).with_target(TargetKey::Room(RoomName::from("W2N1")));
        memory.state = state.map(|s| PersistedState::Known(s.wrap()));
        memory
    }

    fn known(state: ScoutState) -> Option<PersistedState> {
        Some(PersistedState::Known(RoleState::Scout(state)))
    }

    #[test]
    fn test_arrival_switches_to_stay() {
        let mut host = SimHost::new();
        host.add_neutral_room(&RoomName::from("W2N1"));
        host.add_unit_at("s", &RoomName::from("W2N1"), 25, 25, scout_memory(None));

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(ScoutState::Stay));
    }

    #[test]
    fn test_short_lifespan_stops_en_route() {
        let mut host = SimHost::new();
        host.add_room(&RoomName::from("W1N1"), 3);
        host.add_unit_at("s", &RoomName::from("W1N1"), 25, 25, scout_memory(None));
        host.set_ticks_to_live("s", 500);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(ScoutState::Stay));
    }

    #[test]
    fn test_displaced_scout_resumes_with_life_left() {
        let mut host = SimHost::new();
        host.add_room(&RoomName::from("W1N1"), 3);
        host.add_unit_at("s", &RoomName::from("W1N1"), 25, 25, scout_memory(Some(ScoutState::Stay)));
        host.set_ticks_to_live("s", 1450);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(ScoutState::ScoutRoom));
        assert_eq!(host.travel_requests_of("s"), vec![RoomName::from("W2N1")]);
    }

    #[test]
    fn test_stay_is_terminal_near_end_of_life() {
        let mut host = SimHost::new();
        host.add_room(&RoomName::from("W1N1"), 3);
        host.add_unit_at("s", &RoomName::from("W1N1"), 25, 25, scout_memory(Some(ScoutState::Stay)));
        host.set_ticks_to_live("s", 200);

        let unit = run_once(&mut host);
        assert_eq!(unit.memory.state, known(ScoutState::Stay));
        assert!(host.travel_requests_of("s").is_empty());
    }
}
