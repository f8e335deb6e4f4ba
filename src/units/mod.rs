//! Units and their per-role state machines
//!
//! Each live unit runs its role's state machine once per tick. The loop here
//! takes a unit out of the tick snapshot, lets the state machine mutate a
//! private copy of its memory, and hands the memory back to the host when it
//! changed. One unit failing never stops the others.

pub mod actions;
pub mod memory;
pub mod roles;

use std::fmt::Debug;

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::core::types::{Position, RoomName, Store};
use crate::host::UnitView;
use crate::units::memory::{PersistedState, Role, RoleState, TargetKey, UnitMemory};

/// A unit being run this tick: the tick-start snapshot plus its working memory
#[derive(Debug, Clone)]
pub struct Unit {
    pub view: UnitView,
    pub memory: UnitMemory,
}

impl Unit {
    pub fn new(view: UnitView, memory: UnitMemory) -> Self {
        Self { view, memory }
    }

    pub fn name(&self) -> &str {
        &self.view.name
    }

    pub fn pos(&self) -> &Position {
        &self.view.pos
    }

    pub fn room(&self) -> &RoomName {
        &self.view.pos.room
    }

    pub fn store(&self) -> Store {
        self.view.store
    }

    pub fn is_full(&self) -> bool {
        self.view.store.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.view.store.is_empty()
    }

    pub fn free_capacity(&self) -> u32 {
        self.view.store.free()
    }

    /// The room the unit was ordered from, or where it stands when unknown
    pub fn homeroom(&self) -> RoomName {
        self.memory
            .homeroom
            .clone()
            .unwrap_or_else(|| self.room().clone())
    }

    pub fn target(&self) -> Option<&TargetKey> {
        self.memory.target.as_ref()
    }

    pub fn target_room(&self) -> Option<RoomName> {
        self.memory.target.as_ref().map(|t| t.room().clone())
    }

    pub fn set_state<S: StateMachine>(&mut self, state: S) {
        self.memory.state = Some(PersistedState::Known(state.wrap()));
    }

    /// Switch state and show the new state's marker
    pub fn transition<S: StateMachine>(&mut self, ctx: &mut TickContext<'_>, state: S) {
        self.set_state(state);
        self.say(ctx, state.marker());
    }

    pub fn say(&self, ctx: &mut TickContext<'_>, message: &str) {
        ctx.host_mut().say(&self.view.name, message);
    }
}

/// A per-role state enum stored inside [`RoleState`]
pub trait StateMachine: Copy + Default + Debug {
    fn wrap(self) -> RoleState;

    /// `None` when the persisted state belongs to another role
    fn from_role_state(state: &RoleState) -> Option<Self>;

    /// Diagnostic marker shown when entering this state
    fn marker(self) -> &'static str;
}

/// Current state of `unit`, healing missing or corrupt values to the initial state
pub fn resolve_state<S: StateMachine>(unit: &mut Unit) -> S {
    let resolved = match &unit.memory.state {
        None => None,
        Some(PersistedState::Known(state)) => {
            let own = S::from_role_state(state);
            if own.is_none() {
                tracing::warn!(
                    unit = %unit.view.name,
                    role = unit.memory.role.name(),
                    state = ?state,
                    "state belongs to another machine, resetting"
                );
            }
            own
        }
        Some(PersistedState::Unrecognized(raw)) => {
            tracing::warn!(
                unit = %unit.view.name,
                role = unit.memory.role.name(),
                state = %raw,
                "unknown state, resetting"
            );
            None
        }
    };

    match resolved {
        Some(state) => state,
        None => {
            let initial = S::default();
            unit.set_state(initial);
            initial
        }
    }
}

pub type RoleRunner = fn(&mut Unit, &mut TickContext<'_>) -> Result<()>;

/// State machine entry point for a role
pub fn runner_for(role: Role) -> RoleRunner {
    use crate::units::roles::*;
    match role {
        Role::Harvester => harvester::run,
        Role::Upgrader => upgrader::run,
        Role::Builder => builder::run,
        Role::Hauler | Role::Porter => hauler::run,
        Role::RemoteHauler => hauler::run_remote,
        Role::Claimer => claimer::run,
        Role::Pioneer => pioneer::run,
        Role::RemoteBuilder => remote_builder::run,
        Role::Scout => scout::run,
        Role::RemoteDefender => remote_defender::run,
    }
}

/// Run every live unit of `role` through its state machine.
///
/// Returns the number of units run. Spawning units are skipped; units with
/// no memory are left for the idle manager.
pub fn run_role_units(ctx: &mut TickContext<'_>, role: Role) -> usize {
    let runner = runner_for(role);
    let units = ctx.units();
    let mut ran = 0;

    for view in units.iter() {
        if view.spawning {
            continue;
        }
        let Some(memory) = view.memory.clone() else {
            continue;
        };
        if memory.role != role {
            continue;
        }

        let mut unit = Unit::new(view.clone(), memory);
        if let Err(err) = runner(&mut unit, ctx) {
            tracing::error!(unit = %view.name, role = role.name(), error = %err, "unit failed this tick");
        }
        if view.memory.as_ref() != Some(&unit.memory) {
            ctx.host_mut().set_unit_memory(&view.name, unit.memory);
        }
        ran += 1;
    }

    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::host::SimHost;
    use crate::units::roles::builder::BuilderState;
    use crate::units::roles::harvester::HarvesterState;

    fn unit_with_state(state: Option<PersistedState>) -> Unit {
        let mut memory = UnitMemory::new(Role::Builder);
        memory.state = state;
        let view = UnitView {
            name: "b1".into(),
            pos: Position::new("W1N1", 10, 10),
            store: Store::empty(50),
            body: Vec::new(),
            ticks_to_live: Some(1500),
            spawning: false,
            memory: Some(memory.clone()),
        };
        Unit::new(view, memory)
    }

    #[test]
    fn test_missing_state_defaults_to_initial() {
        let mut unit = unit_with_state(None);
        let state: BuilderState = resolve_state(&mut unit);
        assert_eq!(state, BuilderState::default());
        assert_eq!(
            unit.memory.state,
            Some(PersistedState::Known(RoleState::Builder(BuilderState::default())))
        );
    }

    #[test]
    fn test_foreign_state_is_reset() {
        let mut unit = unit_with_state(Some(PersistedState::Known(RoleState::Harvester(
            HarvesterState::Discharge,
        ))));
        let state: BuilderState = resolve_state(&mut unit);
        assert_eq!(state, BuilderState::default());
    }

    #[test]
    fn test_unrecognized_state_is_reset() {
        let mut unit = unit_with_state(Some(PersistedState::Unrecognized(serde_json::json!(42))));
        let state: BuilderState = resolve_state(&mut unit);
        assert_eq!(state, BuilderState::default());
    }

    #[test]
    fn test_spawning_and_memoryless_units_are_skipped() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 3);
        host.add_unit("b1", &room, UnitMemory::new(Role::Builder));
        host.add_unit("b2", &room, UnitMemory::new(Role::Builder));
        host.set_spawning("b2", true);
        host.add_bare_unit("loose", &room);

        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(&mut host, &config);
        assert_eq!(run_role_units(&mut ctx, Role::Builder), 1);
        assert_eq!(run_role_units(&mut ctx, Role::Upgrader), 0);
    }
}
