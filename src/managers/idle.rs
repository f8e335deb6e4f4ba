//! Idle manager: puts units that lost their memory back to work
//!
//! Runs last, after every role family has had its turn. A unit with no
//! memory block is adopted as an upgrader of the room it stands in.

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::managers::{ColonyMemory, Manager};
use crate::spawning::Priority;
use crate::units::memory::{Role, TargetKey, UnitMemory};

pub struct IdleManager;

impl Manager for IdleManager {
    fn name(&self) -> &'static str {
        "IdleManager"
    }

    fn phases(&self) -> &'static [Priority] {
        &[Priority::Trivial]
    }

    fn run(
        &mut self,
        _phase: Priority,
        ctx: &mut TickContext<'_>,
        _colony: &mut ColonyMemory,
    ) -> Result<()> {
        let units = ctx.units();
        for view in units.iter().filter(|u| u.memory.is_none() && !u.spawning) {
            let room = view.room().clone();
            let mut memory = UnitMemory::new(Role::Upgrader).with_homeroom(room.clone());
            if let Some(controller) = ctx.room(&room).and_then(|r| r.controller.clone()) {
                memory = memory.with_target(TargetKey::object(room.clone(), controller.id));
            }
            tracing::warn!(unit = %view.name, room = %room, "adopting unit without memory as upgrader");
            ctx.host_mut().set_unit_memory(&view.name, memory);
        }
        Ok(())
    }
}
