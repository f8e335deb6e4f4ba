//! Upgrade manager
//!
//! One upgrader per room by default. Before storage exists, surplus energy
//! piles up in containers; once every container is full, one more upgrader
//! is added per interval up to `max_upgraders` to spend it.

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::core::types::RoomName;
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::{Role, TargetKey};

pub struct UpgradeManager;

impl Manager for UpgradeManager {
    fn name(&self) -> &'static str {
        "UpgradeManager"
    }

    fn phases(&self) -> &'static [Priority] {
        ROLE_PHASE
    }

    fn run(
        &mut self,
        _phase: Priority,
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
    ) -> Result<()> {
        run_role_family(self.name(), &[Role::Upgrader], ctx, colony, Self::organize)
    }
}

impl UpgradeManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for room in ctx.spawning_rooms() {
            let Some(snapshot) = ctx.room(&room) else {
                continue;
            };
            let Some(controller) = snapshot.controller.as_ref() else {
                continue;
            };

            let target = TargetKey::object(room.clone(), controller.id.clone());
            let active = outstanding(ctx, colony, &room, Role::Upgrader, Some(&target), None);
            let required = Self::required(ctx, &room, active);
            if active >= required {
                continue;
            }

            let tier =
                max_affordable_tier(BodyProfile::HeavyWorker, snapshot.energy_capacity_available)
                    .max(1);
            let body = compose_body(BodyProfile::HeavyWorker, tier);
            let memory = seed(Role::Upgrader, &room, tier).with_target(target);
            colony.place_order(&room, Order::new(body, Priority::Standard, memory));
        }
        Ok(())
    }

    fn required(ctx: &mut TickContext<'_>, room: &RoomName, active: u32) -> u32 {
        if ctx.storage(room).is_some() {
            return 1;
        }
        let containers = ctx.containers(room);
        let saturated = !containers.is_empty() && containers.iter().all(|c| c.free_capacity() == 0);
        if saturated {
            (active + 1).min(ctx.config().max_upgraders)
        } else {
            1
        }
    }
}
