//! Haul manager: keeps spawns and extensions supplied

use crate::colony::{TickContext, DEVELOPED_LEVEL};
use crate::core::error::Result;
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::Role;

pub struct HaulManager;

impl Manager for HaulManager {
    fn name(&self) -> &'static str {
        "HaulManager"
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
        run_role_family(self.name(), &[Role::Hauler], ctx, colony, Self::organize)
    }
}

impl HaulManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for room in ctx.spawning_rooms() {
            let Some(snapshot) = ctx.room(&room) else {
                continue;
            };
            let required = if snapshot.controller_level() < DEVELOPED_LEVEL {
                ctx.config().haulers_early
            } else {
                ctx.config().haulers_developed
            };
            let active = outstanding(ctx, colony, &room, Role::Hauler, None, Some(&room));
            if active >= required {
                continue;
            }

            // Haulers restart an empty economy, so size them to what is on hand
            let tier = max_affordable_tier(BodyProfile::Hauler, snapshot.energy_available).max(1);
            for _ in active..required {
                let body = compose_body(BodyProfile::Hauler, tier);
                colony.place_order(
                    &room,
                    Order::new(body, Priority::Important, seed(Role::Hauler, &room, tier)),
                );
            }
        }
        Ok(())
    }
}
