//! Claim manager: sends a claimer to every configured claim target we do not own yet

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::managers::{run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::{Role, TargetKey};

pub struct ClaimManager;

impl Manager for ClaimManager {
    fn name(&self) -> &'static str {
        "ClaimManager"
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
        run_role_family(self.name(), &[Role::Claimer], ctx, colony, Self::organize)
    }
}

impl ClaimManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        let Some(spawn_room) = ctx.normal_rooms().into_iter().next() else {
            return Ok(());
        };
        let Some(snapshot) = ctx.room(&spawn_room) else {
            return Ok(());
        };

        let targets = ctx.config().claim_targets.clone();
        for target_room in targets {
            if ctx.room(&target_room).is_some_and(|r| r.is_mine()) {
                continue;
            }
            let target = TargetKey::Room(target_room.clone());
            // The first normal room can change between runs, so look in every queue
            let queued = colony.orders.count_all(Role::Claimer, Some(&target));
            if ctx.count_units(Role::Claimer, Some(&target), None) + queued > 0 {
                continue;
            }

            let tier =
                max_affordable_tier(BodyProfile::Claimer, snapshot.energy_capacity_available).max(1);
            let body = compose_body(BodyProfile::Claimer, tier);
            let memory = seed(Role::Claimer, &spawn_room, tier).with_target(target);
            colony.place_order(&spawn_room, Order::new(body, Priority::Standard, memory));
        }
        Ok(())
    }
}
