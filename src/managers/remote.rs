//! Remote manager: scouting, upkeep and defence of neighbouring mining rooms

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::core::types::RoomName;
use crate::host::StructureKind;
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{body_cost, compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::{Role, TargetKey};

/// Defenders answer a lone invader; larger raids are left alone
const MAX_DEFENDERS: u32 = 1;

pub struct RemoteManager;

impl Manager for RemoteManager {
    fn name(&self) -> &'static str {
        "RemoteManager"
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
        run_role_family(
            self.name(),
            &[Role::Scout, Role::RemoteBuilder, Role::RemoteDefender],
            ctx,
            colony,
            Self::organize,
        )
    }
}

impl RemoteManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for home in ctx.normal_rooms() {
            let remotes = ctx.remote_rooms(&home);
            for remote in remotes.iter() {
                Self::order_scout(ctx, colony, &home, remote);
                if ctx.room(remote).is_none() {
                    continue;
                }
                Self::order_builder(ctx, colony, &home, remote);
                Self::order_defender(ctx, colony, &home, remote);
            }
        }
        Ok(())
    }

    fn order_scout(
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
        home: &RoomName,
        remote: &RoomName,
    ) {
        let target = TargetKey::Room(remote.clone());
        if outstanding(ctx, colony, home, Role::Scout, Some(&target), None) > 0 {
            return;
        }
        let memory = seed(Role::Scout, home, 1).with_target(target);
        colony.place_order(
            home,
            Order::new(compose_body(BodyProfile::Scout, 1), Priority::Important, memory),
        );
    }

    fn order_builder(
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
        home: &RoomName,
        remote: &RoomName,
    ) {
        let ceiling = ctx.config().remote_container_repair_ceiling;
        let has_sites = !ctx.construction_sites(remote).is_empty();
        let worn_container = ctx
            .structures(remote)
            .iter()
            .any(|s| s.kind == StructureKind::Container && s.hits < ceiling);
        if !has_sites && !worn_container {
            return;
        }

        let target = TargetKey::Room(remote.clone());
        if outstanding(ctx, colony, home, Role::RemoteBuilder, Some(&target), None) > 0 {
            return;
        }
        let Some(snapshot) = ctx.room(home) else {
            return;
        };
        let tier =
            max_affordable_tier(BodyProfile::SimpleWorker, snapshot.energy_capacity_available)
                .max(1);
        let memory = seed(Role::RemoteBuilder, home, tier).with_target(target);
        colony.place_order(
            home,
            Order::new(compose_body(BodyProfile::SimpleWorker, tier), Priority::Low, memory),
        );
    }

    fn order_defender(
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
        home: &RoomName,
        remote: &RoomName,
    ) {
        if ctx.containers(remote).is_empty() {
            return;
        }
        let invaders = ctx.hostiles(remote).iter().filter(|h| h.is_invader()).count();
        if invaders != 1 {
            return;
        }

        let target = TargetKey::Room(remote.clone());
        let active = outstanding(ctx, colony, home, Role::RemoteDefender, Some(&target), Some(home));
        if active >= MAX_DEFENDERS {
            return;
        }
        let body = compose_body(BodyProfile::Defender, 1);
        let capacity = ctx.room(home).map_or(0, |r| r.energy_capacity_available);
        // An order the room can never afford would block its lane for good
        if body_cost(&body) > capacity {
            tracing::debug!(room = %remote, home = %home, capacity, "defender too expensive for home room");
            return;
        }
        tracing::info!(room = %remote, home = %home, "invader in remote room, ordering defender");
        let memory = seed(Role::RemoteDefender, home, 1).with_target(target);
        colony.place_order(home, Order::new(body, Priority::Low, memory));
    }
}
