//! Harvest manager: one harvester per source, plus remote haulers

use crate::colony::{TankNode, TickContext};
use crate::core::error::Result;
use crate::core::types::{BodyPart, ObjectId, RoomName};
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{
    compose_body, max_affordable_tier, rcl2_harvester_body, BodyProfile, Order, Priority,
};
use crate::units::memory::{Role, TargetKey};

/// Spawn capacity band in which the fixed five-WORK harvester is used
const RCL2_CAPACITY: std::ops::Range<u32> = 550..750;

pub struct HarvestManager;

impl Manager for HarvestManager {
    fn name(&self) -> &'static str {
        "HarvestManager"
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
            &[Role::Harvester, Role::RemoteHauler],
            ctx,
            colony,
            Self::organize,
        )
    }
}

impl HarvestManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for room in ctx.spawning_rooms() {
            let sources = ctx.sources(&room);
            for source in sources.iter() {
                Self::order_harvester(ctx, colony, &room, &room, &source.id);
            }
        }

        for room in ctx.normal_rooms() {
            let remote_tanks = ctx.remote_tanks(&room);
            for tank in remote_tanks.iter() {
                if let TankNode::Source(source) = &tank.node {
                    Self::order_harvester(ctx, colony, &room, &tank.structure.pos.room, source);
                }
            }
            if !remote_tanks.is_empty() {
                Self::order_remote_hauler(ctx, colony, &room);
            }
        }
        Ok(())
    }

    fn order_harvester(
        ctx: &mut TickContext<'_>,
        colony: &mut ColonyMemory,
        room: &RoomName,
        source_room: &RoomName,
        source: &ObjectId,
    ) {
        if ctx.spawn(room).is_none() {
            return;
        }
        let Some(snapshot) = ctx.room(room) else {
            return;
        };

        let target = TargetKey::object(source_room.clone(), source.clone());
        if outstanding(ctx, colony, room, Role::Harvester, Some(&target), Some(room)) > 0 {
            return;
        }

        let (mut body, tier) = if RCL2_CAPACITY.contains(&snapshot.energy_capacity_available) {
            (rcl2_harvester_body(), 1)
        } else {
            let tier = max_affordable_tier(BodyProfile::Harvester, snapshot.energy_available).max(1);
            (compose_body(BodyProfile::Harvester, tier), tier)
        };

        // With a link at the source the harvester carries straight into it
        let has_link = ctx.source_tanks(source_room, source).iter().any(|t| t.is_link());
        if has_link && snapshot.energy_available >= ctx.config().harvester_link_bonus_energy {
            body.extend([BodyPart::Carry, BodyPart::Carry]);
        }

        let priority = if source_room == room {
            Priority::Critical
        } else {
            Priority::Standard
        };
        let memory = seed(Role::Harvester, room, tier).with_target(target);
        colony.place_order(room, Order::new(body, priority, memory));
    }

    fn order_remote_hauler(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory, room: &RoomName) {
        let Some(snapshot) = ctx.room(room) else {
            return;
        };
        let limit = ctx.config().remote_haulers;
        let active = outstanding(ctx, colony, room, Role::RemoteHauler, None, Some(room));

        let tier = max_affordable_tier(BodyProfile::Hauler, snapshot.energy_capacity_available).max(1);
        for _ in active..limit {
            let body = compose_body(BodyProfile::Hauler, tier);
            colony.place_order(
                room,
                Order::new(body, Priority::Low, seed(Role::RemoteHauler, room, tier)),
            );
        }
    }
}
