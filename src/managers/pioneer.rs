//! Pioneer manager: staffs freshly claimed rooms from the first developed room

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::managers::{run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::{Role, TargetKey};

pub struct PioneerManager;

impl Manager for PioneerManager {
    fn name(&self) -> &'static str {
        "PioneerManager"
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
        run_role_family(self.name(), &[Role::Pioneer], ctx, colony, Self::organize)
    }
}

impl PioneerManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        let developing = ctx.developing_rooms();
        if developing.is_empty() {
            return Ok(());
        }
        let Some(spawn_room) = ctx.normal_rooms().into_iter().next() else {
            tracing::debug!("no developed room to send pioneers from");
            return Ok(());
        };
        let Some(snapshot) = ctx.room(&spawn_room) else {
            return Ok(());
        };
        let required = ctx.config().pioneers_per_room;

        for room in developing {
            let target = TargetKey::Room(room.clone());
            // The first normal room can change between runs, so look in every queue
            let active = ctx.count_units(Role::Pioneer, Some(&target), None)
                + colony.orders.count_all(Role::Pioneer, Some(&target));
            if active >= required {
                continue;
            }

            let tier =
                max_affordable_tier(BodyProfile::SimpleWorker, snapshot.energy_capacity_available)
                    .max(1);
            for _ in active..required {
                let body = compose_body(BodyProfile::SimpleWorker, tier);
                let memory = seed(Role::Pioneer, &spawn_room, tier).with_target(target.clone());
                colony.place_order(&spawn_room, Order::new(body, Priority::Standard, memory));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::core::types::RoomName;
    use crate::host::{SimHost, StructureKind};
    use crate::units::memory::UnitMemory;

    #[test]
    fn test_pioneers_fill_developing_rooms() {
        let mut host = SimHost::new();
        let home = RoomName::from("W1N1");
        let fresh = RoomName::from("W2N1");
        host.add_room(&home, 4);
        host.add_structure(&home, StructureKind::Spawn, 25, 25);
        host.add_room(&fresh, 1);
        host.add_unit(
            "p1",
            &fresh,
            UnitMemory::new(Role::Pioneer).with_target(TargetKey::Room(fresh.clone())),
        );

        let config = OverseerConfig::default();
        let mut colony = ColonyMemory::new();
        let mut ctx = TickContext::new(&mut host, &config);
        PioneerManager::organize(&mut ctx, &mut colony).unwrap();

        let target = TargetKey::Room(fresh.clone());
        assert_eq!(colony.orders.count(&home, Role::Pioneer, Some(&target)), 2);
        let order = colony.orders.peek(&home).unwrap();
        assert_eq!(order.memory.homeroom.as_ref(), Some(&home));
    }

    #[test]
    fn test_new_first_normal_room_does_not_reorder() {
        let mut host = SimHost::new();
        let old_home = RoomName::from("W2N1");
        let fresh = RoomName::from("W3N1");
        host.add_room(&old_home, 4);
        host.add_structure(&old_home, StructureKind::Spawn, 25, 25);
        host.add_room(&fresh, 1);

        let config = OverseerConfig::default();
        let mut colony = ColonyMemory::new();
        let mut ctx = TickContext::new(&mut host, &config);
        PioneerManager::organize(&mut ctx, &mut colony).unwrap();

        // W1N1 sorts ahead of W2N1 and becomes the spawn room
        let new_home = RoomName::from("W1N1");
        host.add_room(&new_home, 4);
        host.add_structure(&new_home, StructureKind::Spawn, 25, 25);
        let mut ctx = TickContext::new(&mut host, &config);
        PioneerManager::organize(&mut ctx, &mut colony).unwrap();

        let target = TargetKey::Room(fresh);
        assert_eq!(colony.orders.count_all(Role::Pioneer, Some(&target)), 3);
        assert_eq!(colony.orders.count(&new_home, Role::Pioneer, Some(&target)), 0);
    }

    #[test]
    fn test_no_orders_without_developing_rooms() {
        let mut host = SimHost::new();
        let home = RoomName::from("W1N1");
        host.add_room(&home, 4);
        host.add_structure(&home, StructureKind::Spawn, 25, 25);

        let config = OverseerConfig::default();
        let mut colony = ColonyMemory::new();
        let mut ctx = TickContext::new(&mut host, &config);
        PioneerManager::organize(&mut ctx, &mut colony).unwrap();
        assert!(colony.orders.is_empty());
    }
}
