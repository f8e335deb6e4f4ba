//! Port manager: a single porter per storage room
//!
//! Porters move energy out of storage into spawns and extensions. They run
//! the hauler state machine.

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::Role;

pub struct PortManager;

impl Manager for PortManager {
    fn name(&self) -> &'static str {
        "PortManager"
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
        run_role_family(self.name(), &[Role::Porter], ctx, colony, Self::organize)
    }
}

impl PortManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for room in ctx.normal_rooms() {
            if ctx.storage(&room).is_none() {
                continue;
            }
            let Some(snapshot) = ctx.room(&room) else {
                continue;
            };
            if outstanding(ctx, colony, &room, Role::Porter, None, Some(&room)) > 0 {
                continue;
            }

            let tier =
                max_affordable_tier(BodyProfile::SimpleWorker, snapshot.energy_capacity_available)
                    .max(1);
            let body = compose_body(BodyProfile::SimpleWorker, tier);
            colony.place_order(
                &room,
                Order::new(body, Priority::Standard, seed(Role::Porter, &room, tier)),
            );
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

    fn organize(host: &mut SimHost, colony: &mut ColonyMemory) {
        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(host, &config);
        PortManager::organize(&mut ctx, colony).unwrap();
    }

    #[test]
    fn test_porter_only_with_storage() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 4);
        host.add_structure(&room, StructureKind::Spawn, 25, 25);
        let mut colony = ColonyMemory::new();
        organize(&mut host, &mut colony);
        assert!(colony.orders.is_empty());

        host.add_structure(&room, StructureKind::Storage, 25, 30);
        organize(&mut host, &mut colony);
        organize(&mut host, &mut colony);
        assert_eq!(colony.orders.count(&room, Role::Porter, None), 1);
        assert_eq!(colony.orders.peek(&room).unwrap().priority, Priority::Standard);
    }
}
