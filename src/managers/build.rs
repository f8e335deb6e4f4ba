//! Build manager: builders scale with the construction backlog and repair debt

use crate::colony::TickContext;
use crate::core::config::OverseerConfig;
use crate::core::error::Result;
use crate::managers::{outstanding, run_role_family, seed, ColonyMemory, Manager, ROLE_PHASE};
use crate::spawning::{compose_body, max_affordable_tier, BodyProfile, Order, Priority};
use crate::units::memory::Role;

/// Builders needed for `sites` open construction sites and `debt` missing hit points
///
/// A zero `sites_per_builder` counts as one site per builder.
pub fn required_builders(sites: usize, debt: u64, config: &OverseerConfig) -> u32 {
    let for_sites = (sites as u32).div_ceil(config.sites_per_builder.max(1));
    let for_repairs = u32::from(debt > config.repair_debt_threshold);
    for_sites + for_repairs
}

pub struct BuildManager;

impl Manager for BuildManager {
    fn name(&self) -> &'static str {
        "BuildManager"
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
        run_role_family(self.name(), &[Role::Builder], ctx, colony, Self::organize)
    }
}

impl BuildManager {
    fn organize(ctx: &mut TickContext<'_>, colony: &mut ColonyMemory) -> Result<()> {
        for room in ctx.spawning_rooms() {
            let Some(snapshot) = ctx.room(&room) else {
                continue;
            };
            let sites = ctx.construction_sites(&room).len();
            let debt = ctx.repair_debt(&room);
            let required = required_builders(sites, debt, ctx.config());
            let active = outstanding(ctx, colony, &room, Role::Builder, None, Some(&room));
            if active >= required {
                continue;
            }

            tracing::debug!(room = %room, sites, debt, required, active, "builder shortfall");
            // One at a time; the backlog is re-measured next interval
            let tier =
                max_affordable_tier(BodyProfile::SimpleWorker, snapshot.energy_capacity_available)
                    .max(1);
            let body = compose_body(BodyProfile::SimpleWorker, tier);
            colony.place_order(
                &room,
                Order::new(body, Priority::Standard, seed(Role::Builder, &room, tier)),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RoomName;
    use crate::host::{SimHost, StructureKind};

    #[test]
    fn test_required_builders() {
        let config = OverseerConfig::default();
        assert_eq!(required_builders(0, 0, &config), 0);
        assert_eq!(required_builders(1, 0, &config), 1);
        assert_eq!(required_builders(5, 0, &config), 1);
        assert_eq!(required_builders(6, 0, &config), 2);
        assert_eq!(required_builders(12, 150_000, &config), 4);
        assert_eq!(required_builders(0, 100_000, &config), 0);
        assert_eq!(required_builders(0, 100_001, &config), 1);
    }

    #[test]
    fn test_zero_sites_per_builder_counts_as_one() {
        let config = OverseerConfig {
            sites_per_builder: 0,
            ..OverseerConfig::default()
        };
        assert_eq!(required_builders(3, 0, &config), 3);
    }

    #[test]
    fn test_orders_one_builder_per_run() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 4);
        host.add_structure(&room, StructureKind::Spawn, 25, 25);
        for x in 0..12 {
            host.add_site(&room, StructureKind::Extension, 10 + x, 40);
        }

        let config = OverseerConfig::default();
        let mut colony = ColonyMemory::new();
        for expected in 1..=3 {
            let mut ctx = TickContext::new(&mut host, &config);
            BuildManager::organize(&mut ctx, &mut colony).unwrap();
            assert_eq!(colony.orders.count(&room, Role::Builder, None), expected);
        }
        let mut ctx = TickContext::new(&mut host, &config);
        BuildManager::organize(&mut ctx, &mut colony).unwrap();
        assert_eq!(colony.orders.count(&room, Role::Builder, None), 3);
    }
}
