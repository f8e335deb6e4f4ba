//! Tick driver
//!
//! The overseer owns the managers and the colony memory. Each tick it builds
//! a fresh [`TickContext`] and walks the priority phases from Critical down to
//! Trivial, running every manager registered for the phase. A manager that
//! fails is logged and skipped; the rest of the tick carries on.

use crate::colony::TickContext;
use crate::core::config::OverseerConfig;
use crate::core::error::Result;
use crate::core::types::Tick;
use crate::host::Host;
use crate::managers::{default_managers, ColonyMemory, Manager};
use crate::spawning::{OrderBook, Priority};

/// What happened during one call to [`Overseer::run_tick`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    /// Manager invocations across all phases
    pub managers_run: usize,
    /// Names of managers that returned an error
    pub failures: Vec<String>,
    /// Orders waiting across every spawn queue after the tick
    pub queued_orders: usize,
}

pub struct Overseer {
    config: OverseerConfig,
    managers: Vec<Box<dyn Manager>>,
    /// Manager indices per priority phase, in registration order
    dispatch: [Vec<usize>; Priority::COUNT],
    colony: ColonyMemory,
}

impl Overseer {
    pub fn new() -> Self {
        Self::assemble(OverseerConfig::default(), default_managers())
    }

    /// Default managers under `config`; fails when the config does not validate
    pub fn with_config(config: OverseerConfig) -> Result<Self> {
        Self::with_managers(config, default_managers())
    }

    pub fn with_managers(config: OverseerConfig, managers: Vec<Box<dyn Manager>>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, managers))
    }

    fn assemble(config: OverseerConfig, managers: Vec<Box<dyn Manager>>) -> Self {
        let dispatch = std::array::from_fn(|slot| {
            managers
                .iter()
                .enumerate()
                .filter(|(_, m)| m.phases().iter().any(|p| p.index() == slot))
                .map(|(i, _)| i)
                .collect()
        });
        Self {
            config,
            managers,
            dispatch,
            colony: ColonyMemory::new(),
        }
    }

    pub fn config(&self) -> &OverseerConfig {
        &self.config
    }

    pub fn colony(&self) -> &ColonyMemory {
        &self.colony
    }

    pub fn orders(&self) -> &OrderBook {
        &self.colony.orders
    }

    pub fn orders_mut(&mut self) -> &mut OrderBook {
        &mut self.colony.orders
    }

    /// Names of the managers registered for `phase`, in run order
    pub fn phase_managers(&self, phase: Priority) -> Vec<&'static str> {
        self.dispatch[phase.index()]
            .iter()
            .map(|&i| self.managers[i].name())
            .collect()
    }

    /// Run every manager once, phase by phase
    pub fn run_tick(&mut self, host: &mut dyn Host) -> TickReport {
        let mut ctx = TickContext::new(host, &self.config);
        let mut report = TickReport {
            tick: ctx.tick(),
            ..TickReport::default()
        };

        for phase in Priority::DESCENDING {
            for &index in &self.dispatch[phase.index()] {
                let manager = &mut self.managers[index];
                report.managers_run += 1;
                if let Err(err) = manager.run(phase, &mut ctx, &mut self.colony) {
                    tracing::error!(
                        manager = manager.name(),
                        phase = ?phase,
                        tick = report.tick,
                        error = %err,
                        "manager failed this tick"
                    );
                    report.failures.push(manager.name().to_string());
                }
            }
        }

        report.queued_orders = self.colony.orders.len();
        tracing::debug!(
            tick = report.tick,
            managers = report.managers_run,
            failures = report.failures.len(),
            queued = report.queued_orders,
            "tick complete"
        );
        report
    }

    /// Serialize the colony memory for storage between runs
    pub fn save_memory(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.colony)?)
    }

    /// Replace the colony memory with a previously saved blob.
    ///
    /// The current memory is kept when the blob does not parse.
    pub fn load_memory(&mut self, json: &str) -> Result<()> {
        self.colony = serde_json::from_str(json)?;
        tracing::info!(
            queued = self.colony.orders.len(),
            managers = self.colony.managers.len(),
            "colony memory loaded"
        );
        Ok(())
    }
}

impl Default for Overseer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::OverseerError;
    use crate::core::types::RoomName;
    use crate::host::{SimHost, StructureKind};
    use crate::units::memory::Role;

    struct Failing;

    impl Manager for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn phases(&self) -> &'static [Priority] {
            &[Priority::Critical]
        }

        fn run(&mut self, _: Priority, _: &mut TickContext<'_>, _: &mut ColonyMemory) -> Result<()> {
            Err(OverseerError::InvalidConfig("boom".into()))
        }
    }

    fn starter_room() -> (SimHost, RoomName) {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 2);
        host.add_structure(&room, StructureKind::Spawn, 25, 25);
        host.add_source(&room, "src1", 10, 10);
        (host, room)
    }

    #[test]
    fn test_dispatch_follows_declared_phases() {
        let overseer = Overseer::new();
        assert_eq!(overseer.phase_managers(Priority::Critical), vec!["TowerManager"]);
        assert_eq!(overseer.phase_managers(Priority::Standard), vec!["LinkManager"]);
        assert_eq!(overseer.phase_managers(Priority::Trivial), vec!["IdleManager"]);
        assert!(overseer.phase_managers(Priority::Important).is_empty());
        assert!(overseer.phase_managers(Priority::Low).contains(&"HarvestManager"));
    }

    #[test]
    fn test_failing_manager_does_not_stop_the_tick() {
        let (mut host, room) = starter_room();
        let managers: Vec<Box<dyn Manager>> =
            vec![Box::new(Failing), Box::new(crate::managers::HarvestManager)];
        let mut overseer = Overseer::with_managers(OverseerConfig::default(), managers).unwrap();

        let report = overseer.run_tick(&mut host);
        assert_eq!(report.failures, vec!["Failing".to_string()]);
        assert_eq!(report.managers_run, 2);
        assert_eq!(overseer.orders().count(&room, Role::Harvester, None), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = OverseerConfig {
            sites_per_builder: 0,
            ..OverseerConfig::default()
        };
        assert!(matches!(
            Overseer::with_config(config),
            Err(OverseerError::InvalidConfig(_))
        ));

        let config = OverseerConfig {
            donation_period: 0,
            ..OverseerConfig::default()
        };
        assert!(Overseer::with_managers(config, Vec::new()).is_err());
    }

    #[test]
    fn test_memory_survives_save_and_load() {
        let (mut host, _) = starter_room();
        let mut overseer = Overseer::new();
        overseer.run_tick(&mut host);
        let saved = overseer.save_memory().unwrap();

        let mut restored = Overseer::new();
        restored.load_memory(&saved).unwrap();
        assert_eq!(restored.colony(), overseer.colony());
    }

    #[test]
    fn test_bad_memory_is_rejected_and_kept() {
        let (mut host, _) = starter_room();
        let mut overseer = Overseer::new();
        overseer.run_tick(&mut host);
        let before = overseer.colony().clone();

        assert!(overseer.load_memory("{ not json").is_err());
        assert_eq!(overseer.colony(), &before);
    }
}
