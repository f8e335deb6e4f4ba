//! Overseer configuration with documented constants
//!
//! All tuning numbers for demand computation, target selection and the
//! structure reactors are collected here. The struct deserializes from TOML;
//! any field left out keeps its default.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{OverseerError, Result};
use crate::core::types::{RoomName, Tick};

/// Configuration for the colony controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverseerConfig {
    // === SCHEDULING ===
    /// Ticks between two demand recomputations of the same manager
    ///
    /// Unit state machines still run every tick. Only the "how many units do
    /// we need" scan is throttled, which keeps per-tick CPU sublinear in
    /// colony size.
    pub demand_interval: Tick,

    // === ROOM QUERIES ===
    /// Range around a source (or mineral) in which containers and links count as tanks
    pub tank_range: u32,

    /// Range around the storage in which a link counts as the storage link
    pub storage_link_range: u32,

    // === BUILD DEMAND ===
    /// Construction sites handled by one builder
    ///
    /// Builder target = ceil(sites / sites_per_builder).
    pub sites_per_builder: u32,

    /// Aggregate repair debt above which one extra builder is ordered
    ///
    /// Debt is the sum of `hits_max - hits` over damaged structures, walls and
    /// ramparts excluded (towers keep those up).
    pub repair_debt_threshold: u64,

    // === UPGRADE DEMAND ===
    /// Upper bound on upgraders per controller when energy would otherwise be wasted
    pub max_upgraders: u32,

    // === HAUL DEMAND ===
    /// Haulers per room below controller level 3
    pub haulers_early: u32,

    /// Haulers per room at controller level 3 and above
    pub haulers_developed: u32,

    /// Remote haulers per home room with remote tanks
    pub remote_haulers: u32,

    // === EXPANSION ===
    /// Pioneers per developing room
    pub pioneers_per_room: u32,

    /// Rooms the colony should claim, in order
    pub claim_targets: Vec<RoomName>,

    /// Exits never treated as remote rooms
    pub excluded_remote_rooms: Vec<RoomName>,

    /// Additional remote rooms per home room, beyond direct exits
    pub extra_remote_rooms: BTreeMap<RoomName, Vec<RoomName>>,

    // === UNIT BEHAVIOR ===
    /// Remaining lifespan under which a scout stops where it is
    pub scout_stay_lifespan: u32,

    /// Period of the builder/upgrader donation coin flip
    pub donation_period: Tick,

    /// Ticks out of each donation period during which builders are preferred
    ///
    /// At 150 of 200, builders get 75% of hauler donations and upgraders 25%.
    pub donation_builder_share: Tick,

    /// Spawn energy needed before a link-served harvester gets two extra CARRY parts
    pub harvester_link_bonus_energy: u32,

    // === STRUCTURES ===
    /// Walls and ramparts are only topped up by towers while below this many hits
    pub wall_repair_ceiling: u32,

    /// Containers in a remote room under this many hits justify a remote builder
    pub remote_container_repair_ceiling: u32,
}

impl Default for OverseerConfig {
    fn default() -> Self {
        Self {
            demand_interval: 20,

            tank_range: 2,
            storage_link_range: 2,

            sites_per_builder: 5,
            repair_debt_threshold: 100_000,

            max_upgraders: 5,

            haulers_early: 1,
            haulers_developed: 2,
            remote_haulers: 2,

            pioneers_per_room: 3,
            claim_targets: Vec::new(),
            excluded_remote_rooms: Vec::new(),
            extra_remote_rooms: BTreeMap::new(),

            scout_stay_lifespan: 1300,
            donation_period: 200,
            donation_builder_share: 150,
            harvester_link_bonus_energy: 850,

            wall_repair_ceiling: 100_000,
            remote_container_repair_ceiling: 100_000,
        }
    }
}

impl OverseerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, filling omitted fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: OverseerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.demand_interval == 0 {
            return Err(OverseerError::InvalidConfig(
                "demand_interval must be at least 1 tick".into(),
            ));
        }

        if self.sites_per_builder == 0 {
            return Err(OverseerError::InvalidConfig(
                "sites_per_builder must be positive".into(),
            ));
        }

        if self.donation_period == 0 || self.donation_builder_share > self.donation_period {
            return Err(OverseerError::InvalidConfig(format!(
                "donation_builder_share ({}) must fit in donation_period ({})",
                self.donation_builder_share, self.donation_period
            )));
        }

        if self.max_upgraders == 0 {
            return Err(OverseerError::InvalidConfig(
                "max_upgraders must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Whether builders win the hauler donation coin flip at `tick`
    pub fn donation_prefers_builder(&self, tick: Tick) -> bool {
        tick % self.donation_period < self.donation_builder_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OverseerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OverseerConfig::from_toml_str(
            r#"
            demand_interval = 10
            claim_targets = ["E7S36"]

            [extra_remote_rooms]
            E5S37 = ["E4S37"]
            "#,
        )
        .unwrap();

        assert_eq!(config.demand_interval, 10);
        assert_eq!(config.claim_targets, vec![RoomName::from("E7S36")]);
        assert_eq!(
            config.extra_remote_rooms.get(&RoomName::from("E5S37")),
            Some(&vec![RoomName::from("E4S37")])
        );
        // Untouched fields fall back to defaults
        assert_eq!(config.sites_per_builder, 5);
        assert_eq!(config.repair_debt_threshold, 100_000);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = OverseerConfig::from_toml_str("demand_interval = 0");
        assert!(matches!(result, Err(OverseerError::InvalidConfig(_))));

        let result = OverseerConfig::from_toml_str("donation_builder_share = 500");
        assert!(matches!(result, Err(OverseerError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = OverseerConfig::from_toml_str("demand_interval = \"soon\"");
        assert!(matches!(result, Err(OverseerError::TomlError(_))));
    }

    #[test]
    fn test_donation_coin_flip() {
        let config = OverseerConfig::default();
        assert!(config.donation_prefers_builder(0));
        assert!(config.donation_prefers_builder(149));
        assert!(!config.donation_prefers_builder(150));
        assert!(!config.donation_prefers_builder(199));
        assert!(config.donation_prefers_builder(200));
    }
}
