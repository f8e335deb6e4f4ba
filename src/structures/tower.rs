//! Tower reactor
//!
//! Towers shoot the closest hostile. With nothing to shoot they repair the
//! closest damaged structure, then top up the weakest wall or rampart below
//! the repair ceiling. A room under armed attack with no charged tower falls
//! back on safe mode.

use crate::colony::{RoomType, TickContext};
use crate::core::error::Result;
use crate::core::types::RoomName;
use crate::host::{closest_by_range, IntentResult, Structure, StructureIntent, StructureKind};
use crate::managers::{ColonyMemory, Manager};
use crate::spawning::Priority;

/// Towers at or below this much energy are left to recharge
const MIN_TOWER_ENERGY: u32 = 10;

pub struct TowerManager;

impl Manager for TowerManager {
    fn name(&self) -> &'static str {
        "TowerManager"
    }

    fn phases(&self) -> &'static [Priority] {
        &[Priority::Critical]
    }

    fn run(
        &mut self,
        _phase: Priority,
        ctx: &mut TickContext<'_>,
        _colony: &mut ColonyMemory,
    ) -> Result<()> {
        for room in ctx.rooms_of_type(&[RoomType::Normal, RoomType::InDev]) {
            Self::defend(ctx, &room);
        }
        Ok(())
    }
}

impl TowerManager {
    fn defend(ctx: &mut TickContext<'_>, room: &RoomName) {
        let towers: Vec<Structure> = ctx
            .structures_of(room, StructureKind::Tower)
            .into_iter()
            .filter(|t| t.energy() > MIN_TOWER_ENERGY)
            .collect();
        let hostiles = ctx.hostiles(room);

        if towers.is_empty() {
            if hostiles.iter().any(|h| h.is_armed()) {
                let result = ctx.host_mut().activate_safe_mode(room);
                tracing::warn!(room = %room, ?result, "armed hostiles and no charged tower, safe mode requested");
            }
            return;
        }

        let repairs = ctx.repair_targets(room);
        let ceiling = ctx.config().wall_repair_ceiling;
        let mut fortifications: Vec<Structure> = ctx
            .structures(room)
            .iter()
            .filter(|s| s.kind.is_fortification() && s.hits < ceiling)
            .cloned()
            .collect();
        fortifications.sort_by_key(|s| s.hits);

        for tower in &towers {
            let intent = if let Some(hostile) = closest_by_range(&tower.pos, hostiles.iter(), |h| &h.pos) {
                StructureIntent::TowerAttack(hostile.id.clone())
            } else if let Some(damaged) = closest_by_range(&tower.pos, &repairs, |s| &s.pos) {
                StructureIntent::TowerRepair(damaged.id.clone())
            } else if let Some(weakest) = fortifications.first() {
                StructureIntent::TowerRepair(weakest.id.clone())
            } else {
                continue;
            };

            let result = ctx.host_mut().issue_structure(&tower.id, intent.clone());
            if result != IntentResult::Ok {
                tracing::debug!(tower = %tower.id, ?intent, ?result, "tower intent rejected");
            }
        }
    }
}
