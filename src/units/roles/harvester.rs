//! Harvester: mines one assigned source and stages the energy next to it

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{closest_by_range, UnitIntent};
use crate::units::actions::act_or_approach;
use crate::units::memory::{RoleState, TargetKey};
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvesterState {
    #[default]
    HarvestEnergy,
    Discharge,
}

impl StateMachine for HarvesterState {
    fn wrap(self) -> RoleState {
        RoleState::Harvester(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Harvester(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            HarvesterState::HarvestEnergy => "harvest",
            HarvesterState::Discharge => "discharge",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<HarvesterState>(unit) {
        HarvesterState::HarvestEnergy => harvest(unit, ctx),
        HarvesterState::Discharge => discharge(unit, ctx),
    }
}

fn harvest(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_full() {
        unit.transition(ctx, HarvesterState::Discharge);
        return discharge(unit, ctx);
    }

    let Some(TargetKey::Object { room, id }) = unit.target().cloned() else {
        unit.say(ctx, "no target");
        tracing::debug!(unit = unit.name(), "harvester without a source target");
        return Ok(());
    };

    if unit.room() != &room {
        ctx.host_mut().travel_to(unit.name(), &room);
        return Ok(());
    }

    let sources = ctx.sources(&room);
    match sources.iter().find(|s| s.id == id) {
        Some(source) => {
            act_or_approach(unit, ctx, UnitIntent::Harvest(source.id.clone()), &source.pos);
        }
        None => unit.say(ctx, "no source"),
    }
    Ok(())
}

/// Hand energy to the source's link, else its container, else drop it
fn discharge(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, HarvesterState::HarvestEnergy);
        return harvest(unit, ctx);
    }

    let room = unit.room().clone();
    let tanks = match unit.target().and_then(TargetKey::object_id) {
        Some(source) => ctx.source_tanks(&room, source),
        None => Vec::new(),
    };

    let links = tanks
        .iter()
        .filter(|t| t.is_link() && t.structure.free_capacity() > 0)
        .map(|t| &t.structure);
    let containers = tanks
        .iter()
        .filter(|t| !t.is_link() && t.structure.free_capacity() > 0)
        .map(|t| &t.structure);

    let tank = closest_by_range(unit.pos(), links, |s| &s.pos)
        .or_else(|| closest_by_range(unit.pos(), containers, |s| &s.pos));

    match tank {
        Some(tank) => {
            act_or_approach(unit, ctx, UnitIntent::Transfer(tank.id.clone()), &tank.pos);
        }
        None => {
            unit.say(ctx, "no tank");
            ctx.host_mut().issue(unit.name(), UnitIntent::Drop);
        }
    }
    Ok(())
}
