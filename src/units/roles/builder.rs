//! Builder: works down the construction backlog, then keeps structures repaired

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{closest_by_range, UnitIntent};
use crate::units::actions::{act_or_approach, withdraw_energy};
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuilderState {
    #[default]
    WithdrawEnergy,
    BuildConstruction,
    RepairStructure,
}

impl StateMachine for BuilderState {
    fn wrap(self) -> RoleState {
        RoleState::Builder(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Builder(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            BuilderState::WithdrawEnergy => "withdraw",
            BuilderState::BuildConstruction => "build",
            BuilderState::RepairStructure => "repair",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<BuilderState>(unit) {
        BuilderState::WithdrawEnergy => withdraw(unit, ctx),
        BuilderState::BuildConstruction => build(unit, ctx),
        BuilderState::RepairStructure => repair(unit, ctx),
    }
}

fn withdraw(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_full() {
        unit.transition(ctx, BuilderState::BuildConstruction);
        return build(unit, ctx);
    }

    // Leave the energy to spawning until spawns and extensions are topped up
    let room = unit.room().clone();
    if ctx.room(&room).is_some_and(|r| !r.spawn_energy_full()) {
        return Ok(());
    }

    withdraw_energy(unit, ctx);
    Ok(())
}

fn build(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, BuilderState::WithdrawEnergy);
        return withdraw(unit, ctx);
    }

    let room = unit.room().clone();
    let sites = ctx.construction_sites(&room);
    let Some(site) = sites.first() else {
        unit.transition(ctx, BuilderState::RepairStructure);
        if ctx.repair_targets(&room).is_empty() {
            return Ok(());
        }
        return repair(unit, ctx);
    };

    act_or_approach(unit, ctx, UnitIntent::Build(site.id.clone()), &site.pos);
    Ok(())
}

fn repair(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, BuilderState::WithdrawEnergy);
        return withdraw(unit, ctx);
    }

    let room = unit.room().clone();
    let damaged = ctx.repair_targets(&room);
    let Some(target) = closest_by_range(unit.pos(), &damaged, |s| &s.pos) else {
        unit.transition(ctx, BuilderState::BuildConstruction);
        if ctx.construction_sites(&room).is_empty() {
            return Ok(());
        }
        return build(unit, ctx);
    };

    act_or_approach(unit, ctx, UnitIntent::Repair(target.id.clone()), &target.pos);
    Ok(())
}
