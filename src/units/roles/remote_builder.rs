//! Remote builder: fetches energy at home and builds up a remote room

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{closest_by_range, StructureKind, UnitIntent};
use crate::units::actions::{act_or_approach, withdraw_energy};
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteBuilderState {
    #[default]
    WithdrawEnergy,
    BuildConstruction,
    RepairStructure,
}

impl StateMachine for RemoteBuilderState {
    fn wrap(self) -> RoleState {
        RoleState::RemoteBuilder(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::RemoteBuilder(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            RemoteBuilderState::WithdrawEnergy => "withdraw",
            RemoteBuilderState::BuildConstruction => "build",
            RemoteBuilderState::RepairStructure => "repair",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<RemoteBuilderState>(unit) {
        RemoteBuilderState::WithdrawEnergy => withdraw(unit, ctx),
        RemoteBuilderState::BuildConstruction => build(unit, ctx),
        RemoteBuilderState::RepairStructure => repair(unit, ctx),
    }
}

fn withdraw(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_full() {
        unit.transition(ctx, RemoteBuilderState::BuildConstruction);
        return build(unit, ctx);
    }

    let home = unit.homeroom();
    if unit.room() != &home {
        ctx.host_mut().travel_to(unit.name(), &home);
        return Ok(());
    }

    if ctx.room(&home).is_some_and(|r| !r.spawn_energy_full()) {
        return Ok(());
    }
    withdraw_energy(unit, ctx);
    Ok(())
}

fn build(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, RemoteBuilderState::WithdrawEnergy);
        return withdraw(unit, ctx);
    }

    if let Some(target) = unit.target_room() {
        if unit.room() != &target {
            ctx.host_mut().travel_to(unit.name(), &target);
            return Ok(());
        }
    }

    let room = unit.room().clone();
    let sites = ctx.construction_sites(&room);
    match sites.first() {
        Some(site) => {
            act_or_approach(unit, ctx, UnitIntent::Build(site.id.clone()), &site.pos);
            Ok(())
        }
        None => {
            unit.transition(ctx, RemoteBuilderState::RepairStructure);
            repair(unit, ctx)
        }
    }
}

/// Only roads and containers; anything else in a remote room is not ours to keep
fn repair(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, RemoteBuilderState::WithdrawEnergy);
        return withdraw(unit, ctx);
    }

    let room = unit.room().clone();
    let structures = ctx.structures(&room);
    let damaged = structures.iter().filter(|s| {
        s.is_damaged() && matches!(s.kind, StructureKind::Road | StructureKind::Container)
    });
    if let Some(target) = closest_by_range(unit.pos(), damaged, |s| &s.pos) {
        act_or_approach(unit, ctx, UnitIntent::Repair(target.id.clone()), &target.pos);
    }
    Ok(())
}
