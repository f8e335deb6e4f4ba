//! Behaviors shared across roles

use crate::colony::TickContext;
use crate::core::types::Position;
use crate::host::{closest_by_range, IntentResult, Structure, UnitIntent};
use crate::units::Unit;

/// Issue `intent`; when the target is out of range, step toward it instead
pub fn act_or_approach(
    unit: &Unit,
    ctx: &mut TickContext<'_>,
    intent: UnitIntent,
    target: &Position,
) -> IntentResult {
    let result = ctx.host_mut().issue(unit.name(), intent);
    if result == IntentResult::NotInRange {
        ctx.host_mut().issue(unit.name(), UnitIntent::Move(target.clone()));
    }
    result
}

fn withdraw_from(unit: &Unit, ctx: &mut TickContext<'_>, bank: &Structure) {
    act_or_approach(unit, ctx, UnitIntent::Withdraw(bank.id.clone()), &bank.pos);
}

/// Pull energy from the closest full container, then the closest container
/// holding more than the unit can take, then storage.
///
/// Returns `false` when no bank qualifies.
pub fn withdraw_energy(unit: &Unit, ctx: &mut TickContext<'_>) -> bool {
    let room = unit.room().clone();
    let need = unit.free_capacity();
    let containers = ctx.containers(&room);

    let full: Vec<&Structure> = containers
        .iter()
        .filter(|c| c.store.is_some_and(|s| s.is_full()))
        .collect();
    if let Some(bank) = closest_by_range(unit.pos(), full.iter().copied(), |c| &c.pos) {
        withdraw_from(unit, ctx, bank);
        return true;
    }

    let stocked: Vec<&Structure> = containers.iter().filter(|c| c.energy() > need).collect();
    if let Some(bank) = closest_by_range(unit.pos(), stocked.iter().copied(), |c| &c.pos) {
        withdraw_from(unit, ctx, bank);
        return true;
    }

    if let Some(storage) = ctx.storage(&room).filter(|s| s.energy() >= need) {
        withdraw_from(unit, ctx, &storage);
        return true;
    }

    false
}

/// Deliver to the closest spawn, extension or tower with room to spare.
///
/// Returns `false` when every sink is full.
pub fn transfer_energy(unit: &Unit, ctx: &mut TickContext<'_>) -> bool {
    let room = unit.room().clone();
    let structures = ctx.structures(&room);
    let sinks = structures
        .iter()
        .filter(|s| s.kind.is_energy_sink() && s.free_capacity() > 0);

    match closest_by_range(unit.pos(), sinks, |s| &s.pos) {
        Some(sink) => {
            act_or_approach(unit, ctx, UnitIntent::Transfer(sink.id.clone()), &sink.pos);
            true
        }
        None => false,
    }
}
