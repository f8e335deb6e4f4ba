//! Upgrader: feeds the room controller

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::UnitIntent;
use crate::units::actions::{act_or_approach, withdraw_energy};
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgraderState {
    #[default]
    WithdrawEnergy,
    UpgradeController,
}

impl StateMachine for UpgraderState {
    fn wrap(self) -> RoleState {
        RoleState::Upgrader(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Upgrader(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            UpgraderState::WithdrawEnergy => "withdraw",
            UpgraderState::UpgradeController => "upgrade",
        }
    }
}

pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<UpgraderState>(unit) {
        UpgraderState::WithdrawEnergy => withdraw(unit, ctx),
        UpgraderState::UpgradeController => upgrade(unit, ctx),
    }
}

fn withdraw(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_full() {
        unit.transition(ctx, UpgraderState::UpgradeController);
        return upgrade(unit, ctx);
    }

    // Without storage every unit of energy is contested; spawning goes first
    let room = unit.room().clone();
    if ctx.storage(&room).is_none() && ctx.room(&room).is_some_and(|r| !r.spawn_energy_full()) {
        return Ok(());
    }

    withdraw_energy(unit, ctx);
    Ok(())
}

fn upgrade(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    if unit.is_empty() {
        unit.transition(ctx, UpgraderState::WithdrawEnergy);
        return withdraw(unit, ctx);
    }

    let room = unit.room().clone();
    let Some(controller) = ctx.room(&room).and_then(|r| r.controller.clone()) else {
        unit.say(ctx, "no controller");
        return Ok(());
    };

    act_or_approach(unit, ctx, UnitIntent::Upgrade(controller.id.clone()), &controller.pos);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OverseerConfig;
    use crate::core::types::RoomName;
    use crate::host::{Host, SimHost, StructureKind};
    use crate::units::memory::{Role, UnitMemory};

    fn run_once(host: &mut SimHost) {
        let view = host.unit_view("u").unwrap();
        let mut unit = Unit::new(view.clone(), view.memory.unwrap());
        let config = OverseerConfig::default();
        let mut ctx = TickContext::new(host, &config);
        run(&mut unit, &mut ctx).unwrap();
    }

    #[test]
    fn test_withdraw_waits_for_spawn_energy_without_storage() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 2);
        host.add_container(&room, 21, 20, 2000);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Upgrader));
        host.set_carry("u", 0, 50);
        host.set_spawn_energy(&room, 100, 300);

        run_once(&mut host);
        assert!(host.intents_of("u").is_empty());
    }

    #[test]
    fn test_withdraw_ungated_with_storage() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 4);
        let storage = host.add_structure(&room, StructureKind::Storage, 21, 20);
        host.set_store(&room, StructureKind::Storage, 10_000);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Upgrader));
        host.set_carry("u", 0, 50);
        host.set_spawn_energy(&room, 100, 300);

        run_once(&mut host);
        assert_eq!(host.intents_of("u"), vec![UnitIntent::Withdraw(storage)]);
    }

    #[test]
    fn test_full_upgrader_upgrades_controller() {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 2);
        let controller = host.room(&room).unwrap().controller.unwrap();
        host.add_unit_at("u", &room, controller.pos.x, controller.pos.y + 2, UnitMemory::new(Role::Upgrader));
        host.set_carry("u", 50, 50);

        run_once(&mut host);
        assert_eq!(host.intents_of("u"), vec![UnitIntent::Upgrade(controller.id)]);
    }
}
