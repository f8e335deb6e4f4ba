//! Claimer: takes over the controller of its target room

use serde::{Deserialize, Serialize};

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::UnitIntent;
use crate::units::actions::act_or_approach;
use crate::units::memory::RoleState;
use crate::units::{resolve_state, StateMachine, Unit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimerState {
    #[default]
    Claim,
}

impl StateMachine for ClaimerState {
    fn wrap(self) -> RoleState {
        RoleState::Claimer(self)
    }

    fn from_role_state(state: &RoleState) -> Option<Self> {
        match state {
            RoleState::Claimer(s) => Some(*s),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        "claim"
    }
}

/// Retries every tick until the claim lands or the unit expires
pub fn run(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    match resolve_state::<ClaimerState>(unit) {
        ClaimerState::Claim => claim(unit, ctx),
    }
}

fn claim(unit: &mut Unit, ctx: &mut TickContext<'_>) -> Result<()> {
    let Some(target) = unit.target_room() else {
        unit.say(ctx, "no target");
        tracing::debug!(unit = unit.name(), "claimer without a target room");
        return Ok(());
    };

    let controller = if unit.room() == &target {
        ctx.room(&target).and_then(|r| r.controller.clone())
    } else {
        None
    };

    match controller {
        Some(controller) => {
            act_or_approach(unit, ctx, UnitIntent::Claim(controller.id.clone()), &controller.pos);
        }
        None => {
            ctx.host_mut().travel_to(unit.name(), &target);
        }
    }
    Ok(())
}
