//! Body profiles
//!
//! A profile is a repeating part pattern plus a tier cap. Managers pick the
//! largest tier the spawning room can afford.

use crate::core::types::BodyPart;

use BodyPart::{Attack, Carry, Claim, Move, Work};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyProfile {
    /// WORK WORK MOVE per tier
    Harvester,
    /// CLAIM plus six MOVE
    Claimer,
    /// CARRY MOVE per tier
    Hauler,
    /// WORK MOVE CARRY MOVE per tier
    SimpleWorker,
    /// Mostly WORK, alternating WORK WORK MOVE MOVE and WORK CARRY MOVE MOVE
    HeavyWorker,
    /// A single MOVE
    Scout,
    /// ATTACK MOVE, ten times
    Defender,
}

impl BodyProfile {
    pub fn max_tier(self) -> u32 {
        match self {
            BodyProfile::Harvester => 3,
            BodyProfile::Claimer => 1,
            BodyProfile::Hauler => 16,
            BodyProfile::SimpleWorker => 10,
            BodyProfile::HeavyWorker => 8,
            BodyProfile::Scout | BodyProfile::Defender => 1,
        }
    }
}

fn repeat(body: &mut Vec<BodyPart>, count: u32, pattern: &[BodyPart]) {
    for _ in 0..count {
        body.extend_from_slice(pattern);
    }
}

/// Body for `profile` at `tier`, clamped to the profile's cap
pub fn compose_body(profile: BodyProfile, tier: u32) -> Vec<BodyPart> {
    let tier = tier.min(profile.max_tier());
    let mut body = Vec::new();
    match profile {
        BodyProfile::Harvester => repeat(&mut body, tier, &[Work, Work, Move]),
        BodyProfile::Claimer => repeat(&mut body, tier, &[Claim, Move, Move, Move, Move, Move, Move]),
        BodyProfile::Hauler => repeat(&mut body, tier, &[Carry, Move]),
        BodyProfile::SimpleWorker => repeat(&mut body, tier, &[Work, Move, Carry, Move]),
        BodyProfile::HeavyWorker => {
            repeat(&mut body, tier / 2, &[Work, Work, Move, Move]);
            repeat(&mut body, tier.div_ceil(2), &[Work, Carry, Move, Move]);
        }
        BodyProfile::Scout => body.push(Move),
        BodyProfile::Defender => repeat(&mut body, 10, &[Attack, Move]),
    }
    body
}

pub fn body_cost(body: &[BodyPart]) -> u32 {
    body.iter().map(|p| p.cost()).sum()
}

/// Largest tier whose body costs at most `energy`; 0 when even tier 1 is too expensive
pub fn max_affordable_tier(profile: BodyProfile, energy: u32) -> u32 {
    (1..=profile.max_tier())
        .take_while(|&tier| body_cost(&compose_body(profile, tier)) <= energy)
        .last()
        .unwrap_or(0)
}

/// Fixed harvester for rooms with 550..750 spawn capacity: five WORK saturate a source
pub fn rcl2_harvester_body() -> Vec<BodyPart> {
    vec![Work, Work, Work, Work, Work, Move]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::count_parts;

    #[test]
    fn test_compositions() {
        assert_eq!(compose_body(BodyProfile::Harvester, 2), vec![Work, Work, Move, Work, Work, Move]);
        assert_eq!(compose_body(BodyProfile::Hauler, 1), vec![Carry, Move]);
        assert_eq!(compose_body(BodyProfile::Scout, 4), vec![Move]);

        let heavy = compose_body(BodyProfile::HeavyWorker, 3);
        assert_eq!(heavy.len(), 12);
        assert_eq!(count_parts(&heavy, Work), 4);
        assert_eq!(count_parts(&heavy, Carry), 2);

        let defender = compose_body(BodyProfile::Defender, 1);
        assert_eq!(count_parts(&defender, Attack), 10);
        assert_eq!(count_parts(&defender, Move), 10);
    }

    #[test]
    fn test_tier_is_clamped() {
        assert_eq!(compose_body(BodyProfile::Harvester, 9).len(), 9);
        assert_eq!(compose_body(BodyProfile::Claimer, 3).len(), 7);
    }

    #[test]
    fn test_max_affordable_tier() {
        // harvester tier costs 250
        assert_eq!(max_affordable_tier(BodyProfile::Harvester, 249), 0);
        assert_eq!(max_affordable_tier(BodyProfile::Harvester, 300), 1);
        assert_eq!(max_affordable_tier(BodyProfile::Harvester, 10_000), 3);
        // hauler tier costs 100
        assert_eq!(max_affordable_tier(BodyProfile::Hauler, 550), 5);
        assert_eq!(max_affordable_tier(BodyProfile::Claimer, 899), 0);
        assert_eq!(max_affordable_tier(BodyProfile::Claimer, 900), 1);
    }

    #[test]
    fn test_rcl2_body_cost() {
        assert_eq!(body_cost(&rcl2_harvester_body()), 550);
    }
}
