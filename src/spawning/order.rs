//! Spawn orders and their priorities

use serde::{Deserialize, Serialize};

use crate::core::types::BodyPart;
use crate::units::memory::UnitMemory;

/// Spawn order priority levels with explicit ordering values
///
/// Higher numeric value = higher priority. The queue dequeues strictly from
/// the highest non-empty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Trivial = 0,
    Low = 1,
    Standard = 2,
    Important = 3,
    Critical = 4,
}

impl Priority {
    pub const COUNT: usize = 5;

    /// Highest first
    pub const DESCENDING: [Priority; 5] = [
        Priority::Critical,
        Priority::Important,
        Priority::Standard,
        Priority::Low,
        Priority::Trivial,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A request to spawn one unit. Immutable once pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub body: Vec<BodyPart>,
    pub priority: Priority,
    /// Memory the unit starts its life with
    pub memory: UnitMemory,
}

impl Order {
    pub fn new(body: Vec<BodyPart>, priority: Priority, memory: UnitMemory) -> Self {
        Self { body, priority, memory }
    }

    pub fn cost(&self) -> u32 {
        self.body.iter().map(|p| p.cost()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::memory::Role;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::Important);
        assert!(Priority::Important > Priority::Standard);
        assert!(Priority::Standard > Priority::Low);
        assert!(Priority::Low > Priority::Trivial);
        assert_eq!(Priority::DESCENDING[0], Priority::Critical);
    }

    #[test]
    fn test_order_cost() {
        let order = Order::new(
            vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move],
            Priority::Standard,
            UnitMemory::new(Role::Builder),
        );
        assert_eq!(order.cost(), 200);
    }
}
