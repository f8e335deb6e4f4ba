//! Room classification
//!
//! Every owned room is put in one bucket per tick. The bucket decides which
//! managers look after it.

use serde::{Deserialize, Serialize};

use crate::host::RoomSnapshot;

/// Controller level at which a room counts as fully developed
pub const DEVELOPED_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    /// Has a spawn and controller level 3+
    Normal,
    /// Has a spawn, controller below level 3
    InDev,
    /// Claimed, no spawn yet, spawn construction site placed
    ToBuildSpawn,
    /// Claimed, no spawn and no spawn site
    ToBuildBase,
}

impl RoomType {
    /// Rooms that still need outside help (pioneers) to get going
    pub fn is_developing(self) -> bool {
        !matches!(self, RoomType::Normal)
    }
}

/// Classify a room, or `None` when it is not one of ours
pub fn classify(room: &RoomSnapshot, has_spawn: bool, has_spawn_site: bool) -> Option<RoomType> {
    let controller = room.controller.as_ref()?;
    if !controller.my || controller.level < 1 {
        return None;
    }

    let room_type = match (has_spawn, has_spawn_site) {
        (false, true) => RoomType::ToBuildSpawn,
        (false, false) => RoomType::ToBuildBase,
        (true, _) if controller.level < DEVELOPED_LEVEL => RoomType::InDev,
        (true, _) => RoomType::Normal,
    };
    Some(room_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectId, Position, RoomName};
    use crate::host::Controller;

    fn snapshot(level: u8, my: bool) -> RoomSnapshot {
        RoomSnapshot {
            name: RoomName::from("W1N1"),
            controller: Some(Controller {
                id: ObjectId::from("ctrl"),
                pos: Position::new("W1N1", 20, 20),
                level,
                my,
            }),
            energy_available: 300,
            energy_capacity_available: 300,
        }
    }

    #[test]
    fn test_classify_by_level_and_spawn() {
        assert_eq!(classify(&snapshot(4, true), true, false), Some(RoomType::Normal));
        assert_eq!(classify(&snapshot(3, true), true, false), Some(RoomType::Normal));
        assert_eq!(classify(&snapshot(2, true), true, false), Some(RoomType::InDev));
        assert_eq!(classify(&snapshot(1, true), false, true), Some(RoomType::ToBuildSpawn));
        assert_eq!(classify(&snapshot(1, true), false, false), Some(RoomType::ToBuildBase));
    }

    #[test]
    fn test_foreign_or_unowned_rooms_are_skipped() {
        assert_eq!(classify(&snapshot(5, false), true, false), None);
        assert_eq!(classify(&snapshot(0, true), false, false), None);

        let mut no_controller = snapshot(1, true);
        no_controller.controller = None;
        assert_eq!(classify(&no_controller, false, false), None);
    }

    #[test]
    fn test_developing() {
        assert!(!RoomType::Normal.is_developing());
        assert!(RoomType::InDev.is_developing());
        assert!(RoomType::ToBuildBase.is_developing());
    }
}
