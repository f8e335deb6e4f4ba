//! Per-room spawn order queue

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::RoomName;
use crate::spawning::order::{Order, Priority};
use crate::units::memory::{Role, TargetKey};

/// Priority-partitioned FIFO of spawn orders for one room
///
/// Dequeues strictly from the highest non-empty priority, first-in first-out
/// within a priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderQueue {
    lanes: [VecDeque<Order>; Priority::COUNT],
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, order: Order) {
        self.lanes[order.priority.index()].push_back(order);
    }

    pub fn peek(&self) -> Option<&Order> {
        Priority::DESCENDING
            .iter()
            .find_map(|p| self.lanes[p.index()].front())
    }

    pub fn pop(&mut self) -> Option<Order> {
        for priority in Priority::DESCENDING {
            if let Some(order) = self.lanes[priority.index()].pop_front() {
                return Some(order);
            }
        }
        None
    }

    /// Queued orders whose seed memory carries this role (and target, if given)
    pub fn count(&self, role: Role, target: Option<&TargetKey>) -> u32 {
        self.iter()
            .filter(|o| o.memory.matches(role, target, None))
            .count() as u32
    }

    pub fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    /// Orders in dequeue order
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        Priority::DESCENDING
            .into_iter()
            .flat_map(move |p| self.lanes[p.index()].iter())
    }
}

/// All spawn queues of the colony, keyed by the room that will spawn the order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    rooms: BTreeMap<RoomName, OrderQueue>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, room: &RoomName) -> Option<&OrderQueue> {
        self.rooms.get(room)
    }

    pub fn queue_mut(&mut self, room: &RoomName) -> &mut OrderQueue {
        self.rooms.entry(room.clone()).or_default()
    }

    pub fn push(&mut self, room: &RoomName, order: Order) {
        self.queue_mut(room).push(order);
    }

    pub fn peek(&self, room: &RoomName) -> Option<&Order> {
        self.rooms.get(room).and_then(OrderQueue::peek)
    }

    pub fn pop(&mut self, room: &RoomName) -> Option<Order> {
        self.rooms.get_mut(room).and_then(OrderQueue::pop)
    }

    pub fn count(&self, room: &RoomName, role: Role, target: Option<&TargetKey>) -> u32 {
        self.rooms.get(room).map_or(0, |q| q.count(role, target))
    }

    /// Queued orders for a key across every room's queue
    pub fn count_all(&self, role: Role, target: Option<&TargetKey>) -> u32 {
        self.rooms.values().map(|q| q.count(role, target)).sum()
    }

    pub fn len(&self) -> usize {
        self.rooms.values().map(OrderQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.values().all(OrderQueue::is_empty)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomName> {
        self.rooms.keys()
    }
}
