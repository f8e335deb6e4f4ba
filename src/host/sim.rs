//! In-memory host
//!
//! A small deterministic world used by the test suite and the demo binary.
//! It keeps to the host contract: reads return tick-start state, intents are
//! checked on submission and only take effect in [`SimHost::end_tick`].
//!
//! Movement is coarse. `Move` steps one tile; `travel_to` places the unit in
//! the middle of the destination room at the end of the tick.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{
    count_parts, BodyPart, ObjectId, Position, RoomName, Store, Tick, CARRY_CAPACITY,
};
use crate::host::{
    ConstructionSite, Controller, DroppedEnergy, Host, Hostile, IntentResult, Mineral,
    RoomSnapshot, Source, Structure, StructureIntent, StructureKind, UnitIntent, UnitView,
    INVADER_OWNER,
};
use crate::spawning::OrderBook;
use crate::units::memory::UnitMemory;

const SOURCE_CAPACITY: u32 = 3000;
const SOURCE_REGEN_TICKS: Tick = 300;
const UNIT_LIFESPAN: u32 = 1500;
const SPAWN_REGEN_LIMIT: u32 = 300;
const CONTROLLER_TILE: (u8, u8) = (25, 5);

const HARVEST_POWER: u32 = 2;
const BUILD_POWER: u32 = 5;
const REPAIR_POWER: u32 = 100;
const ATTACK_POWER: u32 = 30;
const TOWER_ENERGY_COST: u32 = 10;
const TOWER_ATTACK_POWER: u32 = 300;
const TOWER_REPAIR_POWER: u32 = 800;

/// Upgrade points needed to leave each controller level
const LEVEL_PROGRESS: [u32; 7] = [200, 45_000, 135_000, 405_000, 1_215_000, 3_645_000, 10_935_000];

/// Hit points and energy store of a freshly built structure
fn structure_defaults(kind: StructureKind) -> (u32, Option<Store>) {
    match kind {
        StructureKind::Spawn => (5_000, Some(Store::empty(300))),
        StructureKind::Extension => (1_000, Some(Store::empty(50))),
        StructureKind::Tower => (3_000, Some(Store::empty(1_000))),
        StructureKind::Container => (250_000, Some(Store::empty(2_000))),
        StructureKind::Storage => (10_000, Some(Store::empty(1_000_000))),
        StructureKind::Link => (1_000, Some(Store::empty(800))),
        StructureKind::Road => (5_000, None),
        StructureKind::Wall | StructureKind::Rampart => (300_000_000, None),
        StructureKind::Extractor => (500, None),
    }
}

fn site_cost(kind: StructureKind) -> u32 {
    match kind {
        StructureKind::Spawn => 15_000,
        StructureKind::Extension => 3_000,
        StructureKind::Tower | StructureKind::Container | StructureKind::Link => 5_000,
        StructureKind::Storage => 30_000,
        StructureKind::Road => 300,
        StructureKind::Wall | StructureKind::Rampart => 1,
        StructureKind::Extractor => 5_000,
    }
}

fn kind_prefix(kind: StructureKind) -> String {
    format!("{kind:?}").to_lowercase()
}

#[derive(Debug, Default)]
struct SimRoom {
    controller: Option<Controller>,
    upgrade_progress: u32,
    /// Fixed (available, capacity) pair; derived from spawns and extensions when unset
    spawn_energy: Option<(u32, u32)>,
    structures: Vec<Structure>,
    sources: Vec<Source>,
    minerals: Vec<Mineral>,
    sites: Vec<ConstructionSite>,
    drops: Vec<DroppedEnergy>,
    hostiles: Vec<Hostile>,
}

impl SimRoom {
    fn spawn_energy(&self) -> (u32, u32) {
        self.spawn_energy.unwrap_or_else(|| {
            self.structures
                .iter()
                .filter(|s| matches!(s.kind, StructureKind::Spawn | StructureKind::Extension))
                .filter_map(|s| s.store)
                .fold((0, 0), |(energy, capacity), store| {
                    (energy + store.energy, capacity + store.capacity)
                })
        })
    }

    fn drain_spawn_energy(&mut self, mut cost: u32) {
        if let Some((available, _)) = self.spawn_energy.as_mut() {
            *available = available.saturating_sub(cost);
            return;
        }
        let mut feeders: Vec<&mut Structure> = self
            .structures
            .iter_mut()
            .filter(|s| matches!(s.kind, StructureKind::Spawn | StructureKind::Extension))
            .collect();
        feeders.sort_by_key(|s| s.kind != StructureKind::Spawn);
        for feeder in feeders {
            let Some(store) = feeder.store.as_mut() else {
                continue;
            };
            let taken = store.energy.min(cost);
            store.energy -= taken;
            cost -= taken;
            if cost == 0 {
                break;
            }
        }
    }

    /// Spawns trickle one energy per tick while the room holds less than a spawn's worth
    fn regenerate_spawn(&mut self) {
        if self.spawn_energy.is_some() || self.spawn_energy().0 >= SPAWN_REGEN_LIMIT {
            return;
        }
        let spawn_store = self
            .structures
            .iter_mut()
            .filter(|s| s.kind == StructureKind::Spawn)
            .find_map(|s| s.store.as_mut().filter(|store| store.free() > 0));
        if let Some(store) = spawn_store {
            store.energy += 1;
        }
    }

    fn spill(&mut self, id: ObjectId, pos: &Position, amount: u32) {
        if amount == 0 {
            return;
        }
        match self.drops.iter_mut().find(|d| &d.pos == pos) {
            Some(pile) => pile.amount += amount,
            None => self.drops.push(DroppedEnergy { id, pos: pos.clone(), amount }),
        }
    }
}

/// What an object id resolves to
#[derive(Debug, Clone)]
enum Target {
    Structure(Structure),
    Source(Source),
    Mineral(Mineral),
    Site(ConstructionSite),
    Drop(DroppedEnergy),
    Hostile(Hostile),
    Controller(Controller),
}

impl Target {
    fn pos(&self) -> &Position {
        match self {
            Target::Structure(s) => &s.pos,
            Target::Source(s) => &s.pos,
            Target::Mineral(m) => &m.pos,
            Target::Site(s) => &s.pos,
            Target::Drop(d) => &d.pos,
            Target::Hostile(h) => &h.pos,
            Target::Controller(c) => &c.pos,
        }
    }
}

fn intent_object(intent: &UnitIntent) -> Option<&ObjectId> {
    match intent {
        UnitIntent::Harvest(id)
        | UnitIntent::Transfer(id)
        | UnitIntent::Withdraw(id)
        | UnitIntent::Pickup(id)
        | UnitIntent::Build(id)
        | UnitIntent::Repair(id)
        | UnitIntent::Upgrade(id)
        | UnitIntent::Attack(id)
        | UnitIntent::Claim(id) => Some(id),
        UnitIntent::Move(_) | UnitIntent::TransferToUnit(_) | UnitIntent::Drop => None,
    }
}

/// Intents a unit has queued this tick: one action plus one movement
#[derive(Debug, Default)]
struct PendingIntents {
    action: Option<UnitIntent>,
    movement: Option<UnitIntent>,
}

#[derive(Debug, Default)]
pub struct SimHost {
    tick: Tick,
    next_id: u64,
    rooms: BTreeMap<RoomName, SimRoom>,
    exits: BTreeMap<RoomName, Vec<RoomName>>,
    units: BTreeMap<String, UnitView>,
    unit_intents: BTreeMap<String, PendingIntents>,
    structure_intents: BTreeMap<ObjectId, StructureIntent>,
    travel: BTreeMap<String, Vec<RoomName>>,
    said: BTreeMap<String, String>,
    safe_mode: BTreeSet<RoomName>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self, prefix: &str) -> ObjectId {
        self.next_id += 1;
        ObjectId(format!("{prefix}-{}", self.next_id))
    }

    fn room_mut(&mut self, room: &RoomName) -> &mut SimRoom {
        self.rooms.entry(room.clone()).or_default()
    }

    // === WORLD SETUP ===

    /// Add a visible room we own at `level`. Level 0 means no controller.
    pub fn add_room(&mut self, room: &RoomName, level: u8) {
        let controller = (level > 0).then(|| Controller {
            id: ObjectId(format!("controller-{room}")),
            pos: Position::new(room.clone(), CONTROLLER_TILE.0, CONTROLLER_TILE.1),
            level,
            my: true,
        });
        self.room_mut(room).controller = controller;
    }

    /// Add a visible room with an unowned controller
    pub fn add_neutral_room(&mut self, room: &RoomName) {
        self.room_mut(room).controller = Some(Controller {
            id: ObjectId(format!("controller-{room}")),
            pos: Position::new(room.clone(), CONTROLLER_TILE.0, CONTROLLER_TILE.1),
            level: 0,
            my: false,
        });
    }

    pub fn add_structure(&mut self, room: &RoomName, kind: StructureKind, x: u8, y: u8) -> ObjectId {
        let id = self.fresh_id(&kind_prefix(kind));
        let (hits_max, store) = structure_defaults(kind);
        self.room_mut(room).structures.push(Structure {
            id: id.clone(),
            kind,
            pos: Position::new(room.clone(), x, y),
            hits: hits_max,
            hits_max,
            store,
        });
        id
    }

    pub fn add_container(&mut self, room: &RoomName, x: u8, y: u8, energy: u32) -> ObjectId {
        let id = self.add_structure(room, StructureKind::Container, x, y);
        self.with_structure(&id, |s| {
            if let Some(store) = s.store.as_mut() {
                store.energy = energy.min(store.capacity);
            }
        });
        id
    }

    pub fn add_source(&mut self, room: &RoomName, id: &str, x: u8, y: u8) -> ObjectId {
        let id = ObjectId::from(id);
        self.room_mut(room).sources.push(Source {
            id: id.clone(),
            pos: Position::new(room.clone(), x, y),
            energy: SOURCE_CAPACITY,
            energy_capacity: SOURCE_CAPACITY,
        });
        id
    }

    pub fn add_mineral(&mut self, room: &RoomName, id: &str, x: u8, y: u8) -> ObjectId {
        let id = ObjectId::from(id);
        self.room_mut(room).minerals.push(Mineral {
            id: id.clone(),
            pos: Position::new(room.clone(), x, y),
            amount: 70_000,
        });
        id
    }

    pub fn add_site(&mut self, room: &RoomName, kind: StructureKind, x: u8, y: u8) -> ObjectId {
        let id = self.fresh_id("site");
        self.room_mut(room).sites.push(ConstructionSite {
            id: id.clone(),
            pos: Position::new(room.clone(), x, y),
            kind,
            progress: 0,
            progress_total: site_cost(kind),
        });
        id
    }

    pub fn add_drop(&mut self, room: &RoomName, x: u8, y: u8, amount: u32) -> ObjectId {
        let id = self.fresh_id("drop");
        self.room_mut(room).drops.push(DroppedEnergy {
            id: id.clone(),
            pos: Position::new(room.clone(), x, y),
            amount,
        });
        id
    }

    /// Add an invader. Armed invaders carry an ATTACK part.
    pub fn add_hostile(&mut self, room: &RoomName, id: &str, x: u8, y: u8, armed: bool) -> ObjectId {
        let id = ObjectId::from(id);
        let body = if armed {
            vec![BodyPart::Attack, BodyPart::Move]
        } else {
            vec![BodyPart::Move]
        };
        self.room_mut(room).hostiles.push(Hostile {
            id: id.clone(),
            pos: Position::new(room.clone(), x, y),
            owner: INVADER_OWNER.to_string(),
            hits: 100,
            body,
        });
        id
    }

    pub fn set_exits(&mut self, room: &RoomName, exits: &[&str]) {
        self.exits
            .insert(room.clone(), exits.iter().map(|e| RoomName::from(*e)).collect());
    }

    /// Pin spawn energy of a room instead of deriving it from its spawns and extensions
    pub fn set_spawn_energy(&mut self, room: &RoomName, available: u32, capacity: u32) {
        self.room_mut(room).spawn_energy = Some((available, capacity));
    }

    /// Set the energy of the first structure of `kind` in `room`
    pub fn set_store(&mut self, room: &RoomName, kind: StructureKind, energy: u32) {
        let target = self
            .room_mut(room)
            .structures
            .iter_mut()
            .find(|s| s.kind == kind)
            .and_then(|s| s.store.as_mut());
        if let Some(store) = target {
            store.energy = energy.min(store.capacity);
        }
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    fn with_structure(&mut self, id: &ObjectId, apply: impl FnOnce(&mut Structure)) {
        if let Some(structure) = self
            .rooms
            .values_mut()
            .flat_map(|r| r.structures.iter_mut())
            .find(|s| &s.id == id)
        {
            apply(structure);
        }
    }

    pub fn fill_structure(&mut self, id: &ObjectId) {
        self.with_structure(id, |s| {
            if let Some(store) = s.store.as_mut() {
                store.energy = store.capacity;
            }
        });
    }

    pub fn damage(&mut self, id: &ObjectId, amount: u32) {
        self.with_structure(id, |s| s.hits = s.hits.saturating_sub(amount));
    }

    pub fn set_hits(&mut self, id: &ObjectId, hits: u32) {
        self.with_structure(id, |s| s.hits = hits.min(s.hits_max));
    }

    // === UNIT SETUP ===

    pub fn add_unit(&mut self, name: &str, room: &RoomName, memory: UnitMemory) {
        let center = Position::center_of(room);
        self.add_unit_at(name, room, center.x, center.y, memory);
    }

    pub fn add_unit_at(&mut self, name: &str, room: &RoomName, x: u8, y: u8, memory: UnitMemory) {
        self.insert_unit(name, Position::new(room.clone(), x, y), Some(memory));
    }

    /// A unit whose memory block was lost
    pub fn add_bare_unit(&mut self, name: &str, room: &RoomName) {
        self.insert_unit(name, Position::center_of(room), None);
    }

    fn insert_unit(&mut self, name: &str, pos: Position, memory: Option<UnitMemory>) {
        self.units.insert(
            name.to_string(),
            UnitView {
                name: name.to_string(),
                pos,
                store: Store::empty(CARRY_CAPACITY),
                body: vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move],
                ticks_to_live: Some(UNIT_LIFESPAN),
                spawning: false,
                memory,
            },
        );
    }

    pub fn set_carry(&mut self, name: &str, energy: u32, capacity: u32) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.store = Store::new(energy.min(capacity), capacity);
        }
    }

    pub fn set_spawning(&mut self, name: &str, spawning: bool) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.spawning = spawning;
        }
    }

    pub fn set_ticks_to_live(&mut self, name: &str, ticks: u32) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.ticks_to_live = Some(ticks);
        }
    }

    // === INSPECTION ===

    pub fn unit_view(&self, name: &str) -> Option<UnitView> {
        self.units.get(name).cloned()
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    /// Intents queued by a unit this tick: the action first, then the movement
    pub fn intents_of(&self, name: &str) -> Vec<UnitIntent> {
        self.unit_intents
            .get(name)
            .map(|p| p.action.iter().chain(p.movement.iter()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn structure_intents_of(&self, id: &ObjectId) -> Vec<StructureIntent> {
        self.structure_intents.get(id).cloned().into_iter().collect()
    }

    pub fn travel_requests_of(&self, name: &str) -> Vec<RoomName> {
        self.travel.get(name).cloned().unwrap_or_default()
    }

    pub fn last_said(&self, name: &str) -> Option<String> {
        self.said.get(name).cloned()
    }

    pub fn safe_mode_requested(&self, room: &RoomName) -> bool {
        self.safe_mode.contains(room)
    }

    pub fn structure(&self, id: &ObjectId) -> Option<Structure> {
        self.rooms
            .values()
            .flat_map(|r| r.structures.iter())
            .find(|s| &s.id == id)
            .cloned()
    }

    pub fn site(&self, id: &ObjectId) -> Option<ConstructionSite> {
        self.rooms
            .values()
            .flat_map(|r| r.sites.iter())
            .find(|s| &s.id == id)
            .cloned()
    }

    fn find(&self, id: &ObjectId) -> Option<Target> {
        for room in self.rooms.values() {
            if let Some(s) = room.structures.iter().find(|s| &s.id == id) {
                return Some(Target::Structure(s.clone()));
            }
            if let Some(s) = room.sources.iter().find(|s| &s.id == id) {
                return Some(Target::Source(s.clone()));
            }
            if let Some(m) = room.minerals.iter().find(|m| &m.id == id) {
                return Some(Target::Mineral(m.clone()));
            }
            if let Some(s) = room.sites.iter().find(|s| &s.id == id) {
                return Some(Target::Site(s.clone()));
            }
            if let Some(d) = room.drops.iter().find(|d| &d.id == id) {
                return Some(Target::Drop(d.clone()));
            }
            if let Some(h) = room.hostiles.iter().find(|h| &h.id == id) {
                return Some(Target::Hostile(h.clone()));
            }
            if let Some(c) = room.controller.as_ref().filter(|c| &c.id == id) {
                return Some(Target::Controller(c.clone()));
            }
        }
        None
    }

    fn check_unit_intent(&self, unit: &UnitView, intent: &UnitIntent) -> IntentResult {
        let carried = unit.store.energy;
        let free = unit.store.free();

        let target = match intent {
            UnitIntent::Move(goal) => {
                return if goal.room == unit.pos.room {
                    IntentResult::Ok
                } else {
                    IntentResult::NoPath
                };
            }
            UnitIntent::Drop => {
                return if carried == 0 {
                    IntentResult::NotEnoughEnergy
                } else {
                    IntentResult::Ok
                };
            }
            UnitIntent::TransferToUnit(name) => {
                let Some(other) = self.units.get(name) else {
                    return IntentResult::InvalidTarget;
                };
                if !unit.pos.in_range_to(&other.pos, intent.required_range()) {
                    return IntentResult::NotInRange;
                }
                return if carried == 0 {
                    IntentResult::NotEnoughEnergy
                } else if other.store.free() == 0 {
                    IntentResult::Full
                } else {
                    IntentResult::Ok
                };
            }
            _ => match intent_object(intent).and_then(|id| self.find(id)) {
                Some(target) => target,
                None => return IntentResult::InvalidTarget,
            },
        };

        if !unit.pos.in_range_to(target.pos(), intent.required_range()) {
            return IntentResult::NotInRange;
        }

        match (intent, &target) {
            (UnitIntent::Harvest(_), Target::Source(source)) => {
                if source.energy == 0 {
                    IntentResult::NotEnoughEnergy
                } else {
                    IntentResult::Ok
                }
            }
            (UnitIntent::Transfer(_), Target::Structure(structure)) => match structure.store {
                None => IntentResult::InvalidTarget,
                Some(_) if carried == 0 => IntentResult::NotEnoughEnergy,
                Some(store) if store.free() == 0 => IntentResult::Full,
                Some(_) => IntentResult::Ok,
            },
            (UnitIntent::Withdraw(_), Target::Structure(structure)) => match structure.store {
                None => IntentResult::InvalidTarget,
                Some(store) if store.energy == 0 => IntentResult::NotEnoughEnergy,
                Some(_) if free == 0 => IntentResult::Full,
                Some(_) => IntentResult::Ok,
            },
            (UnitIntent::Pickup(_), Target::Drop(_)) => {
                if free == 0 {
                    IntentResult::Full
                } else {
                    IntentResult::Ok
                }
            }
            (UnitIntent::Build(_), Target::Site(_))
            | (UnitIntent::Repair(_), Target::Structure(_)) => {
                if carried == 0 {
                    IntentResult::NotEnoughEnergy
                } else {
                    IntentResult::Ok
                }
            }
            (UnitIntent::Upgrade(_), Target::Controller(controller)) => {
                if !controller.my {
                    IntentResult::InvalidTarget
                } else if carried == 0 {
                    IntentResult::NotEnoughEnergy
                } else {
                    IntentResult::Ok
                }
            }
            (UnitIntent::Attack(_), Target::Hostile(_)) => IntentResult::Ok,
            (UnitIntent::Claim(_), Target::Controller(controller)) => {
                if controller.my || controller.level > 0 {
                    IntentResult::InvalidTarget
                } else {
                    IntentResult::Ok
                }
            }
            _ => IntentResult::InvalidTarget,
        }
    }

    fn check_structure_intent(&self, structure: &Structure, intent: &StructureIntent) -> IntentResult {
        match intent {
            StructureIntent::TowerAttack(target) | StructureIntent::TowerRepair(target) => {
                if structure.kind != StructureKind::Tower {
                    return IntentResult::InvalidTarget;
                }
                if structure.energy() < TOWER_ENERGY_COST {
                    return IntentResult::NotEnoughEnergy;
                }
                let Some(found) = self.find(target) else {
                    return IntentResult::InvalidTarget;
                };
                if found.pos().room != structure.pos.room {
                    return IntentResult::NotInRange;
                }
                match (intent, found) {
                    (StructureIntent::TowerAttack(_), Target::Hostile(_))
                    | (StructureIntent::TowerRepair(_), Target::Structure(_)) => IntentResult::Ok,
                    _ => IntentResult::InvalidTarget,
                }
            }
            StructureIntent::LinkTransfer(target) => {
                let Some(Target::Structure(receiver)) = self.find(target) else {
                    return IntentResult::InvalidTarget;
                };
                if structure.kind != StructureKind::Link
                    || receiver.kind != StructureKind::Link
                    || receiver.pos.room != structure.pos.room
                {
                    return IntentResult::InvalidTarget;
                }
                if structure.energy() == 0 {
                    IntentResult::NotEnoughEnergy
                } else if receiver.free_capacity() == 0 {
                    IntentResult::Full
                } else {
                    IntentResult::Ok
                }
            }
        }
    }

    // === SIMULATION ===

    /// Spawn the head order of every room queue the room can afford.
    ///
    /// One unit per room per tick. A head order that is too expensive blocks
    /// the rest of that queue. Returns the names of the new units.
    pub fn fulfil_orders(&mut self, orders: &mut OrderBook) -> Vec<String> {
        let rooms: Vec<RoomName> = orders.rooms().cloned().collect();
        let mut spawned = Vec::new();

        for room in rooms {
            let Some(sim_room) = self.rooms.get(&room) else {
                continue;
            };
            let Some(spawn_pos) = sim_room
                .structures
                .iter()
                .find(|s| s.kind == StructureKind::Spawn)
                .map(|s| s.pos.clone())
            else {
                continue;
            };
            let (available, _) = sim_room.spawn_energy();
            let Some(cost) = orders.peek(&room).map(|o| o.cost()) else {
                continue;
            };
            if cost > available {
                continue;
            }
            let Some(order) = orders.pop(&room) else {
                continue;
            };

            self.room_mut(&room).drain_spawn_energy(cost);
            self.next_id += 1;
            let name = format!("{}-{}", order.memory.role.name(), self.next_id);
            let capacity = count_parts(&order.body, BodyPart::Carry) * CARRY_CAPACITY;
            tracing::info!(room = %room, unit = %name, cost, priority = ?order.priority, "unit spawned");
            self.units.insert(
                name.clone(),
                UnitView {
                    name: name.clone(),
                    pos: spawn_pos,
                    store: Store::empty(capacity),
                    body: order.body,
                    ticks_to_live: Some(UNIT_LIFESPAN),
                    spawning: true,
                    memory: Some(order.memory),
                },
            );
            spawned.push(name);
        }
        spawned
    }

    /// Resolve every queued intent, age units and advance the tick
    pub fn end_tick(&mut self) {
        for (name, pending) in std::mem::take(&mut self.unit_intents) {
            if let Some(action) = pending.action {
                self.resolve_action(&name, action);
            }
            if let (Some(UnitIntent::Move(goal)), Some(unit)) =
                (pending.movement, self.units.get_mut(&name))
            {
                unit.pos = unit.pos.step_toward(&goal);
            }
        }

        for (name, destinations) in std::mem::take(&mut self.travel) {
            if let (Some(destination), Some(unit)) = (destinations.last(), self.units.get_mut(&name)) {
                unit.pos = Position::center_of(destination);
            }
        }

        for (id, intent) in std::mem::take(&mut self.structure_intents) {
            self.resolve_structure(&id, intent);
        }

        self.said.clear();
        self.safe_mode.clear();

        for unit in self.units.values_mut() {
            unit.spawning = false;
            if let Some(ticks) = unit.ticks_to_live.as_mut() {
                *ticks = ticks.saturating_sub(1);
            }
        }
        self.units.retain(|name, unit| {
            let alive = unit.ticks_to_live != Some(0);
            if !alive {
                tracing::debug!(unit = %name, "unit expired");
            }
            alive
        });

        for room in self.rooms.values_mut() {
            room.regenerate_spawn();
        }

        self.tick += 1;
        if self.tick % SOURCE_REGEN_TICKS == 0 {
            for source in self.rooms.values_mut().flat_map(|r| r.sources.iter_mut()) {
                source.energy = source.energy_capacity;
            }
        }
    }

    fn take_carried(&mut self, name: &str, amount: u32) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.store.energy = unit.store.energy.saturating_sub(amount);
        }
    }

    fn give_carried(&mut self, name: &str, amount: u32) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.store.energy = (unit.store.energy + amount).min(unit.store.capacity);
        }
    }

    fn resolve_action(&mut self, name: &str, action: UnitIntent) {
        let Some(unit) = self.units.get(name) else {
            return;
        };
        let pos = unit.pos.clone();
        let carried = unit.store.energy;
        let free = unit.store.free();
        let work = unit.parts(BodyPart::Work).max(1);
        let attack = unit.parts(BodyPart::Attack).max(1);

        match action {
            UnitIntent::Harvest(id) => {
                let Some(source) = self
                    .rooms
                    .values_mut()
                    .flat_map(|r| r.sources.iter_mut())
                    .find(|s| s.id == id)
                else {
                    return;
                };
                let mined = (HARVEST_POWER * work).min(source.energy);
                source.energy -= mined;
                let kept = mined.min(free);
                self.give_carried(name, kept);
                if mined > kept {
                    let spill_id = self.fresh_id("drop");
                    self.room_mut(&pos.room).spill(spill_id, &pos, mined - kept);
                }
            }
            UnitIntent::Transfer(id) => {
                let mut moved = 0;
                self.with_structure(&id, |s| {
                    if let Some(store) = s.store.as_mut() {
                        moved = carried.min(store.free());
                        store.energy += moved;
                    }
                });
                self.take_carried(name, moved);
            }
            UnitIntent::TransferToUnit(other) => {
                let Some(receiver) = self.units.get_mut(&other) else {
                    return;
                };
                let moved = carried.min(receiver.store.free());
                receiver.store.energy += moved;
                self.take_carried(name, moved);
            }
            UnitIntent::Withdraw(id) => {
                let mut moved = 0;
                self.with_structure(&id, |s| {
                    if let Some(store) = s.store.as_mut() {
                        moved = free.min(store.energy);
                        store.energy -= moved;
                    }
                });
                self.give_carried(name, moved);
            }
            UnitIntent::Pickup(id) => {
                let room = self.room_mut(&pos.room);
                let Some(pile) = room.drops.iter_mut().find(|d| d.id == id) else {
                    return;
                };
                let moved = free.min(pile.amount);
                pile.amount -= moved;
                room.drops.retain(|d| d.amount > 0);
                self.give_carried(name, moved);
            }
            UnitIntent::Drop => {
                let spill_id = self.fresh_id("drop");
                self.room_mut(&pos.room).spill(spill_id, &pos, carried);
                self.take_carried(name, carried);
            }
            UnitIntent::Build(id) => {
                let spent = (BUILD_POWER * work).min(carried);
                let room = self.room_mut(&pos.room);
                let Some(site) = room.sites.iter_mut().find(|s| s.id == id) else {
                    return;
                };
                site.progress += spent;
                let finished = (site.progress >= site.progress_total).then(|| site.clone());
                self.take_carried(name, spent);
                if let Some(site) = finished {
                    self.complete_site(site);
                }
            }
            UnitIntent::Repair(id) => {
                let spent = work.min(carried);
                self.with_structure(&id, |s| {
                    s.hits = (s.hits + REPAIR_POWER * spent).min(s.hits_max);
                });
                self.take_carried(name, spent);
            }
            UnitIntent::Upgrade(_) => {
                let spent = work.min(carried);
                self.take_carried(name, spent);
                let room = self.room_mut(&pos.room);
                room.upgrade_progress += spent;
                let Some(controller) = room.controller.as_mut().filter(|c| c.my && c.level > 0) else {
                    return;
                };
                let Some(&needed) = LEVEL_PROGRESS.get(usize::from(controller.level) - 1) else {
                    return;
                };
                if room.upgrade_progress >= needed {
                    room.upgrade_progress -= needed;
                    controller.level += 1;
                    tracing::info!(room = %pos.room, level = controller.level, "controller level up");
                }
            }
            UnitIntent::Attack(id) => {
                let room = self.room_mut(&pos.room);
                if let Some(hostile) = room.hostiles.iter_mut().find(|h| h.id == id) {
                    hostile.hits = hostile.hits.saturating_sub(ATTACK_POWER * attack);
                }
                room.hostiles.retain(|h| h.hits > 0);
            }
            UnitIntent::Claim(_) => {
                if let Some(controller) = self.room_mut(&pos.room).controller.as_mut() {
                    controller.my = true;
                    controller.level = 1;
                    tracing::info!(room = %pos.room, "room claimed");
                }
            }
            UnitIntent::Move(_) => {}
        }
    }

    fn complete_site(&mut self, site: ConstructionSite) {
        let room = site.pos.room.clone();
        self.room_mut(&room).sites.retain(|s| s.id != site.id);
        let id = self.add_structure(&room, site.kind, site.pos.x, site.pos.y);
        tracing::debug!(room = %room, structure = %id, kind = ?site.kind, "construction finished");
    }

    fn resolve_structure(&mut self, id: &ObjectId, intent: StructureIntent) {
        match intent {
            StructureIntent::TowerAttack(target) => {
                self.with_structure(id, |tower| {
                    if let Some(store) = tower.store.as_mut() {
                        store.energy = store.energy.saturating_sub(TOWER_ENERGY_COST);
                    }
                });
                for room in self.rooms.values_mut() {
                    if let Some(hostile) = room.hostiles.iter_mut().find(|h| h.id == target) {
                        hostile.hits = hostile.hits.saturating_sub(TOWER_ATTACK_POWER);
                    }
                    room.hostiles.retain(|h| h.hits > 0);
                }
            }
            StructureIntent::TowerRepair(target) => {
                self.with_structure(id, |tower| {
                    if let Some(store) = tower.store.as_mut() {
                        store.energy = store.energy.saturating_sub(TOWER_ENERGY_COST);
                    }
                });
                self.with_structure(&target, |s| {
                    s.hits = (s.hits + TOWER_REPAIR_POWER).min(s.hits_max);
                });
            }
            StructureIntent::LinkTransfer(target) => {
                let Some(free) = self.structure(&target).map(|r| r.free_capacity()) else {
                    return;
                };
                let mut moved = 0;
                self.with_structure(id, |link| {
                    if let Some(store) = link.store.as_mut() {
                        moved = store.energy.min(free);
                        store.energy -= moved;
                    }
                });
                self.with_structure(&target, |receiver| {
                    if let Some(store) = receiver.store.as_mut() {
                        store.energy += moved;
                    }
                });
            }
        }
    }
}

impl Host for SimHost {
    fn tick(&self) -> Tick {
        self.tick
    }

    fn visible_rooms(&self) -> Vec<RoomName> {
        self.rooms.keys().cloned().collect()
    }

    fn room(&self, name: &RoomName) -> Option<RoomSnapshot> {
        let room = self.rooms.get(name)?;
        let (energy_available, energy_capacity_available) = room.spawn_energy();
        Some(RoomSnapshot {
            name: name.clone(),
            controller: room.controller.clone(),
            energy_available,
            energy_capacity_available,
        })
    }

    fn structures(&self, room: &RoomName) -> Vec<Structure> {
        self.rooms.get(room).map(|r| r.structures.clone()).unwrap_or_default()
    }

    fn sources(&self, room: &RoomName) -> Vec<Source> {
        self.rooms.get(room).map(|r| r.sources.clone()).unwrap_or_default()
    }

    fn minerals(&self, room: &RoomName) -> Vec<Mineral> {
        self.rooms.get(room).map(|r| r.minerals.clone()).unwrap_or_default()
    }

    fn construction_sites(&self, room: &RoomName) -> Vec<ConstructionSite> {
        self.rooms.get(room).map(|r| r.sites.clone()).unwrap_or_default()
    }

    fn dropped_energy(&self, room: &RoomName) -> Vec<DroppedEnergy> {
        self.rooms.get(room).map(|r| r.drops.clone()).unwrap_or_default()
    }

    fn hostiles(&self, room: &RoomName) -> Vec<Hostile> {
        self.rooms.get(room).map(|r| r.hostiles.clone()).unwrap_or_default()
    }

    fn exits(&self, room: &RoomName) -> Vec<RoomName> {
        self.exits.get(room).cloned().unwrap_or_default()
    }

    fn units(&self) -> Vec<UnitView> {
        self.units.values().cloned().collect()
    }

    fn set_unit_memory(&mut self, unit: &str, memory: UnitMemory) {
        if let Some(view) = self.units.get_mut(unit) {
            view.memory = Some(memory);
        }
    }

    fn issue(&mut self, unit: &str, intent: UnitIntent) -> IntentResult {
        let Some(view) = self.units.get(unit) else {
            return IntentResult::InvalidTarget;
        };
        if view.spawning {
            return IntentResult::Busy;
        }
        let result = self.check_unit_intent(view, &intent);
        if result.is_ok() {
            let pending = self.unit_intents.entry(unit.to_string()).or_default();
            match intent {
                UnitIntent::Move(_) => pending.movement = Some(intent),
                _ => pending.action = Some(intent),
            }
        }
        result
    }

    fn issue_structure(&mut self, structure: &ObjectId, intent: StructureIntent) -> IntentResult {
        let Some(found) = self.structure(structure) else {
            return IntentResult::InvalidTarget;
        };
        let result = self.check_structure_intent(&found, &intent);
        if result.is_ok() {
            self.structure_intents.insert(structure.clone(), intent);
        }
        result
    }

    fn travel_to(&mut self, unit: &str, room: &RoomName) -> bool {
        let Some(view) = self.units.get(unit) else {
            return false;
        };
        if &view.pos.room == room {
            return false;
        }
        self.travel.entry(unit.to_string()).or_default().push(room.clone());
        true
    }

    fn activate_safe_mode(&mut self, room: &RoomName) -> IntentResult {
        match self.room(room) {
            Some(snapshot) if snapshot.is_mine() => {
                self.safe_mode.insert(room.clone());
                IntentResult::Ok
            }
            _ => IntentResult::InvalidTarget,
        }
    }

    fn say(&mut self, unit: &str, message: &str) {
        self.said.insert(unit.to_string(), message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawning::{Order, Priority};
    use crate::units::memory::Role;

    fn home() -> (SimHost, RoomName) {
        let mut host = SimHost::new();
        let room = RoomName::from("W1N1");
        host.add_room(&room, 3);
        (host, room)
    }

    #[test]
    fn test_out_of_range_intent_is_not_recorded() {
        let (mut host, room) = home();
        let source = host.add_source(&room, "src", 10, 10);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Harvester));

        assert_eq!(host.issue("u", UnitIntent::Harvest(source.clone())), IntentResult::NotInRange);
        assert!(host.intents_of("u").is_empty());

        assert_eq!(
            host.issue("u", UnitIntent::Move(Position::new("W1N1", 10, 10))),
            IntentResult::Ok
        );
        assert_eq!(host.intents_of("u").len(), 1);
    }

    #[test]
    fn test_later_action_replaces_earlier() {
        let (mut host, room) = home();
        let a = host.add_drop(&room, 20, 21, 10);
        let b = host.add_drop(&room, 21, 20, 10);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Hauler));

        host.issue("u", UnitIntent::Pickup(a));
        host.issue("u", UnitIntent::Move(Position::new("W1N1", 30, 30)));
        host.issue("u", UnitIntent::Pickup(b.clone()));
        assert_eq!(
            host.intents_of("u"),
            vec![UnitIntent::Pickup(b), UnitIntent::Move(Position::new("W1N1", 30, 30))]
        );
    }

    #[test]
    fn test_reads_stay_at_tick_start_until_end_tick() {
        let (mut host, room) = home();
        let container = host.add_container(&room, 21, 20, 500);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Hauler));

        assert_eq!(host.issue("u", UnitIntent::Withdraw(container.clone())), IntentResult::Ok);
        assert_eq!(host.structures(&room)[0].energy(), 500);

        host.end_tick();
        assert_eq!(host.structure(&container).unwrap().energy(), 450);
        assert_eq!(host.unit_view("u").unwrap().store.energy, 50);
        assert_eq!(host.tick(), 1);
        assert!(host.intents_of("u").is_empty());
    }

    #[test]
    fn test_harvest_overflow_spills_on_the_ground() {
        let (mut host, room) = home();
        let source = host.add_source(&room, "src", 10, 10);
        host.add_unit_at("u", &room, 10, 11, UnitMemory::new(Role::Harvester));
        host.set_carry("u", 0, 0);

        assert_eq!(host.issue("u", UnitIntent::Harvest(source)), IntentResult::Ok);
        host.end_tick();
        let drops = host.dropped_energy(&room);
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].amount, HARVEST_POWER);
    }

    #[test]
    fn test_finished_site_becomes_structure() {
        let (mut host, room) = home();
        let site = host.add_site(&room, StructureKind::Road, 21, 20);
        host.add_unit_at("u", &room, 20, 20, UnitMemory::new(Role::Builder));
        host.set_carry("u", 50, 50);

        let mut ticks = 0;
        while host.site(&site).is_some() && ticks < 100 {
            host.set_carry("u", 50, 50);
            assert_eq!(host.issue("u", UnitIntent::Build(site.clone())), IntentResult::Ok);
            host.end_tick();
            ticks += 1;
        }
        assert_eq!(ticks, 60);
        assert!(host.structures(&room).iter().any(|s| s.kind == StructureKind::Road));
    }

    #[test]
    fn test_spawn_head_order_when_affordable() {
        let (mut host, room) = home();
        let spawn = host.add_structure(&room, StructureKind::Spawn, 25, 25);
        let mut orders = OrderBook::new();
        orders.push(
            &room,
            Order::new(vec![BodyPart::Move], Priority::Low, UnitMemory::new(Role::Scout)),
        );
        orders.push(
            &room,
            Order::new(
                vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move],
                Priority::Critical,
                UnitMemory::new(Role::Harvester),
            ),
        );

        // 200 energy for the critical order; not there yet, and the cheap order waits too
        host.set_spawn_energy(&room, 100, 300);
        assert!(host.fulfil_orders(&mut orders).is_empty());
        assert_eq!(orders.len(), 2);

        host.set_spawn_energy(&room, 300, 300);
        let spawned = host.fulfil_orders(&mut orders);
        assert_eq!(spawned.len(), 1);
        let unit = host.unit_view(&spawned[0]).unwrap();
        assert_eq!(unit.memory.unwrap().role, Role::Harvester);
        assert_eq!(unit.store.capacity, CARRY_CAPACITY);
        assert!(unit.spawning);
        assert_eq!(unit.pos, host.structure(&spawn).unwrap().pos);
        assert_eq!(host.room(&room).unwrap().energy_available, 100);
    }

    #[test]
    fn test_spawn_energy_derives_from_feeders() {
        let (mut host, room) = home();
        let spawn = host.add_structure(&room, StructureKind::Spawn, 25, 25);
        host.add_structure(&room, StructureKind::Extension, 26, 25);
        host.fill_structure(&spawn);

        let snapshot = host.room(&room).unwrap();
        assert_eq!(snapshot.energy_available, 300);
        assert_eq!(snapshot.energy_capacity_available, 350);
        assert!(!snapshot.spawn_energy_full());
    }

    #[test]
    fn test_spawn_trickles_energy_until_a_spawns_worth() {
        let (mut host, room) = home();
        let spawn = host.add_structure(&room, StructureKind::Spawn, 25, 25);
        host.end_tick();
        host.end_tick();
        assert_eq!(host.structure(&spawn).unwrap().energy(), 2);

        host.fill_structure(&spawn);
        host.end_tick();
        assert_eq!(host.structure(&spawn).unwrap().energy(), 300);
    }

    #[test]
    fn test_units_expire() {
        let (mut host, room) = home();
        host.add_unit("old", &room, UnitMemory::new(Role::Scout));
        host.set_ticks_to_live("old", 1);
        host.end_tick();
        assert!(host.unit_view("old").is_none());
    }

    #[test]
    fn test_travel_moves_unit_into_destination() {
        let (mut host, room) = home();
        let remote = RoomName::from("W2N1");
        host.add_unit("s", &room, UnitMemory::new(Role::Scout));

        assert!(host.travel_to("s", &remote));
        host.end_tick();
        assert_eq!(host.unit_view("s").unwrap().pos.room, remote);
        assert!(!host.travel_to("s", &remote));
    }
}
