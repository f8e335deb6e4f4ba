//! Per-tick query cache
//!
//! A `TickContext` is built at the start of a tick and dropped at its end.
//! Every room query goes through it and is computed at most once per tick;
//! nothing here survives into the next tick, so stale world state can never
//! leak across the tick boundary.

use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashMap;

use crate::colony::classify::{classify, RoomType};
use crate::core::config::OverseerConfig;
use crate::core::types::{ObjectId, RoomName, Tick};
use crate::host::{
    ConstructionSite, DroppedEnergy, Host, Hostile, Mineral, RoomSnapshot, Source, Structure,
    StructureKind, UnitView,
};
use crate::units::memory::{Role, TargetKey};

/// Resource node a tank is staged next to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TankNode {
    Source(ObjectId),
    Mineral(ObjectId),
}

/// A container or link positioned next to a resource node
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub structure: Structure,
    pub node: TankNode,
}

impl Tank {
    pub fn source_id(&self) -> Option<&ObjectId> {
        match &self.node {
            TankNode::Source(id) => Some(id),
            TankNode::Mineral(_) => None,
        }
    }

    pub fn is_link(&self) -> bool {
        self.structure.kind == StructureKind::Link
    }
}

#[derive(Default)]
struct RoomFacts {
    snapshot: Option<Option<Rc<RoomSnapshot>>>,
    structures: Option<Rc<[Structure]>>,
    sources: Option<Rc<[Source]>>,
    minerals: Option<Rc<[Mineral]>>,
    sites: Option<Rc<[ConstructionSite]>>,
    drops: Option<Rc<[DroppedEnergy]>>,
    hostiles: Option<Rc<[Hostile]>>,
    tanks: Option<Rc<[Tank]>>,
    remote_rooms: Option<Rc<[RoomName]>>,
    remote_tanks: Option<Rc<[Tank]>>,
    storage_link: Option<Option<Structure>>,
}

pub struct TickContext<'a> {
    host: &'a mut dyn Host,
    config: &'a OverseerConfig,
    tick: Tick,
    rooms: AHashMap<RoomName, RoomFacts>,
    units: Option<Rc<[UnitView]>>,
    room_types: Option<Rc<BTreeMap<RoomName, RoomType>>>,
}

impl<'a> TickContext<'a> {
    pub fn new(host: &'a mut dyn Host, config: &'a OverseerConfig) -> Self {
        let tick = host.tick();
        Self {
            host,
            config,
            tick,
            rooms: AHashMap::new(),
            units: None,
            room_types: None,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn config(&self) -> &OverseerConfig {
        self.config
    }

    pub fn host(&self) -> &dyn Host {
        &*self.host
    }

    /// Intent submission goes straight to the host; reads stay cached
    pub fn host_mut(&mut self) -> &mut dyn Host {
        &mut *self.host
    }

    fn facts(&mut self, room: &RoomName) -> &mut RoomFacts {
        self.rooms.entry(room.clone()).or_default()
    }

    // === RAW HOST QUERIES (memoized) ===

    pub fn room(&mut self, room: &RoomName) -> Option<Rc<RoomSnapshot>> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .snapshot
            .get_or_insert_with(|| host.room(room).map(Rc::new))
            .clone()
    }

    pub fn structures(&mut self, room: &RoomName) -> Rc<[Structure]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .structures
            .get_or_insert_with(|| host.structures(room).into())
            .clone()
    }

    pub fn sources(&mut self, room: &RoomName) -> Rc<[Source]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .sources
            .get_or_insert_with(|| host.sources(room).into())
            .clone()
    }

    pub fn minerals(&mut self, room: &RoomName) -> Rc<[Mineral]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .minerals
            .get_or_insert_with(|| host.minerals(room).into())
            .clone()
    }

    pub fn construction_sites(&mut self, room: &RoomName) -> Rc<[ConstructionSite]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .sites
            .get_or_insert_with(|| host.construction_sites(room).into())
            .clone()
    }

    pub fn dropped_energy(&mut self, room: &RoomName) -> Rc<[DroppedEnergy]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .drops
            .get_or_insert_with(|| host.dropped_energy(room).into())
            .clone()
    }

    pub fn hostiles(&mut self, room: &RoomName) -> Rc<[Hostile]> {
        let host = &*self.host;
        let facts = self.rooms.entry(room.clone()).or_default();
        facts
            .hostiles
            .get_or_insert_with(|| host.hostiles(room).into())
            .clone()
    }

    /// All of our units, with memory, as of tick start
    pub fn units(&mut self) -> Rc<[UnitView]> {
        let host = &*self.host;
        self.units
            .get_or_insert_with(|| host.units().into())
            .clone()
    }

    // === DERIVED ROOM FACTS ===

    pub fn structures_of(&mut self, room: &RoomName, kind: StructureKind) -> Vec<Structure> {
        self.structures(room)
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    pub fn containers(&mut self, room: &RoomName) -> Vec<Structure> {
        self.structures_of(room, StructureKind::Container)
    }

    pub fn storage(&mut self, room: &RoomName) -> Option<Structure> {
        self.structures_of(room, StructureKind::Storage).into_iter().next()
    }

    pub fn spawn(&mut self, room: &RoomName) -> Option<Structure> {
        self.structures_of(room, StructureKind::Spawn).into_iter().next()
    }

    pub fn has_extractor(&mut self, room: &RoomName) -> bool {
        self.structures(room)
            .iter()
            .any(|s| s.kind == StructureKind::Extractor)
    }

    /// Containers and links next to sources, plus containers next to minerals
    /// once an extractor is built
    pub fn tanks(&mut self, room: &RoomName) -> Rc<[Tank]> {
        if let Some(cached) = self.facts(room).tanks.clone() {
            return cached;
        }

        let range = self.config.tank_range;
        let structures = self.structures(room);
        let sources = self.sources(room);
        let mut tanks: Vec<Tank> = Vec::new();

        for source in sources.iter() {
            for structure in structures.iter() {
                let staging = matches!(structure.kind, StructureKind::Container | StructureKind::Link);
                if !staging || !structure.pos.in_range_to(&source.pos, range) {
                    continue;
                }
                if tanks.iter().any(|t| t.structure.id == structure.id) {
                    continue;
                }
                tanks.push(Tank {
                    structure: structure.clone(),
                    node: TankNode::Source(source.id.clone()),
                });
            }
        }

        if self.has_extractor(room) {
            let minerals = self.minerals(room);
            for mineral in minerals.iter() {
                for structure in structures.iter() {
                    if structure.kind != StructureKind::Container
                        || !structure.pos.in_range_to(&mineral.pos, range)
                        || tanks.iter().any(|t| t.structure.id == structure.id)
                    {
                        continue;
                    }
                    tanks.push(Tank {
                        structure: structure.clone(),
                        node: TankNode::Mineral(mineral.id.clone()),
                    });
                }
            }
        }

        let tanks: Rc<[Tank]> = tanks.into();
        self.facts(room).tanks = Some(tanks.clone());
        tanks
    }

    pub fn source_tanks(&mut self, room: &RoomName, source: &ObjectId) -> Vec<Tank> {
        self.tanks(room)
            .iter()
            .filter(|t| t.source_id() == Some(source))
            .cloned()
            .collect()
    }

    /// Containers that are not staged next to a resource node
    pub fn non_tank_containers(&mut self, room: &RoomName) -> Vec<Structure> {
        let tanks = self.tanks(room);
        self.containers(room)
            .into_iter()
            .filter(|c| !tanks.iter().any(|t| t.structure.id == c.id))
            .collect()
    }

    /// The link near storage that receives relayed source energy
    pub fn storage_link(&mut self, room: &RoomName) -> Option<Structure> {
        if let Some(cached) = self.facts(room).storage_link.clone() {
            return cached;
        }

        let range = self.config.storage_link_range;
        let storage = self.storage(room);
        let tanks = self.tanks(room);
        let link = storage.and_then(|storage| {
            self.structures_of(room, StructureKind::Link)
                .into_iter()
                .filter(|l| !tanks.iter().any(|t| t.structure.id == l.id))
                .find(|l| l.pos.in_range_to(&storage.pos, range))
        });

        self.facts(room).storage_link = Some(link.clone());
        link
    }

    /// Damaged structures workers should repair (walls and ramparts excluded)
    pub fn repair_targets(&mut self, room: &RoomName) -> Vec<Structure> {
        self.structures(room)
            .iter()
            .filter(|s| s.is_damaged() && !s.kind.is_fortification())
            .cloned()
            .collect()
    }

    /// Sum of missing hit points over [`Self::repair_targets`]
    pub fn repair_debt(&mut self, room: &RoomName) -> u64 {
        self.repair_targets(room).iter().map(|s| s.repair_debt()).sum()
    }

    /// Neighbouring rooms worth mining or securing from `room`
    pub fn remote_rooms(&mut self, room: &RoomName) -> Rc<[RoomName]> {
        if let Some(cached) = self.facts(room).remote_rooms.clone() {
            return cached;
        }

        let mut remotes: Vec<RoomName> = self
            .host
            .exits(room)
            .into_iter()
            .filter(|r| !self.config.excluded_remote_rooms.contains(r))
            .collect();
        if let Some(extra) = self.config.extra_remote_rooms.get(room) {
            for name in extra {
                if !remotes.contains(name) {
                    remotes.push(name.clone());
                }
            }
        }
        remotes.retain(|r| r != room);

        let remotes: Rc<[RoomName]> = remotes.into();
        self.facts(room).remote_rooms = Some(remotes.clone());
        remotes
    }

    /// Source tanks in visible remote rooms of `room`
    pub fn remote_tanks(&mut self, room: &RoomName) -> Rc<[Tank]> {
        if let Some(cached) = self.facts(room).remote_tanks.clone() {
            return cached;
        }

        let mut tanks = Vec::new();
        for remote in self.remote_rooms(room).iter() {
            if self.room(remote).is_none() {
                continue;
            }
            tanks.extend(
                self.tanks(remote)
                    .iter()
                    .filter(|t| t.source_id().is_some())
                    .cloned(),
            );
        }

        let tanks: Rc<[Tank]> = tanks.into();
        self.facts(room).remote_tanks = Some(tanks.clone());
        tanks
    }

    // === COLONY-WIDE FACTS ===

    /// Classification of every owned visible room, ordered by name
    pub fn room_types(&mut self) -> Rc<BTreeMap<RoomName, RoomType>> {
        if let Some(cached) = self.room_types.clone() {
            return cached;
        }

        let mut types = BTreeMap::new();
        for name in self.host.visible_rooms() {
            let Some(snapshot) = self.room(&name) else {
                continue;
            };
            let has_spawn = self.spawn(&name).is_some();
            let has_spawn_site = self
                .construction_sites(&name)
                .iter()
                .any(|s| s.kind == StructureKind::Spawn);
            if let Some(room_type) = classify(&snapshot, has_spawn, has_spawn_site) {
                types.insert(name, room_type);
            }
        }

        let types = Rc::new(types);
        self.room_types = Some(types.clone());
        types
    }

    pub fn room_type(&mut self, room: &RoomName) -> Option<RoomType> {
        self.room_types().get(room).copied()
    }

    pub fn rooms_of_type(&mut self, wanted: &[RoomType]) -> Vec<RoomName> {
        self.room_types()
            .iter()
            .filter(|(_, t)| wanted.contains(t))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn normal_rooms(&mut self) -> Vec<RoomName> {
        self.rooms_of_type(&[RoomType::Normal])
    }

    /// Rooms with their own spawn: fully developed first, then in development
    pub fn spawning_rooms(&mut self) -> Vec<RoomName> {
        let mut rooms = self.normal_rooms();
        rooms.extend(self.rooms_of_type(&[RoomType::InDev]));
        rooms
    }

    /// Rooms that are ours but not yet fully developed
    pub fn developing_rooms(&mut self) -> Vec<RoomName> {
        self.room_types()
            .iter()
            .filter(|(_, t)| t.is_developing())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Live units matching a (role, target, homeroom) key. `None` matches anything.
    pub fn count_units(
        &mut self,
        role: Role,
        target: Option<&TargetKey>,
        homeroom: Option<&RoomName>,
    ) -> u32 {
        self.units()
            .iter()
            .filter(|u| {
                u.memory
                    .as_ref()
                    .is_some_and(|m| m.matches(role, target, homeroom))
            })
            .count() as u32
    }
}
