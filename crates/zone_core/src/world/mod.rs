mod placement;
mod systems;
mod types;


use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::config::WorldConfig;
use crate::content::GameData;
use crate::entity::{
    Character, CharacterKind, CombatEntity, Direction, EntityHandle, EntityId,
    EntityIdAllocator, EntityStore, Monster, Player, Warp,
};
use crate::geom::{Area, Position};
use crate::map::{Map, MapId, WalkData};
use crate::messaging::{NetworkConnection, OutboundBuffer, OutboundPacket};

pub use placement::{place, place_player};
pub use systems::{SystemId, SYSTEM_ORDER};
pub use types::{MapTickSummary, RemovedEntity, TickReport, WorldError};

use systems::{SystemContext, SystemsPipeline};

pub const PLAYER_MOVE_SPEED: f32 = 0.15;
pub const PLAYER_CLASS_COUNT: i32 = 6;
pub const PLAYER_HEAD_COUNT: u8 = 28;

/// The authoritative zone simulation: every live map, every entity on them and
/// the per-tick systems pass.
///
/// Entities are addressed by [`EntityHandle`] inside the process and by the dense
/// [`EntityId`] on the wire. The id allocator is the single reverse lookup between
/// the two; an id is registered for exactly as long as its entity is alive.
#[derive(Debug)]
pub struct World {
    maps: Vec<Map>,
    map_ids_by_code: HashMap<String, MapId>,
    store: EntityStore,
    ids: EntityIdAllocator,
    systems: SystemsPipeline,
    outbound: OutboundBuffer,
    rng: SmallRng,
    rng_seed: u64,
    elapsed_seconds: f64,
    data: GameData,
    config: WorldConfig,
}

impl World {
    /// Builds every map from `data` and populates it from the spawn and connector
    /// tables. A map whose walk grid is invalid is logged and skipped.
    pub fn new(data: GameData, config: WorldConfig) -> Self {
        let rng_seed = config.rng_seed.unwrap_or_else(rand::random);
        let capacity = config.initial_store_capacity(data.maps().len());
        let mut world = Self {
            maps: Vec::with_capacity(data.maps().len()),
            map_ids_by_code: HashMap::with_capacity(data.maps().len()),
            store: EntityStore::with_capacity(capacity),
            ids: EntityIdAllocator::new(config.max_entity_id),
            systems: SystemsPipeline::default(),
            outbound: OutboundBuffer::default(),
            rng: SmallRng::seed_from_u64(rng_seed),
            rng_seed,
            elapsed_seconds: 0.0,
            data: GameData::default(),
            config,
        };

        let mut spawned = 0usize;
        for definition in data.maps() {
            let walk_data = match WalkData::from_rows(&definition.walk.rows) {
                Ok(walk_data) => walk_data,
                Err(error) => {
                    error!(
                        map = definition.code.as_str(),
                        name = definition.name.as_str(),
                        error = %error,
                        "map_load_failed"
                    );
                    continue;
                }
            };
            let map_id = MapId(world.maps.len());
            world
                .maps
                .push(Map::new(map_id, &definition.code, &definition.name, walk_data));
            world.map_ids_by_code.insert(definition.code.clone(), map_id);
        }

        world.data = data;
        for index in 0..world.maps.len() {
            spawned += world.populate_map(MapId(index));
        }

        info!(
            map_count = world.maps.len(),
            entity_count = spawned,
            rng_seed,
            "world_started"
        );
        world
    }

    fn populate_map(&mut self, map_id: MapId) -> usize {
        let Some(map_code) = self.maps.get(map_id.0).map(|map| map.code().to_string()) else {
            return 0;
        };

        let spawns = self.data.spawns_for_map(&map_code).to_vec();
        let mut monsters = 0usize;
        for spawn in &spawns {
            let Some(class_id) = self.data.monster_id_for_code(&spawn.class) else {
                warn!(
                    map = map_code.as_str(),
                    class = spawn.class.as_str(),
                    "spawn_class_unknown"
                );
                continue;
            };
            for _ in 0..spawn.count {
                let created = self.create_monster(
                    map_id,
                    class_id,
                    spawn.x,
                    spawn.y,
                    spawn.width,
                    spawn.height,
                );
                match created {
                    Ok(handle) => {
                        self.attach_to_map(handle, map_id);
                        monsters += 1;
                    }
                    Err(error) => {
                        warn!(map = map_code.as_str(), class_id, error = %error, "spawn_failed");
                    }
                }
            }
        }

        let connectors = self.data.connectors_for_map(&map_code).to_vec();
        let connector_class_id = self.config.connector_class_id;
        for connector in connectors {
            let source = connector.src_area;
            match self.create_monster(
                map_id,
                connector_class_id,
                source.mid_x(),
                source.mid_y(),
                0,
                0,
            ) {
                Ok(handle) => {
                    self.store.insert(
                        handle,
                        Warp {
                            destination_map: connector.dst_map,
                            destination_area: connector.dst_area,
                        },
                    );
                    self.attach_to_map(handle, map_id);
                }
                Err(error) => {
                    warn!(map = map_code.as_str(), error = %error, "connector_spawn_failed");
                }
            }
        }

        monsters
    }

    /// Advances the world clock by `dt_seconds` and runs exactly one tick.
    pub fn update(&mut self, dt_seconds: f32) -> TickReport {
        self.elapsed_seconds += f64::from(dt_seconds);

        let mut removals = Vec::new();
        let mut monster_count = 0usize;
        let mut context = SystemContext {
            dt_seconds,
            elapsed_seconds: self.elapsed_seconds,
            keep_alive_timeout_seconds: self.config.keep_alive_timeout_seconds,
            store: &mut self.store,
            removals: &mut removals,
            monster_count: &mut monster_count,
        };
        self.systems.run_once_per_tick(&mut context);

        let mut removed = Vec::with_capacity(removals.len());
        for handle in removals {
            if let Some(id) = self.remove_entity(handle).and_then(|entity| entity.id) {
                removed.push(id);
            }
        }

        let mut maps = Vec::with_capacity(self.maps.len());
        for map in &mut self.maps {
            map.update(&self.store);
            maps.push(MapTickSummary {
                map: map.id(),
                tick: map.tick(),
                entity_count: map.entity_count(),
                player_count: map.player_count(),
            });
        }

        let outbound_leftover = self.outbound.has_recipients();
        if outbound_leftover {
            warn!("outbound_recipients_left_after_tick");
            self.outbound.clear_recipients();
        }

        TickReport {
            elapsed_seconds: self.elapsed_seconds,
            systems_order: self.systems.last_tick_order().to_vec(),
            monster_count,
            removed,
            maps,
            outbound_leftover,
        }
    }

    /// Creates a monster of `class_id` on `map_id`. The entity is not added to the
    /// map; call [`World::add_entity_to_map`] once it is ready to be seen.
    pub fn create_monster(
        &mut self,
        map_id: MapId,
        class_id: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<EntityHandle, WorldError> {
        let (move_speed, max_hp) = self
            .data
            .monster_by_id(class_id)
            .map(|template| (template.move_speed, template.max_hp))
            .ok_or(WorldError::UnknownMonsterClass { class_id })?;
        let map = self
            .maps
            .get(map_id.0)
            .ok_or(WorldError::UnknownMapId { map: map_id })?;

        let position = place(map, Position::new(x, y), width, height, &mut self.rng);
        let facing = Direction::random(&mut self.rng);
        let (handle, id) = self.spawn_with_id()?;

        self.store.insert(
            handle,
            Character {
                id,
                class_id,
                position,
                move_speed,
                kind: CharacterKind::Monster,
                facing,
                is_active: true,
                ..Character::default()
            },
        );
        self.store.insert(
            handle,
            CombatEntity {
                hp: max_hp,
                max_hp,
                target: None,
            },
        );
        self.store.insert(handle, Monster);

        debug!(entity = %handle, id = %id, class_id, position = %position, "monster_created");
        Ok(handle)
    }

    /// Creates an inactive player on `map_code` and adds it to that map. A zero
    /// `spawn_area` means anywhere on the map.
    pub fn create_player(
        &mut self,
        connection: Arc<NetworkConnection>,
        map_code: &str,
        spawn_area: Area,
    ) -> Result<EntityHandle, WorldError> {
        let map_id = self.map_id(map_code).ok_or_else(|| WorldError::UnknownMap {
            map_code: map_code.to_string(),
        })?;
        let map = &self.maps[map_id.0];
        let position = place_player(
            map,
            spawn_area,
            &mut self.rng,
            self.config.player_spawn_retry_limit,
        )?;

        let class_id = self.rng.gen_range(0..PLAYER_CLASS_COUNT);
        let facing = Direction::random(&mut self.rng);
        let is_male = self.rng.gen_bool(0.5);
        let head_id = self.rng.gen_range(0..PLAYER_HEAD_COUNT);
        let (handle, id) = self.spawn_with_id()?;

        self.store.insert(
            handle,
            Character {
                id,
                class_id,
                position,
                move_speed: PLAYER_MOVE_SPEED,
                kind: CharacterKind::Player,
                facing,
                is_active: false,
                ..Character::default()
            },
        );
        self.store.insert(handle, CombatEntity::default());
        self.store.insert(
            handle,
            Player {
                connection,
                is_male,
                head_id,
            },
        );
        self.attach_to_map(handle, map_id);

        info!(
            entity = %handle,
            id = %id,
            map = map_code,
            position = %position,
            "player_created"
        );
        Ok(handle)
    }

    /// Destroys an entity: releases its id, takes it off its map and drops every
    /// facet, including a player's connection reference. A stale handle is
    /// ignored and yields `None`.
    pub fn remove_entity(&mut self, handle: EntityHandle) -> Option<RemovedEntity> {
        if !self.store.is_alive(handle) {
            warn!(entity = %handle, "remove_stale_entity");
            return None;
        }

        if let Some(character) = self.store.get::<Character>(handle) {
            self.ids.release(character.id);
            if let Some(map) = character.map.and_then(|map_id| self.maps.get_mut(map_id.0)) {
                map.remove_entity(handle);
            }
        }

        let destroyed = self.store.destroy(handle)?;
        let removed = RemovedEntity {
            handle,
            id: destroyed.character.as_ref().map(|character| character.id),
            facets: destroyed.facet_names(),
        };
        drop(destroyed);

        info!(
            entity = %handle,
            id = removed.id.map(|id| id.0),
            facets = ?removed.facets,
            "entity_removed"
        );
        Some(removed)
    }

    /// Moves a player to `target_map_code`. A zero `new_position` lets the target
    /// map pick a walkable cell. On an unknown target the player is left detached
    /// from every map and inactive.
    pub fn move_player_map(
        &mut self,
        handle: EntityHandle,
        target_map_code: &str,
        new_position: Position,
    ) -> Result<(), WorldError> {
        if !self.store.is_alive(handle) {
            return Err(WorldError::StaleHandle { handle });
        }
        if !self.store.has::<Player>(handle) {
            return Err(WorldError::NotAPlayer { handle });
        }

        let previous_map = {
            let character = self
                .store
                .get_mut::<Character>(handle)
                .ok_or(WorldError::NotAPlayer { handle })?;
            character.is_active = false;
            character.reset_state();
            character.position = new_position;
            character.map.take()
        };
        if let Some(map) = previous_map.and_then(|map_id| self.maps.get_mut(map_id.0)) {
            map.remove_entity(handle);
        }

        let Some(target_id) = self.map_id(target_map_code) else {
            warn!(entity = %handle, map = target_map_code, "move_target_map_unknown");
            return Err(WorldError::UnknownMap {
                map_code: target_map_code.to_string(),
            });
        };

        let target = &self.maps[target_id.0];
        let position = if new_position.is_zero() {
            target
                .find_position_in_range(target.bounds(), &mut self.rng)
                .unwrap_or_else(|| target.bounds().midpoint())
        } else {
            new_position
        };
        if let Some(character) = self.store.get_mut::<Character>(handle) {
            character.position = position;
        }
        self.attach_to_map(handle, target_id);

        let map_code = self.maps[target_id.0].code();
        if let (Some(character), Some(player)) = (
            self.store.get::<Character>(handle),
            self.store.get::<Player>(handle),
        ) {
            player.connection.touch_keep_alive(self.elapsed_seconds);
            self.outbound.send_change_map(character, map_code, player);
        }

        info!(
            entity = %handle,
            from = ?previous_map,
            map = map_code,
            position = %position,
            "player_changed_map"
        );
        Ok(())
    }

    /// Sends `player` through `warp` to a walkable cell of the warp's destination
    /// area.
    pub fn use_warp(&mut self, player: EntityHandle, warp: EntityHandle) -> Result<(), WorldError> {
        let (destination_map, destination_area) = self
            .store
            .get::<Warp>(warp)
            .map(|warp| (warp.destination_map.clone(), warp.destination_area))
            .ok_or(WorldError::NotAWarp { handle: warp })?;
        let target_id = self
            .map_id(&destination_map)
            .ok_or_else(|| WorldError::UnknownMap {
                map_code: destination_map.clone(),
            })?;

        let position = self.maps[target_id.0]
            .find_position_in_range(destination_area, &mut self.rng)
            .unwrap_or(Position::ZERO);
        self.move_player_map(player, &destination_map, position)
    }

    /// Marks a character as active, e.g. once its client finished loading the map.
    pub fn activate_entity(&mut self, handle: EntityHandle) -> Result<(), WorldError> {
        let character = self
            .store
            .get_mut::<Character>(handle)
            .ok_or(WorldError::StaleHandle { handle })?;
        character.is_active = true;
        Ok(())
    }

    /// Adds `handle` to `map_id`, removing it from any map it was on before.
    pub fn add_entity_to_map(
        &mut self,
        handle: EntityHandle,
        map_id: MapId,
    ) -> Result<(), WorldError> {
        if !self.store.is_alive(handle) {
            return Err(WorldError::StaleHandle { handle });
        }
        if map_id.0 >= self.maps.len() {
            return Err(WorldError::UnknownMapId { map: map_id });
        }
        self.attach_to_map(handle, map_id);
        Ok(())
    }

    fn attach_to_map(&mut self, handle: EntityHandle, map_id: MapId) {
        let previous = self
            .store
            .get_mut::<Character>(handle)
            .and_then(|character| character.map.replace(map_id));
        if let Some(map) = previous
            .filter(|previous| *previous != map_id)
            .and_then(|previous| self.maps.get_mut(previous.0))
        {
            map.remove_entity(handle);
        }
        if let Some(map) = self.maps.get_mut(map_id.0) {
            map.add_entity(handle);
        }
    }

    fn spawn_with_id(&mut self) -> Result<(EntityHandle, EntityId), WorldError> {
        let handle = self.store.spawn();
        match self.ids.allocate(handle) {
            Ok(id) => Ok((handle, id)),
            Err(error) => {
                self.store.destroy(handle);
                warn!(error = %error, "entity_id_allocation_failed");
                Err(error.into())
            }
        }
    }

    pub fn map_id(&self, map_code: &str) -> Option<MapId> {
        self.map_ids_by_code.get(map_code).copied()
    }

    pub fn map(&self, map_id: MapId) -> Option<&Map> {
        self.maps.get(map_id.0)
    }

    pub fn map_by_code(&self, map_code: &str) -> Option<&Map> {
        self.map_id(map_code).and_then(|map_id| self.map(map_id))
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    pub fn handle_for_id(&self, id: EntityId) -> Option<EntityHandle> {
        self.ids.handle(id)
    }

    pub fn ids(&self) -> &EntityIdAllocator {
        &self.ids
    }

    pub fn character(&self, handle: EntityHandle) -> Option<&Character> {
        self.store.get::<Character>(handle)
    }

    pub fn outbound(&self) -> &OutboundBuffer {
        &self.outbound
    }

    pub fn outbound_mut(&mut self) -> &mut OutboundBuffer {
        &mut self.outbound
    }

    pub fn take_outbox(&mut self) -> Vec<OutboundPacket> {
        self.outbound.take_outbox()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }
}
