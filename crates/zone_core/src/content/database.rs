use std::collections::HashMap;

use super::types::{ConnectorDefinition, MapDefinition, MonsterTemplate, SpawnDefinition};

/// Static game data the world is built from. Every lookup answers "absent"
/// rather than failing; a map without spawn or connector entries simply has none.
#[derive(Debug, Default, Clone)]
pub struct GameData {
    maps: Vec<MapDefinition>,
    spawns_by_map: HashMap<String, Vec<SpawnDefinition>>,
    connectors_by_map: HashMap<String, Vec<ConnectorDefinition>>,
    monsters: Vec<MonsterTemplate>,
    monster_index_by_id: HashMap<i32, usize>,
    monster_ids_by_code: HashMap<String, i32>,
}

impl GameData {
    pub fn new(
        maps: Vec<MapDefinition>,
        spawns_by_map: HashMap<String, Vec<SpawnDefinition>>,
        connectors_by_map: HashMap<String, Vec<ConnectorDefinition>>,
        monsters: Vec<MonsterTemplate>,
    ) -> Self {
        let mut monster_index_by_id = HashMap::with_capacity(monsters.len());
        let mut monster_ids_by_code = HashMap::with_capacity(monsters.len());
        for (index, monster) in monsters.iter().enumerate() {
            monster_index_by_id.insert(monster.id, index);
            monster_ids_by_code.insert(monster.code.clone(), monster.id);
        }
        Self {
            maps,
            spawns_by_map,
            connectors_by_map,
            monsters,
            monster_index_by_id,
            monster_ids_by_code,
        }
    }

    pub fn maps(&self) -> &[MapDefinition] {
        &self.maps
    }

    pub fn spawns_for_map(&self, map_code: &str) -> &[SpawnDefinition] {
        self.spawns_by_map
            .get(map_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn connectors_for_map(&self, map_code: &str) -> &[ConnectorDefinition] {
        self.connectors_by_map
            .get(map_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn monster_id_for_code(&self, code: &str) -> Option<i32> {
        self.monster_ids_by_code.get(code).copied()
    }

    pub fn monster_by_id(&self, id: i32) -> Option<&MonsterTemplate> {
        self.monster_index_by_id
            .get(&id)
            .and_then(|index| self.monsters.get(*index))
    }

    pub fn monsters(&self) -> &[MonsterTemplate] {
        &self.monsters
    }

    pub fn total_spawn_count(&self) -> u64 {
        self.spawns_by_map
            .values()
            .flatten()
            .map(|spawn| u64::from(spawn.count))
            .sum()
    }
}
