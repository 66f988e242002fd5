use serde::Deserialize;

pub const DEFAULT_MAX_ENTITY_ID: u32 = 10_000_000;
pub const DEFAULT_EXPECTED_ENTITIES_PER_MAP: usize = 600;
pub const DEFAULT_PLAYER_SPAWN_RETRY_LIMIT: u32 = 100;
pub const DEFAULT_KEEP_ALIVE_TIMEOUT_SECONDS: f64 = 120.0;
pub const DEFAULT_CONNECTOR_CLASS_ID: i32 = 1000;
const MIN_STORE_CAPACITY: usize = 1024;

/// Tunables for a [`crate::World`]. Every field has a default, so partial JSON
/// objects deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Highest id the allocator hands out; ids wrap to 0 past it.
    pub max_entity_id: u32,
    pub expected_entities_per_map: usize,
    pub player_spawn_retry_limit: u32,
    pub keep_alive_timeout_seconds: f64,
    /// Monster class spawned for every connector entry.
    pub connector_class_id: i32,
    pub rng_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entity_id: DEFAULT_MAX_ENTITY_ID,
            expected_entities_per_map: DEFAULT_EXPECTED_ENTITIES_PER_MAP,
            player_spawn_retry_limit: DEFAULT_PLAYER_SPAWN_RETRY_LIMIT,
            keep_alive_timeout_seconds: DEFAULT_KEEP_ALIVE_TIMEOUT_SECONDS,
            connector_class_id: DEFAULT_CONNECTOR_CLASS_ID,
            rng_seed: None,
        }
    }
}

impl WorldConfig {
    pub fn initial_store_capacity(&self, map_count: usize) -> usize {
        map_count
            .saturating_mul(self.expected_entities_per_map)
            .checked_next_power_of_two()
            .unwrap_or(usize::MAX)
            .max(MIN_STORE_CAPACITY)
    }
}
