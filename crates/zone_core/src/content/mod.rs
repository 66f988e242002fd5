mod compiler;
mod database;
mod pipeline;
mod types;

pub use compiler::parse_monster_defs;
pub use database::GameData;
pub use pipeline::{load_game_data, CONNECTORS_FILE, MAPS_FILE, MONSTERS_FILE, SPAWNS_FILE};
pub use types::{
    ConnectorDefinition, DataError, DataErrorCode, MapDefinition, MonsterTemplate,
    SourceLocation, SpawnDefinition, WalkGrid,
};
