use thiserror::Error;

use crate::entity::{EntityHandle, EntityId, IdSpaceExhausted};
use crate::map::MapId;

use super::systems::SystemId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("map '{map_code}' does not exist")]
    UnknownMap { map_code: String },
    #[error("map {map} does not exist")]
    UnknownMapId { map: MapId },
    #[error("no monster definition for class id {class_id}")]
    UnknownMonsterClass { class_id: i32 },
    #[error(transparent)]
    IdSpaceExhausted(#[from] IdSpaceExhausted),
    #[error("map '{map_code}' has no walkable cell")]
    NoWalkableCell { map_code: String },
    #[error("{handle} is no longer alive")]
    StaleHandle { handle: EntityHandle },
    #[error("{handle} is not a player")]
    NotAPlayer { handle: EntityHandle },
    #[error("{handle} is not a warp")]
    NotAWarp { handle: EntityHandle },
}

/// What [`super::World::remove_entity`] tore down. The facets themselves are
/// already dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntity {
    pub handle: EntityHandle,
    pub id: Option<EntityId>,
    pub facets: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTickSummary {
    pub map: MapId,
    pub tick: u64,
    pub entity_count: usize,
    pub player_count: usize,
}

/// What one [`super::World::update`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub elapsed_seconds: f64,
    pub systems_order: Vec<SystemId>,
    pub monster_count: usize,
    pub removed: Vec<EntityId>,
    pub maps: Vec<MapTickSummary>,
    pub outbound_leftover: bool,
}

impl TickReport {
    pub fn player_count(&self) -> usize {
        self.maps.iter().map(|summary| summary.player_count).sum()
    }
}
