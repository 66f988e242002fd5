mod walk;

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;

use crate::entity::{Character, CharacterKind, EntityHandle, EntityStore};
use crate::geom::{Area, Position};

pub use walk::{WalkData, WalkDataError};

/// Random samples tried by [`Map::find_position_in_range`] before it falls back
/// to scanning the area cell by cell.
pub const POSITION_SEARCH_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub usize);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct Map {
    id: MapId,
    code: String,
    name: String,
    bounds: Area,
    walk_data: WalkData,
    entities: BTreeSet<EntityHandle>,
    tick: u64,
    player_count: usize,
}

impl Map {
    pub fn new(
        id: MapId,
        code: impl Into<String>,
        name: impl Into<String>,
        walk_data: WalkData,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            bounds: walk_data.bounds(),
            walk_data,
            entities: BTreeSet::new(),
            tick: 0,
            player_count: 0,
        }
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> Area {
        self.bounds
    }

    pub fn walk_data(&self) -> &WalkData {
        &self.walk_data
    }

    pub fn is_walkable(&self, position: Position) -> bool {
        self.walk_data.is_cell_walkable(position)
    }

    /// Returns `false` if the handle was already resident.
    pub fn add_entity(&mut self, handle: EntityHandle) -> bool {
        self.entities.insert(handle)
    }

    pub fn remove_entity(&mut self, handle: EntityHandle) -> bool {
        self.entities.remove(&handle)
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains(&handle)
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.entities.iter().copied()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn is_idle(&self) -> bool {
        self.player_count == 0
    }

    /// Finds a walkable cell inside `area` (clipped to the map). Never panics on an
    /// unsatisfiable area; `None` means no cell in it is walkable.
    pub fn find_position_in_range<R: Rng + ?Sized>(
        &self,
        area: Area,
        rng: &mut R,
    ) -> Option<Position> {
        let area = area.clipped_to(self.bounds);
        if area.is_empty() {
            return None;
        }

        for _ in 0..POSITION_SEARCH_ATTEMPTS {
            let candidate = area.random_point(rng);
            if self.is_walkable(candidate) {
                return Some(candidate);
            }
        }

        let found = area.cells().find(|cell| self.is_walkable(*cell));
        found
    }

    pub fn update(&mut self, store: &EntityStore) {
        self.tick = self.tick.saturating_add(1);
        self.player_count = self
            .entities
            .iter()
            .filter_map(|handle| store.get::<Character>(*handle))
            .filter(|character| character.is_active && character.kind == CharacterKind::Player)
            .count();
    }
}
