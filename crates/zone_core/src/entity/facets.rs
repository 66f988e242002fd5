use std::sync::Arc;

use rand::Rng;

use crate::geom::{Area, Position};
use crate::map::MapId;
use crate::messaging::NetworkConnection;

/// Dense, reusable identifier shown to clients. Distinct from [`super::EntityHandle`],
/// which addresses the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterKind {
    #[default]
    Monster,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CharacterState {
    #[default]
    Idle,
    Moving {
        target: Position,
    },
    Sitting,
    Dead,
}

#[derive(Debug, Clone, Default)]
pub struct Character {
    pub id: EntityId,
    pub class_id: i32,
    pub position: Position,
    pub move_speed: f32,
    pub kind: CharacterKind,
    pub facing: Direction,
    pub map: Option<MapId>,
    pub is_active: bool,
    pub state: CharacterState,
    pub move_cooldown: f32,
}

impl Character {
    /// Clears per-map transient state (movement, cooldowns) ahead of a map change.
    pub fn reset_state(&mut self) {
        self.state = CharacterState::Idle;
        self.move_cooldown = 0.0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CombatEntity {
    pub hp: u32,
    pub max_hp: u32,
    pub target: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Monster;

#[derive(Debug, Clone)]
pub struct Player {
    pub connection: Arc<NetworkConnection>,
    pub is_male: bool,
    pub head_id: u8,
}

/// Map connector trigger. Carried by the entities spawned from connector tables.
#[derive(Debug, Clone, Default)]
pub struct Warp {
    pub destination_map: String,
    pub destination_area: Area,
}
