mod facets;
mod ids;
mod store;

pub use facets::{
    Character, CharacterKind, CharacterState, CombatEntity, Direction, EntityId, Monster, Player,
    Warp,
};
pub use ids::{EntityIdAllocator, IdSpaceExhausted};
pub use store::{DestroyedEntity, EntityHandle, EntityStore, Facet, FacetTable};
