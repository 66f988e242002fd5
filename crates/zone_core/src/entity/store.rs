use std::fmt;

use super::facets::{Character, CombatEntity, Monster, Player, Warp};

/// Opaque reference into [`EntityStore`]. A handle outlives nothing: once the
/// entity is destroyed the slot's generation moves on and the handle stops
/// resolving, even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

#[derive(Debug)]
pub struct FacetTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for FacetTable<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> FacetTable<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    fn insert(&mut self, index: u32, value: T) -> Option<T> {
        let index = index as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].replace(value)
    }

    fn take(&mut self, index: u32) -> Option<T> {
        self.slots.get_mut(index as usize).and_then(Option::take)
    }

    fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// A component kind that can be attached to an entity. Each facet lives in its
/// own sparse table keyed by the handle's slot index; "has facet" replaces any
/// notion of entity subtype.
pub trait Facet: Sized + 'static {
    const NAME: &'static str;

    fn table(store: &EntityStore) -> &FacetTable<Self>;
    fn table_mut(store: &mut EntityStore) -> &mut FacetTable<Self>;
    fn split_mut(store: &mut EntityStore) -> (&[u32], &mut FacetTable<Self>);
}

macro_rules! impl_facet {
    ($ty:ty, $field:ident, $name:literal) => {
        impl Facet for $ty {
            const NAME: &'static str = $name;

            fn table(store: &EntityStore) -> &FacetTable<Self> {
                &store.$field
            }

            fn table_mut(store: &mut EntityStore) -> &mut FacetTable<Self> {
                &mut store.$field
            }

            fn split_mut(store: &mut EntityStore) -> (&[u32], &mut FacetTable<Self>) {
                (store.generations.as_slice(), &mut store.$field)
            }
        }
    };
}

impl_facet!(Character, characters, "Character");
impl_facet!(CombatEntity, combatants, "CombatEntity");
impl_facet!(Monster, monsters, "Monster");
impl_facet!(Player, players, "Player");
impl_facet!(Warp, warps, "Warp");

/// Facets that were attached to an entity at the moment it was destroyed.
#[derive(Debug, Default)]
pub struct DestroyedEntity {
    pub character: Option<Character>,
    pub combatant: Option<CombatEntity>,
    pub monster: Option<Monster>,
    pub player: Option<Player>,
    pub warp: Option<Warp>,
}

impl DestroyedEntity {
    pub fn facet_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.character.is_some() {
            names.push(Character::NAME);
        }
        if self.combatant.is_some() {
            names.push(CombatEntity::NAME);
        }
        if self.monster.is_some() {
            names.push(Monster::NAME);
        }
        if self.player.is_some() {
            names.push(Player::NAME);
        }
        if self.warp.is_some() {
            names.push(Warp::NAME);
        }
        names
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
    characters: FacetTable<Character>,
    combatants: FacetTable<CombatEntity>,
    monsters: FacetTable<Monster>,
    players: FacetTable<Player>,
    warps: FacetTable<Warp>,
}

impl EntityStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            free: Vec::new(),
            live_count: 0,
            characters: FacetTable::with_capacity(capacity),
            combatants: FacetTable::with_capacity(capacity),
            monsters: FacetTable::with_capacity(capacity),
            players: FacetTable::default(),
            warps: FacetTable::default(),
        }
    }

    pub fn spawn(&mut self) -> EntityHandle {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            self.alive[index as usize] = true;
            return EntityHandle {
                index,
                generation: self.generations[index as usize],
            };
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        EntityHandle {
            index,
            generation: 0,
        }
    }

    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        let index = handle.index as usize;
        self.alive.get(index).copied().unwrap_or(false)
            && self.generations.get(index).copied() == Some(handle.generation)
    }

    /// Detaches every facet and retires the handle. Returns `None` for a handle
    /// that is already stale.
    pub fn destroy(&mut self, handle: EntityHandle) -> Option<DestroyedEntity> {
        if !self.is_alive(handle) {
            return None;
        }
        let index = handle.index;
        let destroyed = DestroyedEntity {
            character: self.characters.take(index),
            combatant: self.combatants.take(index),
            monster: self.monsters.take(index),
            player: self.players.take(index),
            warp: self.warps.take(index),
        };

        let slot = index as usize;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.alive[slot] = false;
        self.free.push(index);
        self.live_count -= 1;
        Some(destroyed)
    }

    /// Attaches `value`, replacing any previous facet of the same kind. Returns
    /// `false` without storing anything when the handle is stale.
    pub fn insert<T: Facet>(&mut self, handle: EntityHandle, value: T) -> bool {
        if !self.is_alive(handle) {
            return false;
        }
        T::table_mut(self).insert(handle.index, value);
        true
    }

    pub fn get<T: Facet>(&self, handle: EntityHandle) -> Option<&T> {
        if !self.is_alive(handle) {
            return None;
        }
        T::table(self).get(handle.index)
    }

    pub fn get_mut<T: Facet>(&mut self, handle: EntityHandle) -> Option<&mut T> {
        if !self.is_alive(handle) {
            return None;
        }
        T::table_mut(self).get_mut(handle.index)
    }

    pub fn has<T: Facet>(&self, handle: EntityHandle) -> bool {
        self.get::<T>(handle).is_some()
    }

    pub fn remove<T: Facet>(&mut self, handle: EntityHandle) -> Option<T> {
        if !self.is_alive(handle) {
            return None;
        }
        T::table_mut(self).take(handle.index)
    }

    pub fn iter<T: Facet>(&self) -> impl Iterator<Item = (EntityHandle, &T)> + '_ {
        let generations = &self.generations;
        T::table(self)
            .slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_ref().map(|value| {
                    (
                        EntityHandle {
                            index: index as u32,
                            generation: generations[index],
                        },
                        value,
                    )
                })
            })
    }

    pub fn for_each_mut<T: Facet>(&mut self, mut f: impl FnMut(EntityHandle, &mut T)) {
        let (generations, table) = T::split_mut(self);
        for (index, slot) in table.slots.iter_mut().enumerate() {
            if let Some(value) = slot.as_mut() {
                let handle = EntityHandle {
                    index: index as u32,
                    generation: generations[index],
                };
                f(handle, value);
            }
        }
    }

    pub fn count<T: Facet>(&self) -> usize {
        T::table(self).count()
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
