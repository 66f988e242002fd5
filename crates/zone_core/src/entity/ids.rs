use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use super::facets::EntityId;
use super::store::EntityHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity id space exhausted: {active} ids active with ceiling {max_id}")]
pub struct IdSpaceExhausted {
    pub active: usize,
    pub max_id: u32,
}

/// Issues dense ids in `0..=max_id` and keeps the id -> handle reverse lookup.
///
/// Fresh ids come from a cursor that advances by one per allocation and steps
/// forward (wrapping) past ids still in use. Ids released at or below the
/// cursor go into `freed` and the lowest of them is handed out before the
/// cursor moves again, which keeps live ids packed near zero.
#[derive(Debug)]
pub struct EntityIdAllocator {
    cursor: u32,
    max_id: u32,
    freed: BTreeSet<u32>,
    active: HashMap<EntityId, EntityHandle>,
}

impl EntityIdAllocator {
    pub fn new(max_id: u32) -> Self {
        Self {
            cursor: 0,
            max_id,
            freed: BTreeSet::new(),
            active: HashMap::new(),
        }
    }

    pub fn allocate(&mut self, handle: EntityHandle) -> Result<EntityId, IdSpaceExhausted> {
        if self.active.len() as u64 > u64::from(self.max_id) {
            return Err(IdSpaceExhausted {
                active: self.active.len(),
                max_id: self.max_id,
            });
        }

        let id = match self.freed.pop_first() {
            Some(raw) => EntityId(raw),
            None => {
                // `freed` is empty here, so the scan never lands on a queued id.
                self.cursor = self.step(self.cursor);
                while self.active.contains_key(&EntityId(self.cursor)) {
                    self.cursor = self.step(self.cursor);
                }
                EntityId(self.cursor)
            }
        };
        self.active.insert(id, handle);
        Ok(id)
    }

    pub fn release(&mut self, id: EntityId) -> Option<EntityHandle> {
        let handle = self.active.remove(&id)?;
        if id.0 <= self.cursor {
            self.freed.insert(id.0);
        }
        Some(handle)
    }

    pub fn handle(&self, id: EntityId) -> Option<EntityHandle> {
        self.active.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.active.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    fn step(&self, id: u32) -> u32 {
        if id >= self.max_id {
            0
        } else {
            id + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::entity::EntityStore;

    fn handles(count: usize) -> Vec<EntityHandle> {
        let mut store = EntityStore::with_capacity(count);
        (0..count).map(|_| store.spawn()).collect()
    }

    #[test]
    fn first_ids_count_up_from_one() {
        let hs = handles(3);
        let mut ids = EntityIdAllocator::new(100);
        let got = hs
            .iter()
            .map(|h| ids.allocate(*h).expect("id").0)
            .collect::<Vec<_>>();
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(ids.handle(EntityId(2)), Some(hs[1]));
    }

    #[test]
    fn released_id_is_reused_before_fresh_ones() {
        let hs = handles(3);
        let mut ids = EntityIdAllocator::new(100);
        let first = ids.allocate(hs[0]).expect("first");
        let _second = ids.allocate(hs[1]).expect("second");
        ids.release(first);

        let third = ids.allocate(hs[2]).expect("third");
        assert_eq!(third, first);
    }

    #[test]
    fn freed_id_then_next_fresh_id() {
        let hs = handles(5);
        let mut ids = EntityIdAllocator::new(100);
        for h in &hs[..4] {
            ids.allocate(*h).expect("id");
        }
        ids.release(EntityId(2));
        assert_eq!(ids.allocate(hs[4]).expect("id"), EntityId(2));
        let extra = handles(1)[0];
        assert_eq!(ids.allocate(extra).expect("id"), EntityId(5));
    }

    #[test]
    fn lowest_freed_id_wins_regardless_of_release_order() {
        let hs = handles(12);
        let mut ids = EntityIdAllocator::new(100);
        for h in &hs[..10] {
            ids.allocate(*h).expect("id");
        }
        ids.release(EntityId(7));
        ids.release(EntityId(3));
        ids.release(EntityId(5));

        let got = hs[10..]
            .iter()
            .map(|h| ids.allocate(*h).expect("id").0)
            .collect::<Vec<_>>();
        assert_eq!(got, vec![3, 5]);
        let extra = handles(2);
        assert_eq!(ids.allocate(extra[0]).expect("id"), EntityId(7));
        assert_eq!(ids.allocate(extra[1]).expect("id"), EntityId(11));
    }

    #[test]
    fn low_id_churn_does_not_walk_the_live_range() {
        let hs = handles(1002);
        let mut ids = EntityIdAllocator::new(10_000);
        for h in &hs[..1000] {
            ids.allocate(*h).expect("id");
        }
        for h in &hs[1000..] {
            ids.release(EntityId(1));
            assert_eq!(ids.allocate(*h).expect("id"), EntityId(1));
            assert_eq!(ids.cursor, 1000);
        }
    }

    #[test]
    fn cursor_wraps_to_zero_past_ceiling() {
        let hs = handles(4);
        let mut ids = EntityIdAllocator::new(3);
        let got = hs
            .iter()
            .map(|h| ids.allocate(*h).expect("id").0)
            .collect::<Vec<_>>();
        assert_eq!(got, vec![1, 2, 3, 0]);
    }

    #[test]
    fn full_id_space_is_rejected() {
        let hs = handles(3);
        let mut ids = EntityIdAllocator::new(1);
        ids.allocate(hs[0]).expect("id");
        ids.allocate(hs[1]).expect("id");
        let err = ids.allocate(hs[2]).expect_err("exhausted");
        assert_eq!(err.max_id, 1);
        assert_eq!(err.active, 2);
    }

    #[test]
    fn churn_keeps_ids_unique_and_in_range() {
        let max_id = 63;
        let hs = handles(2000);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut ids = EntityIdAllocator::new(max_id);
        let mut live = Vec::<EntityId>::new();

        for h in hs {
            if !live.is_empty() && (live.len() > 50 || rng.gen_bool(0.4)) {
                let victim = live.swap_remove(rng.gen_range(0..live.len()));
                assert!(ids.release(victim).is_some());
            }
            let id = ids.allocate(h).expect("id");
            assert!(id.0 <= max_id);
            live.push(id);

            let unique = live.iter().copied().collect::<HashSet<_>>();
            assert_eq!(unique.len(), live.len());
            assert_eq!(ids.len(), live.len());
        }
    }
}
