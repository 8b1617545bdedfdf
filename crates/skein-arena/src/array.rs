//! Bounded, order-preserving lists of weak references.

use std::collections::HashSet;

use tracing::warn;

use skein_core::{ArrayError, Entity};

use crate::arena::EntityArena;
use crate::boxed::Boxed;

/// A fixed-capacity list of [`Boxed<T>`] references.
///
/// Dead references are skipped by iteration but stay in place until
/// [`compact`](Self::compact) is called. Nothing here compacts implicitly,
/// so per-frame iteration cost depends only on what was added.
pub struct EntityArray<T> {
    refs: Vec<Boxed<T>>,
    capacity: usize,
}

impl<T: Entity> EntityArray<T> {
    /// Create an empty array holding at most `capacity` references.
    pub fn new(capacity: usize) -> Self {
        Self {
            refs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reference.
    ///
    /// At capacity the reference is dropped, a warning is logged and
    /// [`ArrayError::Overflow`] is returned; the array is left unchanged.
    pub fn add(&mut self, r: Boxed<T>) -> Result<(), ArrayError> {
        if self.refs.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                entity = %r.key(),
                "entity array overflow, reference dropped"
            );
            return Err(ArrayError::Overflow {
                capacity: self.capacity,
            });
        }
        self.refs.push(r);
        Ok(())
    }

    /// Number of stored references, dead ones included.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Whether no references are stored.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Maximum number of references.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether [`add`](Self::add) would overflow.
    pub fn is_full(&self) -> bool {
        self.refs.len() >= self.capacity
    }

    /// Drop every reference.
    pub fn clear(&mut self) {
        self.refs.clear();
    }

    /// The reference stored at `i`, live or not.
    pub fn get_boxed(&self, i: usize) -> Option<Boxed<T>> {
        self.refs.get(i).copied()
    }

    /// Resolve the reference stored at `i`.
    pub fn get<'a>(&self, i: usize, arena: &'a EntityArena) -> Option<&'a T> {
        arena.get(*self.refs.get(i)?)
    }

    /// All stored references, dead ones included.
    pub fn as_slice(&self) -> &[Boxed<T>] {
        &self.refs
    }

    /// Visit every live entity in insertion order.
    pub fn for_each(&self, arena: &EntityArena, mut f: impl FnMut(&T)) {
        for r in &self.refs {
            if let Some(e) = arena.get(*r) {
                f(e);
            }
        }
    }

    /// Visit every live entity along with its index in the array.
    pub fn for_each_indexed(&self, arena: &EntityArena, mut f: impl FnMut(usize, &T)) {
        for (i, r) in self.refs.iter().enumerate() {
            if let Some(e) = arena.get(*r) {
                f(i, e);
            }
        }
    }

    /// Visit every live entity mutably in insertion order.
    pub fn for_each_mut(&self, arena: &mut EntityArena, mut f: impl FnMut(&mut T)) {
        for r in &self.refs {
            if let Some(e) = arena.get_mut(*r) {
                f(e);
            }
        }
    }

    /// Iterate live references in insertion order.
    pub fn iter_live<'a>(&'a self, arena: &'a EntityArena) -> impl Iterator<Item = Boxed<T>> + 'a {
        self.refs.iter().copied().filter(move |r| arena.is_alive(*r))
    }

    /// Rewrite the array in place, keeping only live references.
    ///
    /// Survivors keep their relative order. A live slot referenced more than
    /// once keeps only its first occurrence. Returns the number of
    /// references removed.
    pub fn compact(&mut self, arena: &EntityArena) -> usize {
        let before = self.refs.len();
        let mut seen = HashSet::with_capacity(before);
        self.refs.retain(|r| arena.is_alive(*r) && seen.insert(r.key()));
        before - self.refs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use skein_core::EntityKind;

    #[derive(Debug, PartialEq)]
    struct Shot(u32);
    impl Entity for Shot {
        const KIND: EntityKind = EntityKind::Projectile;
    }

    fn ids(a: &EntityArray<Shot>, arena: &EntityArena) -> Vec<u32> {
        let mut out = Vec::new();
        a.for_each(arena, |s| out.push(s.0));
        out
    }

    #[test]
    fn for_each_visits_in_insertion_order() {
        let mut arena = EntityArena::default();
        let mut a = EntityArray::new(8);
        for i in 0..5 {
            a.add(arena.spawn(Shot(i))).unwrap();
        }
        assert_eq!(ids(&a, &arena), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn overflow_is_reported_and_drops_only_the_extra() {
        let mut arena = EntityArena::default();
        let mut a = EntityArray::new(2);
        a.add(arena.spawn(Shot(0))).unwrap();
        a.add(arena.spawn(Shot(1))).unwrap();
        assert!(a.is_full());
        let extra = arena.spawn(Shot(2));
        assert_eq!(a.add(extra), Err(ArrayError::Overflow { capacity: 2 }));
        assert_eq!(ids(&a, &arena), vec![0, 1]);
    }

    #[test]
    fn dead_references_are_skipped_not_removed() {
        let mut arena = EntityArena::default();
        let mut a = EntityArray::new(4);
        let refs: Vec<_> = (0..3).map(|i| arena.spawn(Shot(i))).collect();
        for r in &refs {
            a.add(*r).unwrap();
        }
        arena.despawn(refs[1]).unwrap();
        assert_eq!(ids(&a, &arena), vec![0, 2]);
        assert_eq!(a.len(), 3);
        assert!(a.get(1, &arena).is_none());
        assert_eq!(a.get_boxed(1), Some(refs[1]));

        let mut indices = Vec::new();
        a.for_each_indexed(&arena, |i, _| indices.push(i));
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn compact_preserves_order_and_dedups() {
        let mut arena = EntityArena::default();
        let mut a = EntityArray::new(8);
        let x = arena.spawn(Shot(10));
        let y = arena.spawn(Shot(20));
        let z = arena.spawn(Shot(30));
        for r in [x, y, x, z, y] {
            a.add(r).unwrap();
        }
        arena.despawn(y).unwrap();
        assert_eq!(a.compact(&arena), 3);
        assert_eq!(a.as_slice(), &[x, z]);
    }

    #[test]
    fn for_each_mut_updates_live_entities() {
        let mut arena = EntityArena::default();
        let mut a = EntityArray::new(4);
        a.add(arena.spawn(Shot(1))).unwrap();
        a.add(arena.spawn(Shot(2))).unwrap();
        a.for_each_mut(&mut arena, |s| s.0 *= 10);
        assert_eq!(ids(&a, &arena), vec![10, 20]);
    }

    proptest! {
        #[test]
        fn compact_is_idempotent(
            picks in proptest::collection::vec(0usize..6, 0..24),
            kill in proptest::collection::vec(any::<bool>(), 6),
        ) {
            let mut arena = EntityArena::default();
            let pool: Vec<_> = (0..6).map(|i| arena.spawn(Shot(i))).collect();
            let mut a = EntityArray::new(24);
            for p in picks {
                a.add(pool[p]).unwrap();
            }
            for (r, k) in pool.iter().zip(kill) {
                if k {
                    arena.despawn(*r).unwrap();
                }
            }
            a.compact(&arena);
            let once = a.as_slice().to_vec();
            prop_assert_eq!(a.compact(&arena), 0);
            prop_assert_eq!(a.as_slice(), once.as_slice());

            let mut seen = HashSet::new();
            for r in a.as_slice() {
                prop_assert!(arena.is_alive(*r));
                prop_assert!(seen.insert(r.key()));
            }
        }

        #[test]
        fn n_live_adds_visit_n_in_order(n in 0usize..32) {
            let mut arena = EntityArena::default();
            let mut a = EntityArray::new(32);
            for i in 0..n {
                a.add(arena.spawn(Shot(i as u32))).unwrap();
            }
            let expected: Vec<u32> = (0..n as u32).collect();
            prop_assert_eq!(ids(&a, &arena), expected);
        }
    }
}
