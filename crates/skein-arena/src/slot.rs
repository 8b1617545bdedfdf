//! Generic slot+generation map.
//!
//! Backing store for entities, tasks and events alike. Removed values leave
//! their slot with a bumped generation counter, so any [`SlotKey`] issued
//! before the removal resolves to `None` instead of to whatever occupies the
//! slot next. Double-remove is a safe no-op.

use skein_core::{Generation, SlotIndex, SlotKey};

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// A slot+generation map from [`SlotKey`]s to owned values.
///
/// Reuses slots via a LIFO free list, which keeps key assignment a pure
/// function of the insert/remove sequence (replays issue identical keys).
pub struct SlotMap<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
    retired: usize,
}

impl<T> SlotMap<T> {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            retired: 0,
        }
    }

    /// Create an empty map with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
            retired: 0,
        }
    }

    /// Insert a value and return its key.
    ///
    /// # Panics
    ///
    /// Panics if the map already holds `u32::MAX` slots.
    pub fn insert(&mut self, value: T) -> SlotKey {
        self.len += 1;
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            debug_assert!(slot.data.is_none(), "free-listed slot {slot_idx} is occupied");
            slot.data = Some(value);
            SlotKey::new(slot_idx, slot.generation)
        } else {
            let slot_idx = u32::try_from(self.slots.len())
                .unwrap_or_else(|_| panic!("slot map exhausted the u32 index space"));
            self.slots.push(Slot {
                generation: 0,
                data: Some(value),
            });
            SlotKey::new(slot_idx, 0)
        }
    }

    fn slot(&self, key: SlotKey) -> Option<&Slot<T>> {
        let slot = self.slots.get(key.index.0 as usize)?;
        (slot.generation == key.generation.0).then_some(slot)
    }

    /// Get an immutable reference to the value behind a key.
    ///
    /// Returns `None` if the key is stale or was never valid.
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.slot(key)?.data.as_ref()
    }

    /// Get a mutable reference to the value behind a key.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index.0 as usize)?;
        if slot.generation != key.generation.0 {
            return None;
        }
        slot.data.as_mut()
    }

    /// Whether the key names a live value.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Remove the value behind a key, returning it.
    ///
    /// Increments the generation counter and returns the slot to the free
    /// list. If the generation wraps back to 0 the slot is retired
    /// permanently: recycling it would let a key from the first epoch
    /// resolve again.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index.0 as usize)?;
        if slot.generation != key.generation.0 {
            return None;
        }
        let value = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(key.index.0);
        } else {
            self.retired += 1;
        }
        self.len -= 1;
        Some(value)
    }

    /// Whether `key`'s own value was the last one removed from its slot,
    /// with the slot still free.
    pub fn was_removed(&self, key: SlotKey) -> bool {
        self.slots.get(key.index.0 as usize).is_some_and(|slot| {
            slot.data.is_none() && slot.generation == key.generation.0.wrapping_add(1)
        })
    }

    /// The key of whatever currently lives in `index`, if anything.
    pub fn key_at(&self, index: SlotIndex) -> Option<SlotKey> {
        let slot = self.slots.get(index.0 as usize)?;
        slot.data.as_ref()?;
        Some(SlotKey {
            index,
            generation: Generation(slot.generation),
        })
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no live values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (live, free and retired).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots permanently retired by generation wraparound.
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// Iterate live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.data
                .as_ref()
                .map(|v| (SlotKey::new(i as u32, slot.generation), v))
        })
    }

    /// Iterate live values mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.data
                .as_mut()
                .map(move |v| (SlotKey::new(i as u32, generation), v))
        })
    }

    /// Remove every live value, in slot order.
    pub fn drain(&mut self) -> Vec<(SlotKey, T)> {
        let keys: Vec<SlotKey> = self.iter().map(|(k, _)| k).collect();
        keys.into_iter()
            .filter_map(|k| self.remove(k).map(|v| (k, v)))
            .collect()
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_get_round_trip() {
        let mut map = SlotMap::new();
        let k = map.insert(42i32);
        assert_eq!(map.get(k), Some(&42));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_mut_modifies_value() {
        let mut map = SlotMap::new();
        let k = map.insert(10i32);
        *map.get_mut(k).unwrap() = 20;
        assert_eq!(map.get(k), Some(&20));
    }

    #[test]
    fn stale_generation_returns_none() {
        let mut map = SlotMap::new();
        let k = map.insert(1i32);
        assert_eq!(map.remove(k), Some(1));
        assert_eq!(map.get(k), None);
        assert_eq!(map.get_mut(k), None);
        assert!(!map.contains(k));
    }

    #[test]
    fn double_remove_returns_none() {
        let mut map = SlotMap::new();
        let k = map.insert(1i32);
        assert_eq!(map.remove(k), Some(1));
        assert_eq!(map.remove(k), None);
        assert!(map.is_empty());
    }

    #[test]
    fn was_removed_only_until_reuse() {
        let mut map = SlotMap::new();
        let k = map.insert(1u8);
        assert!(!map.was_removed(k));
        map.remove(k);
        assert!(map.was_removed(k));
        let k2 = map.insert(2u8);
        assert!(!map.was_removed(k));
        map.remove(k2);
        assert!(!map.was_removed(k));
        assert!(map.was_removed(k2));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut map = SlotMap::new();
        let k1 = map.insert(1i32);
        map.remove(k1);
        let k2 = map.insert(2i32);
        assert_eq!(k1.index, k2.index);
        assert_eq!(k2.generation.0, k1.generation.0 + 1);
        assert_eq!(map.get(k1), None);
        assert_eq!(map.get(k2), Some(&2));
    }

    #[test]
    fn key_at_reports_live_occupant_only() {
        let mut map = SlotMap::new();
        let k = map.insert("a");
        assert_eq!(map.key_at(k.index), Some(k));
        map.remove(k);
        assert_eq!(map.key_at(k.index), None);
        assert_eq!(map.key_at(SlotIndex(99)), None);
    }

    #[test]
    fn iter_is_slot_ordered() {
        let mut map = SlotMap::new();
        let a = map.insert('a');
        let b = map.insert('b');
        let c = map.insert('c');
        map.remove(b);
        let d = map.insert('d'); // reuses b's slot
        let seen: Vec<_> = map.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(seen, vec![(a, 'a'), (d, 'd'), (c, 'c')]);
    }

    #[test]
    fn drain_empties_and_invalidates() {
        let mut map = SlotMap::new();
        let a = map.insert(1);
        let b = map.insert(2);
        let drained = map.drain();
        assert_eq!(drained, vec![(a, 1), (b, 2)]);
        assert!(map.is_empty());
        assert!(!map.contains(a));
    }

    #[test]
    fn generation_exhaustion_retires_slot() {
        let mut map = SlotMap::new();
        let k = map.insert(1i32);
        map.remove(k);

        map.slots[0].generation = u32::MAX;
        let k_last = map.insert(2i32);
        assert_eq!(k_last.generation.0, u32::MAX);

        // Wraps to 0: the slot must not be recycled.
        map.remove(k_last);
        assert_eq!(map.retired_count(), 1);
        assert!(!map.free_list.contains(&0));
        assert_eq!(map.get(SlotKey::new(0, 0)), None);

        let fresh = map.insert(3i32);
        assert_ne!(fresh.index.0, 0, "retired slot must not be reused");
    }

    proptest! {
        #[test]
        fn removed_keys_never_resolve_again(
            ops in proptest::collection::vec(any::<bool>(), 1..64),
        ) {
            let mut map = SlotMap::new();
            let mut live: Vec<SlotKey> = Vec::new();
            let mut dead: Vec<SlotKey> = Vec::new();
            for (i, insert) in ops.into_iter().enumerate() {
                if insert || live.is_empty() {
                    live.push(map.insert(i));
                } else {
                    let k = live.remove(i % live.len());
                    prop_assert!(map.remove(k).is_some());
                    dead.push(k);
                }
            }
            for k in &dead {
                prop_assert!(map.get(*k).is_none());
            }
            for k in &live {
                prop_assert!(map.get(*k).is_some());
            }
            prop_assert_eq!(map.len(), live.len());
        }
    }
}
