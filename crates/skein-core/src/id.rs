//! Strongly-typed identifiers.

use std::fmt;

/// Monotonically increasing frame counter.
///
/// Frame 0 is the state before the first `run_frame` call; every call
/// advances the counter by one before any task is resumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The frame `n` frames after this one.
    pub fn after(self, n: u32) -> Self {
        Self(self.0 + u64::from(n))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FrameId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Index of a slot within a generational slot map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u32);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Per-slot reuse counter.
///
/// Bumped every time the occupant of a slot is removed, so a key captured
/// before the removal can never match the slot again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u32);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(slot, generation)` pair.
///
/// This is a pure lookup key: it never owns the value it names and stays
/// `Copy` regardless of what the slot holds. Resolution succeeds only while
/// the slot's current generation equals the stored one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    /// Slot the value was stored in.
    pub index: SlotIndex,
    /// Generation of the slot when the key was issued.
    pub generation: Generation,
}

impl SlotKey {
    /// Build a key from raw parts.
    pub fn new(index: u32, generation: u32) -> Self {
        Self {
            index: SlotIndex(index),
            generation: Generation(generation),
        }
    }

    /// Pack into a single `u64` (upper 32 bits = slot, lower 32 = generation).
    pub fn to_bits(self) -> u64 {
        (u64::from(self.index.0) << 32) | u64::from(self.generation.0)
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: u64) -> Self {
        Self::new((bits >> 32) as u32, bits as u32)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index.0, self.generation.0)
    }
}

/// Generational handle to a task.
///
/// Stays valid as a lookup key after the task is reclaimed; queries against
/// a reclaimed task report it as dead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub SlotKey);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {}", self.0)
    }
}

/// Generational handle to an event.
///
/// A handle whose event has been canceled no longer resolves; every
/// operation treats it as a canceled event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub SlotKey);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn frame_after_adds() {
        assert_eq!(FrameId(10).after(5), FrameId(15));
        assert_eq!(FrameId(10).after(0), FrameId(10));
    }

    #[test]
    fn key_display() {
        assert_eq!(SlotKey::new(3, 7).to_string(), "3v7");
    }

    proptest! {
        #[test]
        fn key_bits_are_lossless(index in any::<u32>(), generation in any::<u32>()) {
            let key = SlotKey::new(index, generation);
            prop_assert_eq!(SlotKey::from_bits(key.to_bits()), key);
        }
    }
}
