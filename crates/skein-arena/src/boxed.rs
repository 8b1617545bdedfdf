//! Weak entity references.
//!
//! A [`Boxed<T>`] is a typed `(slot, generation)` pair; a [`BoxedEntity`] is
//! the same pair with the type erased. Neither owns anything, both are
//! `Copy`, and both outlive their referent harmlessly: resolving a reference
//! to a despawned entity yields `None`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use skein_core::{Entity, SlotKey};

/// Untyped weak reference to an arena entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxedEntity(SlotKey);

impl BoxedEntity {
    /// The underlying slot key.
    pub fn key(self) -> SlotKey {
        self.0
    }

    /// Wrap a raw slot key.
    ///
    /// The key is not checked; resolving it against an arena that never
    /// issued it simply yields `None`.
    pub fn from_key(key: SlotKey) -> Self {
        Self(key)
    }
}

impl fmt::Display for BoxedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}", self.0)
    }
}

/// Typed weak reference to an arena entity of type `T`.
///
/// The type parameter is a compile-time tag only; resolution additionally
/// checks the stored value's runtime type, so a `Boxed<T>` can never yield a
/// value of any other type.
pub struct Boxed<T> {
    key: SlotKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Boxed<T> {
    pub(crate) fn new(key: SlotKey) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// The underlying slot key.
    pub fn key(self) -> SlotKey {
        self.key
    }

    /// Forget the static type.
    pub fn erase(self) -> BoxedEntity {
        BoxedEntity(self.key)
    }
}

impl<T: Entity> From<Boxed<T>> for BoxedEntity {
    fn from(b: Boxed<T>) -> Self {
        b.erase()
    }
}

// Manual impls: derives would bound `T` itself.

impl<T> Clone for Boxed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Boxed<T> {}

impl<T> PartialEq for Boxed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Boxed<T> {}

impl<T> Hash for Boxed<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Boxed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boxed<{}>({})", std::any::type_name::<T>(), self.key)
    }
}
