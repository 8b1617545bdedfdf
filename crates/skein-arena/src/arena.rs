//! The entity arena.

use std::any::Any;

use smallvec::SmallVec;
use tracing::trace;

use skein_core::{Entity, EntityKind, SlotIndex, SlotKey};

use crate::boxed::{Boxed, BoxedEntity};
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::slot::SlotMap;

/// Work the runtime must do when an entity is despawned.
///
/// The arena never interprets these; it stores them with the entity and
/// returns them from [`EntityArena::despawn`] so the owner can act on them
/// in the same instant the entity's references go stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DespawnHook {
    /// Cancel the task with this key (a task bound to the entity).
    CancelTask(SlotKey),
    /// Cancel the event with this key (an event hosted by the entity).
    CancelEvent(SlotKey),
}

struct EntitySlot {
    kind: EntityKind,
    value: Box<dyn Any>,
    hooks: SmallVec<[DespawnHook; 2]>,
}

/// An entity removed from the arena.
pub struct Despawned {
    /// The (now stale) reference the entity lived under.
    pub key: BoxedEntity,
    /// The entity's kind.
    pub kind: EntityKind,
    /// The entity value itself.
    pub value: Box<dyn Any>,
    /// Hooks registered against the entity, in registration order.
    pub hooks: SmallVec<[DespawnHook; 2]>,
}

impl Despawned {
    /// Recover the concrete entity value.
    pub fn downcast<T: Entity>(self) -> Option<T> {
        self.value.downcast::<T>().ok().map(|b| *b)
    }
}

/// Owner of every simulation entity.
///
/// Entities are addressed only through [`Boxed`] / [`BoxedEntity`]
/// references. All lookups are O(1) and never panic on stale input.
pub struct EntityArena {
    slots: SlotMap<EntitySlot>,
}

impl EntityArena {
    /// Create an empty arena.
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            slots: SlotMap::with_capacity(config.initial_capacity),
        }
    }

    /// Store an entity and return a reference to it.
    pub fn spawn<T: Entity>(&mut self, value: T) -> Boxed<T> {
        let key = self.slots.insert(EntitySlot {
            kind: T::KIND,
            value: Box::new(value),
            hooks: SmallVec::new(),
        });
        trace!(kind = %T::KIND, %key, "entity spawned");
        Boxed::new(key)
    }

    /// Resolve a typed reference.
    pub fn get<T: Entity>(&self, r: Boxed<T>) -> Option<&T> {
        self.slots.get(r.key())?.value.downcast_ref::<T>()
    }

    /// Resolve a typed reference mutably.
    pub fn get_mut<T: Entity>(&mut self, r: Boxed<T>) -> Option<&mut T> {
        self.slots.get_mut(r.key())?.value.downcast_mut::<T>()
    }

    /// Resolve an untyped reference.
    pub fn get_dyn(&self, r: BoxedEntity) -> Option<&dyn Any> {
        self.slots.get(r.key()).map(|s| s.value.as_ref())
    }

    /// Whether the reference names a live entity.
    pub fn is_alive(&self, r: impl Into<BoxedEntity>) -> bool {
        self.slots.contains(r.into().key())
    }

    /// Kind of the referenced entity, if it is alive.
    pub fn kind_of(&self, r: impl Into<BoxedEntity>) -> Option<EntityKind> {
        self.slots.get(r.into().key()).map(|s| s.kind)
    }

    /// Recover a typed reference from an untyped one.
    pub fn downcast<T: Entity>(&self, r: BoxedEntity) -> Result<Boxed<T>, ArenaError> {
        let key = r.key();
        let slot = self
            .slots
            .get(key)
            .ok_or(ArenaError::StaleReference { key })?;
        if slot.value.is::<T>() {
            Ok(Boxed::new(key))
        } else {
            Err(ArenaError::KindMismatch {
                key,
                expected: T::KIND,
                found: slot.kind,
            })
        }
    }

    /// Build a reference to whatever entity currently occupies `index`.
    ///
    /// Returns `None` for an empty slot. Asking for a dead slot is a caller
    /// bug and trips a debug assertion.
    pub fn box_slot(&self, index: SlotIndex) -> Option<BoxedEntity> {
        let key = self.slots.key_at(index);
        debug_assert!(key.is_some(), "box_slot({index}) on a dead slot");
        key.map(BoxedEntity::from_key)
    }

    /// Register a hook to hand back when the entity is despawned.
    pub fn add_hook(&mut self, r: impl Into<BoxedEntity>, hook: DespawnHook) -> Result<(), ArenaError> {
        let key = r.into().key();
        let slot = self
            .slots
            .get_mut(key)
            .ok_or(ArenaError::StaleReference { key })?;
        slot.hooks.push(hook);
        Ok(())
    }

    /// Remove a hook previously registered with [`add_hook`](Self::add_hook).
    ///
    /// A no-op if the entity is gone or the hook is not present.
    pub fn remove_hook(&mut self, r: impl Into<BoxedEntity>, hook: DespawnHook) {
        if let Some(slot) = self.slots.get_mut(r.into().key()) {
            if let Some(pos) = slot.hooks.iter().position(|h| *h == hook) {
                slot.hooks.remove(pos);
            }
        }
    }

    /// Remove an entity.
    ///
    /// Every outstanding reference to it stops resolving immediately. The
    /// returned [`Despawned`] carries the value and its hooks.
    ///
    /// A reference whose slot has since been reused is stale.
    ///
    /// # Panics
    ///
    /// Panics if the entity was already despawned and its slot is still
    /// free: that is a double free, not a stale reference.
    pub fn despawn(&mut self, r: impl Into<BoxedEntity>) -> Result<Despawned, ArenaError> {
        let key = r.into().key();
        let Some(slot) = self.slots.remove(key) else {
            assert!(!self.slots.was_removed(key), "entity {key} despawned twice");
            return Err(ArenaError::StaleReference { key });
        };
        trace!(kind = %slot.kind, %key, hooks = slot.hooks.len(), "entity despawned");
        Ok(Despawned {
            key: BoxedEntity::from_key(key),
            kind: slot.kind,
            value: slot.value,
            hooks: slot.hooks,
        })
    }

    /// Live entities of type `T`, in slot order.
    pub fn iter<T: Entity>(&self) -> impl Iterator<Item = (Boxed<T>, &T)> {
        self.slots
            .iter()
            .filter_map(|(key, s)| s.value.downcast_ref::<T>().map(|v| (Boxed::new(key), v)))
    }

    /// References to every live entity of `kind`, in slot order.
    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = BoxedEntity> + '_ {
        self.slots
            .iter()
            .filter(move |(_, s)| s.kind == kind)
            .map(|(key, _)| BoxedEntity::from_key(key))
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena holds no entities.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots retired by generation exhaustion.
    pub fn retired_slots(&self) -> usize {
        self.slots.retired_count()
    }

    /// Despawn everything, in slot order, returning the removed entities.
    pub fn clear(&mut self) -> Vec<Despawned> {
        self.slots
            .drain()
            .into_iter()
            .map(|(key, slot)| Despawned {
                key: BoxedEntity::from_key(key),
                kind: slot.kind,
                value: slot.value,
                hooks: slot.hooks,
            })
            .collect()
    }
}

impl Default for EntityArena {
    fn default() -> Self {
        Self::new(&ArenaConfig::default())
    }
}
