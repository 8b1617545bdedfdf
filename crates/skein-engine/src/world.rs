//! Scoped access to the entity arena.

use skein_arena::{ArenaError, Boxed, BoxedEntity, Despawned, EntityArena, EntityArray};
use skein_core::{Entity, EventId, FrameId, SlotIndex};

use crate::event::EventKind;
use crate::state::RuntimeState;

/// Mutable view of the simulation's entities.
///
/// Obtained through [`TaskContext::with_world`](crate::TaskContext::with_world)
/// or [`Runtime::with_world`](crate::Runtime::with_world). Despawning through
/// a `World` runs the entity's hooks: tasks bound to it are canceled and
/// events hosted by it are canceled, in the same instant its references go
/// stale.
pub struct World<'a> {
    state: &'a mut RuntimeState,
}

impl<'a> World<'a> {
    pub(crate) fn new(state: &'a mut RuntimeState) -> Self {
        Self { state }
    }

    /// The current frame.
    pub fn frame(&self) -> FrameId {
        self.state.frame
    }

    /// Store an entity and return a reference to it.
    pub fn spawn<T: Entity>(&mut self, value: T) -> Boxed<T> {
        self.state.arena.spawn(value)
    }

    /// Resolve a reference. `None` once the entity is gone.
    pub fn get<T: Entity>(&self, r: Boxed<T>) -> Option<&T> {
        self.state.arena.get(r)
    }

    /// Resolve a reference mutably.
    pub fn get_mut<T: Entity>(&mut self, r: Boxed<T>) -> Option<&mut T> {
        self.state.arena.get_mut(r)
    }

    /// Whether the reference names a live entity.
    pub fn is_alive(&self, r: impl Into<BoxedEntity>) -> bool {
        self.state.arena.is_alive(r)
    }

    /// Reference to the entity currently in slot `index`.
    pub fn box_slot(&self, index: SlotIndex) -> Option<BoxedEntity> {
        self.state.arena.box_slot(index)
    }

    /// Despawn an entity and run its hooks.
    pub fn despawn(&mut self, r: impl Into<BoxedEntity>) -> Result<Despawned, ArenaError> {
        self.state.despawn_entity(r.into())
    }

    /// Create an event that is canceled if `r` is despawned.
    ///
    /// Returns `None` if `r` is already dead.
    pub fn entity_event(&mut self, r: impl Into<BoxedEntity>, kind: EventKind) -> Option<EventId> {
        self.state.entity_event(r.into(), kind)
    }

    /// Mutate every live entity referenced by `array`, in insertion order.
    pub fn for_each_mut<T: Entity>(&mut self, array: &EntityArray<T>, f: impl FnMut(&mut T)) {
        array.for_each_mut(&mut self.state.arena, f);
    }

    /// Read-only access to the underlying arena.
    pub fn arena(&self) -> &EntityArena {
        &self.state.arena
    }
}
