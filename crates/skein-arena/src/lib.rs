//! Generational entity storage for Skein simulations.
//!
//! Owns every simulation entity (bosses, enemies, projectiles, lasers and
//! generic hosted objects) and hands out weak references that can be
//! resolved back to the entity or to `None` once it is gone.
//!
//! # Architecture
//!
//! ```text
//! EntityArena
//! └── SlotMap<EntitySlot>          (slot vector + free list + generations)
//!     └── EntitySlot
//!         ├── Box<dyn Any>         (the entity value)
//!         ├── EntityKind
//!         └── DespawnHook[]        (handed back to the runtime on despawn)
//!
//! Boxed<T> / BoxedEntity           (slot, generation) keys, never own
//! EntityArray<T>                   bounded list of Boxed<T>, explicit compaction
//! ```
//!
//! # Staleness
//!
//! Despawning bumps the slot's generation immediately, so every outstanding
//! reference stops resolving in the same instant, not when the slot is
//! eventually reused. A slot whose generation would wrap is retired for
//! good instead of being recycled.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod array;
pub mod boxed;
pub mod config;
pub mod error;
pub mod slot;

pub use arena::{DespawnHook, Despawned, EntityArena};
pub use array::EntityArray;
pub use boxed::{Boxed, BoxedEntity};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use slot::SlotMap;
