//! Skein: a frame-stepped cooperative task runtime for simulations and games.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Skein sub-crates. For most users, adding `skein` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use skein::prelude::*;
//!
//! struct Boss {
//!     hp: i32,
//! }
//!
//! impl Entity for Boss {
//!     const KIND: EntityKind = EntityKind::Boss;
//! }
//!
//! let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
//! let boss = rt.with_world(|w| w.spawn(Boss { hp: 30 }));
//! let death = rt.entity_event(boss, EventKind::OneShot).unwrap();
//!
//! // A phase that lasts until the boss dies.
//! let phase = rt.invoke_with("phase", (), move |ctx, _| async move {
//!     ctx.bind(boss);
//!     loop {
//!         ctx.with_world(|w| {
//!             if let Some(b) = w.get_mut(boss) {
//!                 b.hp -= 10;
//!             }
//!         });
//!         ctx.yield_now().await;
//!     }
//! });
//!
//! // An onlooker that reacts to the death.
//! rt.invoke_with("onlooker", (), move |ctx, _| async move {
//!     assert_eq!(ctx.wait_event(death).await, WaitOutcome::Canceled);
//! });
//!
//! for _ in 0..2 {
//!     rt.run_frame();
//! }
//! let hp = rt.with_world(|w| w.get(boss).map(|b| b.hp));
//! assert_eq!(hp, Some(0));
//!
//! rt.with_world(|w| w.despawn(boss)).unwrap();
//! assert!(!rt.is_task_alive(phase));
//! assert_eq!(rt.task_count(), 0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `skein-core` | Handles, frame ids, entity kinds, core errors |
//! | [`arena`] | `skein-arena` | Entity arena, weak references, `EntityArray` |
//! | [`engine`] | `skein-engine` | Runtime, task contexts, events, suspension points |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers and traits (`skein-core`).
///
/// Contains [`types::TaskHandle`], [`types::EventId`], [`types::FrameId`],
/// the [`types::Entity`] trait, and [`types::EntityKind`].
pub use skein_core as types;

/// Entity storage (`skein-arena`).
///
/// [`arena::EntityArena`] owns every entity; [`arena::Boxed`] and
/// [`arena::BoxedEntity`] are the weak references into it, and
/// [`arena::EntityArray`] is the bounded list of references that tasks
/// use to track groups of entities.
pub use skein_arena as arena;

/// The task runtime (`skein-engine`).
pub use skein_engine as engine;

/// Common imports for typical Skein usage.
///
/// ```rust
/// use skein::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use skein_core::{Entity, EntityKind, EventId, FrameId, TaskHandle};

    // Entities
    pub use skein_arena::{Boxed, BoxedEntity, EntityArray};

    // Runtime
    pub use skein_engine::{
        ArgBlock, EventKind, EventStatus, Runtime, RuntimeConfig, TaskContext, TaskDef,
        Termination, WaitOutcome, World,
    };
}
