//! Core types for the Skein cooperative task runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the arena and the scheduler: frame counters, the
//! raw `(slot, generation)` key every weak reference is built from, the
//! entity classification, and the recoverable error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, EntityKind};
pub use error::ArrayError;
pub use id::{EventId, FrameId, Generation, SlotIndex, SlotKey, TaskHandle};
