//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use skein_core::{EntityKind, SlotKey};

/// Errors that can occur during arena operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The reference no longer names a live entity: its slot has been
    /// reused, or it never named one.
    StaleReference {
        /// The key that failed to resolve.
        key: SlotKey,
    },
    /// The entity is alive but is not of the requested type.
    KindMismatch {
        /// The key that was resolved.
        key: SlotKey,
        /// Kind of the requested type.
        expected: EntityKind,
        /// Kind of the stored entity.
        found: EntityKind,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleReference { key } => write!(f, "stale entity reference {key}"),
            Self::KindMismatch {
                key,
                expected,
                found,
            } => write!(f, "entity {key} is a {found}, expected a {expected}"),
        }
    }
}

impl Error for ArenaError {}
