//! Recoverable error types shared across the workspace.
//!
//! Only soft failures live here. Stale references are not errors at all
//! (resolution simply yields `None`), and invariant violations panic at the
//! point of detection.

use std::error::Error;
use std::fmt;

/// Errors from fixed-capacity reference arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// The array is full; the offered reference was dropped.
    Overflow {
        /// The array's fixed capacity.
        capacity: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { capacity } => {
                write!(f, "entity array overflow: capacity {capacity} reached")
            }
        }
    }
}

impl Error for ArrayError {}
