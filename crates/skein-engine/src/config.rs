//! Runtime configuration, validation, and error types.
//!
//! [`RuntimeConfig`] is the input to [`Runtime::new`](crate::Runtime::new).
//! [`validate()`](RuntimeConfig::validate) runs first; a config that fails
//! never produces a runtime.

use std::error::Error;
use std::fmt;

use skein_arena::ArenaConfig;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`RuntimeConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A capacity exceeds the `u32` slot index space.
    CapacityOverflow {
        /// Which setting overflowed.
        field: &'static str,
        /// The configured value.
        value: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { field, value } => {
                write!(f, "{field} {value} exceeds u32::MAX")
            }
        }
    }
}

impl Error for ConfigError {}

// ── RuntimeConfig ──────────────────────────────────────────────────

/// Complete configuration for a [`Runtime`](crate::Runtime).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Entity arena settings.
    pub arena: ArenaConfig,
    /// Task slots reserved up front. Default: 256.
    pub initial_task_capacity: usize,
    /// Event slots reserved up front. Default: 256.
    pub initial_event_capacity: usize,
    /// Fold every resumption into [`Runtime::trace_hash`](crate::Runtime::trace_hash).
    /// Default: false.
    pub trace_resumptions: bool,
}

impl RuntimeConfig {
    /// Default number of pre-reserved task slots.
    pub const DEFAULT_TASK_CAPACITY: usize = 256;
    /// Default number of pre-reserved event slots.
    pub const DEFAULT_EVENT_CAPACITY: usize = 256;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limit = u32::MAX as usize;
        for (field, value) in [
            ("arena.initial_capacity", self.arena.initial_capacity),
            ("initial_task_capacity", self.initial_task_capacity),
            ("initial_event_capacity", self.initial_event_capacity),
        ] {
            if value > limit {
                return Err(ConfigError::CapacityOverflow { field, value });
            }
        }
        Ok(())
    }

    /// Same config with resumption tracing switched on.
    pub fn with_trace(mut self) -> Self {
        self.trace_resumptions = true;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            initial_task_capacity: Self::DEFAULT_TASK_CAPACITY,
            initial_event_capacity: Self::DEFAULT_EVENT_CAPACITY,
            trace_resumptions: false,
        }
    }
}
