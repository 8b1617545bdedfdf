//! Arena configuration parameters.

/// Configuration for the entity arena.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Number of entity slots reserved up front.
    ///
    /// Default: 1024. The arena grows past this on demand; the reservation
    /// only avoids reallocation during the first busy frames.
    pub initial_capacity: usize,
}

impl ArenaConfig {
    /// Default number of pre-reserved entity slots.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

    /// Create a config with the given initial capacity.
    pub fn new(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CAPACITY)
    }
}
