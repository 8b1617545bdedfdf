//! Entity classification.
//!
//! The runtime does not care what an entity *is*; it only needs to store it,
//! hand out weak references to it, and tell a boss apart from a projectile
//! when a typed reference is resolved.

use std::any::Any;
use std::fmt;

/// The polymorphic families of simulation entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// A boss: long-lived, owns attack choreography events.
    Boss,
    /// A regular enemy.
    Enemy,
    /// A bullet or other point projectile.
    Projectile,
    /// A laser beam.
    Laser,
    /// Anything else hosted in the arena (helpers, effects, markers).
    Generic,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Boss,
        EntityKind::Enemy,
        EntityKind::Projectile,
        EntityKind::Laser,
        EntityKind::Generic,
    ];

    /// Lowercase name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boss => "boss",
            Self::Enemy => "enemy",
            Self::Projectile => "projectile",
            Self::Laser => "laser",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type that can live in the entity arena.
///
/// Implementors are plain data; the arena owns them and the rest of the
/// simulation refers to them only through generational references.
///
/// ```
/// use skein_core::{Entity, EntityKind};
///
/// struct Fairy {
///     hp: f32,
/// }
///
/// impl Entity for Fairy {
///     const KIND: EntityKind = EntityKind::Enemy;
/// }
/// # let _ = Fairy { hp: 1.0 }.hp;
/// ```
pub trait Entity: Any {
    /// Which family this type belongs to.
    const KIND: EntityKind;
}
