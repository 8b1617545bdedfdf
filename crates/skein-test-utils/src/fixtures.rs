//! Reusable entity and task fixtures.
//!
//! Entities, one per [`EntityKind`]:
//!
//! - [`Boss`], [`Enemy`], [`Projectile`], [`Laser`], [`Marker`].
//!
//! Tasks:
//!
//! - [`Sleeper`]: records the frame of each wake-up, `repeats` times.
//! - [`EventWaiter`]: waits on one event and records the outcome.
//! - [`Witness`]: records its finalizer run, then stalls.

use skein_core::{Entity, EntityKind, EventId};
use skein_engine::{ArgBlock, TaskContext, TaskDef, WaitOutcome};

use crate::Journal;

// ── Entities ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Boss {
    pub name: &'static str,
    pub hp: i32,
}

impl Entity for Boss {
    const KIND: EntityKind = EntityKind::Boss;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub hp: i32,
}

impl Entity for Enemy {
    const KIND: EntityKind = EntityKind::Enemy;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub pos: (f32, f32),
    pub vel: (f32, f32),
}

impl Projectile {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            pos: (x, y),
            vel: (0.0, 0.0),
        }
    }
}

impl Entity for Projectile {
    const KIND: EntityKind = EntityKind::Projectile;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Laser {
    pub length: f32,
}

impl Entity for Laser {
    const KIND: EntityKind = EntityKind::Laser;
}

/// A generic hosted object carrying a tag.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker(pub u32);

impl Entity for Marker {
    const KIND: EntityKind = EntityKind::Generic;
}

// ── Tasks ──────────────────────────────────────────────────────────

pub struct SleeperArgs {
    pub interval: u32,
    pub repeats: u32,
    pub journal: Journal<u64>,
}

/// Waits `interval` frames `repeats` times, recording the frame after
/// each wait.
pub struct Sleeper;

impl TaskDef for Sleeper {
    type Args = SleeperArgs;
    const NAME: &'static str = "sleeper";

    fn body(ctx: TaskContext, args: ArgBlock<SleeperArgs>) -> impl std::future::Future<Output = ()> + 'static {
        async move {
            let (interval, repeats, journal) =
                args.with(|a| (a.interval, a.repeats, a.journal.clone()));
            for _ in 0..repeats {
                ctx.wait(interval).await;
                journal.push(ctx.frame().0);
            }
        }
    }
}

pub struct WaiterArgs {
    pub tag: u32,
    pub event: EventId,
    pub journal: Journal<(u32, WaitOutcome, u64)>,
}

/// Waits on one event and records `(tag, outcome, frame)`.
pub struct EventWaiter;

impl TaskDef for EventWaiter {
    type Args = WaiterArgs;
    const NAME: &'static str = "event_waiter";

    fn body(ctx: TaskContext, args: ArgBlock<WaiterArgs>) -> impl std::future::Future<Output = ()> + 'static {
        async move {
            let (tag, event, journal) = args.with(|a| (a.tag, a.event, a.journal.clone()));
            let outcome = ctx.wait_event(event).await;
            journal.push((tag, outcome, ctx.frame().0));
        }
    }
}

pub struct WitnessArgs {
    pub tag: &'static str,
    pub journal: Journal<&'static str>,
}

/// Records `tag` when finalized. Never finishes on its own.
pub struct Witness;

impl TaskDef for Witness {
    type Args = WitnessArgs;
    const NAME: &'static str = "witness";

    fn body(ctx: TaskContext, args: ArgBlock<WitnessArgs>) -> impl std::future::Future<Output = ()> + 'static {
        async move {
            ctx.finalize_with_args(&args, |a| a.journal.push(a.tag));
            ctx.stall().await;
        }
    }
}
