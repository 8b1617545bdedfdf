//! Benchmark workloads for the Skein task runtime.
//!
//! Provides pre-built workloads for benchmarking:
//!
//! - [`spawn_swarm`]: many short-lived bullet tasks, each hosting and
//!   moving one entity, with seeded lifetimes
//! - [`spawn_fan_out`]: many tasks repeatedly waiting on one event
//! - [`swarm_lifetimes`]: the deterministic lifetime draw behind the swarm

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use skein_core::{Entity, EntityKind, EventId, TaskHandle};
use skein_engine::{ArgBlock, EventKind, Runtime, TaskContext, TaskDef};

/// Longest lifetime a swarm bullet can draw, in frames.
pub const MAX_LIFETIME: u32 = 120;

/// A moving projectile.
#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    /// Position.
    pub pos: (f32, f32),
    /// Velocity per frame.
    pub vel: (f32, f32),
}

impl Entity for Bullet {
    const KIND: EntityKind = EntityKind::Projectile;
}

/// Arguments of [`BulletTask`].
pub struct BulletArgs {
    /// Frames to live.
    pub lifetime: u32,
    /// Initial velocity.
    pub vel: (f32, f32),
}

/// Hosts one [`Bullet`], moves it once per frame, and returns after its
/// lifetime runs out.
pub struct BulletTask;

impl TaskDef for BulletTask {
    type Args = BulletArgs;
    const NAME: &'static str = "bullet";

    fn body(ctx: TaskContext, args: ArgBlock<BulletArgs>) -> impl std::future::Future<Output = ()> + 'static {
        async move {
            let (lifetime, vel) = args.with(|a| (a.lifetime, a.vel));
            let bullet = ctx.bind(ctx.host_entity(Bullet { pos: (0.0, 0.0), vel }));
            for _ in 0..lifetime {
                ctx.with_world(|w| {
                    if let Some(b) = w.get_mut(bullet) {
                        b.pos.0 += b.vel.0;
                        b.pos.1 += b.vel.1;
                    }
                });
                ctx.yield_now().await;
            }
        }
    }
}

/// Deterministic per-bullet lifetimes in `1..=MAX_LIFETIME`.
pub fn swarm_lifetimes(count: usize, seed: u64) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| 1 + rng.next_u32() % MAX_LIFETIME).collect()
}

/// Invoke `count` bullet tasks as roots.
pub fn spawn_swarm(rt: &mut Runtime, count: usize, seed: u64) -> Vec<TaskHandle> {
    swarm_lifetimes(count, seed)
        .into_iter()
        .enumerate()
        .map(|(i, lifetime)| {
            let angle = i as f32 * 0.1;
            rt.invoke::<BulletTask>(BulletArgs {
                lifetime,
                vel: (angle.cos(), angle.sin()),
            })
        })
        .collect()
}

/// Create a repeatable event and `waiters` tasks that wait on it forever.
pub fn spawn_fan_out(rt: &mut Runtime, waiters: usize) -> EventId {
    let event = rt.create_event(EventKind::Repeatable);
    for _ in 0..waiters {
        rt.invoke_with("listener", (), move |ctx, _| async move {
            loop {
                ctx.wait_event(event).await;
            }
        });
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_engine::RuntimeConfig;

    #[test]
    fn swarm_lifetimes_deterministic_and_bounded() {
        let a = swarm_lifetimes(256, 42);
        let b = swarm_lifetimes(256, 42);
        assert_eq!(a, b);
        assert!(a.iter().all(|l| (1..=MAX_LIFETIME).contains(l)));
    }

    #[test]
    fn swarm_drains_after_longest_lifetime() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        spawn_swarm(&mut rt, 64, 7);
        assert_eq!(rt.task_count(), 64);
        assert_eq!(rt.with_world(|w| w.arena().len()), 64);
        for _ in 0..MAX_LIFETIME {
            rt.run_frame();
        }
        assert_eq!(rt.task_count(), 0);
        assert_eq!(rt.with_world(|w| w.arena().len()), 0);
    }

    #[test]
    fn fan_out_wakes_every_listener() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let event = spawn_fan_out(&mut rt, 100);
        rt.run_frame();
        let resumed_before = rt.stats().tasks_resumed;
        rt.signal(event);
        assert_eq!(rt.stats().tasks_resumed, resumed_before + 100);
        assert_eq!(rt.task_count(), 100);
    }
}
