//! The top-level runtime handle.

use std::future::Future;
use std::rc::Rc;

use tracing::debug;

use skein_arena::BoxedEntity;
use skein_core::{EventId, FrameId, TaskHandle};

use crate::config::{ConfigError, RuntimeConfig};
use crate::context::TaskContext;
use crate::event::{EventKind, EventSnapshot, EventStatus};
use crate::metrics::{FrameMetrics, RuntimeStats};
use crate::sched::Scheduler;
use crate::task::{ArgBlock, TaskDef, Termination};
use crate::world::World;

/// A cooperative task runtime and the entity arena it drives.
///
/// Created at simulation start, stepped once per frame with
/// [`run_frame`](Self::run_frame), and torn down with
/// [`finish`](Self::finish) (also run on drop).
///
/// Tasks invoked here are root tasks. Work triggered outside a frame
/// (invokes, signals, cancellations) is fully processed before the call
/// returns: woken tasks run and canceled tasks are finalized.
pub struct Runtime {
    sched: Rc<Scheduler>,
}

impl Runtime {
    /// Build a runtime after validating `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            task_capacity = config.initial_task_capacity,
            event_capacity = config.initial_event_capacity,
            trace = config.trace_resumptions,
            "runtime created"
        );
        Ok(Self {
            sched: Scheduler::new(&config),
        })
    }

    /// The last frame run (0 before the first).
    pub fn frame(&self) -> FrameId {
        self.sched.state.borrow().frame
    }

    /// Advance one frame.
    ///
    /// # Panics
    ///
    /// Panics if called after [`finish`](Self::finish).
    pub fn run_frame(&mut self) -> FrameMetrics {
        assert!(!self.sched.state.borrow().finished, "run_frame after finish");
        self.sched.run_frame()
    }

    // ── Tasks ──────────────────────────────────────────────────────

    /// Start a root task, running it to its first suspension point.
    pub fn invoke<D: TaskDef>(&mut self, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(None, 0, args)
    }

    /// Start an ad-hoc root task from a closure.
    pub fn invoke_with<A, F, Fut>(&mut self, name: &'static str, args: A, body: F) -> TaskHandle
    where
        A: 'static,
        F: FnOnce(TaskContext, ArgBlock<A>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.sched.spawn_with(name, None, 0, args, body)
    }

    /// Start a root task whose first run happens `delay` frames from now.
    pub fn invoke_delayed<D: TaskDef>(&mut self, delay: u32, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(None, delay, args)
    }

    /// Start a root task that runs `D`'s body only if `event` is signaled.
    pub fn invoke_when<D: TaskDef>(&mut self, event: EventId, args: D::Args) -> TaskHandle {
        self.sched.spawn_on_event::<D>(None, event, true, args)
    }

    /// Start a root task that runs `D`'s body once `event` resolves.
    pub fn invoke_after<D: TaskDef>(&mut self, event: EventId, args: D::Args) -> TaskHandle {
        self.sched.spawn_on_event::<D>(None, event, false, args)
    }

    /// Cancel a task and its subtree; finalizers run before this returns.
    pub fn cancel(&mut self, h: TaskHandle) -> bool {
        let canceled = self.sched.state.borrow_mut().cancel_tree(h);
        self.sched.settle_if_idle();
        canceled
    }

    /// Cancel `target` once `event` is signaled.
    pub fn cancel_task_when(&mut self, event: EventId, target: TaskHandle) -> Option<TaskHandle> {
        self.sched.spawn_canceler(event, target, true)
    }

    /// Cancel `target` once `event` is signaled or canceled.
    pub fn cancel_task_after(&mut self, event: EventId, target: TaskHandle) -> Option<TaskHandle> {
        self.sched.spawn_canceler(event, target, false)
    }

    /// Whether `h` names a live, non-terminating task.
    pub fn is_task_alive(&self, h: TaskHandle) -> bool {
        self.sched.state.borrow().is_live_task(h)
    }

    /// Debug label of a task that has not been reclaimed yet.
    pub fn task_name(&self, h: TaskHandle) -> Option<&'static str> {
        self.sched.state.borrow().task(h).map(|r| r.name)
    }

    /// How a task ended, while it awaits reclamation. `None` for live or
    /// reclaimed tasks.
    pub fn termination(&self, h: TaskHandle) -> Option<Termination> {
        self.sched.state.borrow().task(h).and_then(|r| r.termination)
    }

    /// Number of tasks not yet reclaimed.
    pub fn task_count(&self) -> usize {
        self.sched.state.borrow().tasks.len()
    }

    /// The finished event of a task that has not been reclaimed yet.
    pub fn finished_event(&self, h: TaskHandle) -> Option<EventId> {
        self.sched.state.borrow().task(h).map(|r| r.finished_event)
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Create a free-standing event.
    pub fn create_event(&mut self, kind: EventKind) -> EventId {
        self.sched.state.borrow_mut().create_event(kind)
    }

    /// Signal `event`; woken tasks run before this returns.
    pub fn signal(&mut self, event: EventId) -> bool {
        let fired = self.sched.state.borrow_mut().signal_event(event);
        self.sched.settle_if_idle();
        fired
    }

    /// Signal `event` only if it has never been signaled.
    pub fn signal_once(&mut self, event: EventId) -> bool {
        let fired = self.sched.state.borrow_mut().signal_event_once(event);
        self.sched.settle_if_idle();
        fired
    }

    /// Cancel `event`; woken tasks run before this returns.
    pub fn cancel_event(&mut self, event: EventId) -> bool {
        let canceled = self.sched.state.borrow_mut().cancel_event(event);
        self.sched.settle_if_idle();
        canceled
    }

    /// Capture `event`'s current state.
    pub fn snapshot(&self, event: EventId) -> EventSnapshot {
        self.sched.state.borrow().snapshot(event)
    }

    /// What happened to an event since `snapshot`.
    pub fn poll(&self, snapshot: EventSnapshot) -> EventStatus {
        self.sched.state.borrow().poll_event(snapshot)
    }

    // ── Entities ───────────────────────────────────────────────────

    /// Run `f` with access to the entity arena. Hooks triggered by
    /// despawns are processed before this returns.
    pub fn with_world<R>(&mut self, f: impl FnOnce(&mut World<'_>) -> R) -> R {
        let result = {
            let mut st = self.sched.state.borrow_mut();
            let mut world = World::new(&mut st);
            f(&mut world)
        };
        self.sched.settle_if_idle();
        result
    }

    /// Create an event canceled when `entity` is despawned.
    pub fn entity_event(&mut self, entity: impl Into<BoxedEntity>, kind: EventKind) -> Option<EventId> {
        self.sched.state.borrow_mut().entity_event(entity.into(), kind)
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Metrics of the most recent frame.
    pub fn last_metrics(&self) -> FrameMetrics {
        self.sched.state.borrow().last_metrics.clone()
    }

    /// Lifetime totals.
    pub fn stats(&self) -> RuntimeStats {
        self.sched.state.borrow().stats.clone()
    }

    /// Digest of every resumption so far, if tracing is enabled.
    pub fn trace_hash(&self) -> Option<u64> {
        self.sched.state.borrow().trace.as_ref().map(|t| t.hash())
    }

    /// Number of resumptions folded into [`trace_hash`](Self::trace_hash).
    pub fn trace_len(&self) -> Option<u64> {
        self.sched.state.borrow().trace.as_ref().map(|t| t.len())
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Tear everything down.
    ///
    /// Every event some task is waiting on is canceled first, so waiters
    /// run their cancellation paths. Then every remaining task is canceled
    /// and finalized, and finally every entity is despawned. Tasks invoked
    /// during or after teardown are born canceled. Idempotent.
    pub fn finish(&mut self) {
        self.sched.finish();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            sched: Scheduler::new(&RuntimeConfig::default()),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        self.finish();
    }
}
