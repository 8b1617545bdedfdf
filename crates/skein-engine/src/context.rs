//! The handle task bodies use to talk to the runtime.

use std::future::Future;
use std::rc::Rc;

use tracing::warn;

use skein_arena::{Boxed, DespawnHook};
use skein_core::{Entity, EventId, FrameId, TaskHandle};

use crate::event::{EventKind, EventSnapshot, EventStatus, WaitOutcome};
use crate::sched::Scheduler;
use crate::task::{ArgBlock, TaskDef};
use crate::wait::{Stall, WaitEvent, WaitFrames, WaitSubtasks};
use crate::world::World;

/// A task's view of the runtime.
///
/// Every task body receives one. It is cheap to clone and identifies the
/// task it was created for: subtasks invoked through it become that task's
/// children, and suspension calls suspend that task.
///
/// Suspension calls (`wait*`, `yield_now`, `stall`) must be awaited from
/// the owning task's own body. Anything else panics.
#[derive(Clone)]
pub struct TaskContext {
    pub(crate) sched: Rc<Scheduler>,
    pub(crate) handle: TaskHandle,
}

impl TaskContext {
    pub(crate) fn new(sched: Rc<Scheduler>, handle: TaskHandle) -> Self {
        Self { sched, handle }
    }

    /// This task's handle.
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// The current frame.
    pub fn frame(&self) -> FrameId {
        self.sched.state.borrow().frame
    }

    /// Whether this task has been canceled (or has already finished).
    pub fn is_canceled(&self) -> bool {
        !self.sched.state.borrow().is_live_task(self.handle)
    }

    /// Whether `h` names a live, non-terminating task.
    pub fn is_alive(&self, h: TaskHandle) -> bool {
        self.sched.state.borrow().is_live_task(h)
    }

    /// Whether any child, live or awaiting finalization, is still linked.
    pub(crate) fn has_children(&self) -> bool {
        self.sched
            .state
            .borrow()
            .task(self.handle)
            .is_some_and(|rec| !rec.children.is_empty())
    }

    // ── Suspension ─────────────────────────────────────────────────

    /// Suspend for exactly `frames` frames. `wait(0)` returns immediately.
    ///
    /// Called during frame `F`, the task resumes during frame `F + frames`.
    pub fn wait(&self, frames: u32) -> WaitFrames<'_> {
        WaitFrames::new(self, frames)
    }

    /// Suspend until the next frame.
    pub fn yield_now(&self) -> WaitFrames<'_> {
        WaitFrames::new(self, 1)
    }

    /// Suspend until `event` is signaled or canceled.
    ///
    /// Waiters resume in the order they began waiting. A canceled event
    /// completes immediately with [`WaitOutcome::Canceled`]; a one-shot
    /// event that already fired completes immediately with
    /// [`WaitOutcome::Signaled`].
    pub fn wait_event(&self, event: EventId) -> WaitEvent<'_> {
        WaitEvent::new(self, event, false)
    }

    /// Like [`wait_event`](Self::wait_event), but completes immediately if
    /// the event has ever been signaled.
    pub fn wait_event_once(&self, event: EventId) -> WaitEvent<'_> {
        WaitEvent::new(self, event, true)
    }

    /// Wait for `event`; if it is canceled, cancel this task instead of
    /// returning.
    pub async fn wait_event_or_die(&self, event: EventId) {
        if self.wait_event(event).await == WaitOutcome::Canceled {
            self.cancel_self();
            self.stall().await;
        }
    }

    /// Suspend until every child of this task has terminated and been
    /// finalized.
    pub fn wait_subtasks(&self) -> WaitSubtasks<'_> {
        WaitSubtasks::new(self)
    }

    /// Suspend forever. The task only leaves this by being canceled.
    pub fn stall(&self) -> Stall<'_> {
        Stall::new(self)
    }

    // ── Spawning ───────────────────────────────────────────────────

    /// Start `D` as a child of this task, running it to its first
    /// suspension point before returning.
    pub fn invoke<D: TaskDef>(&self, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(Some(self.handle), 0, args)
    }

    /// Start an ad-hoc child task from a closure.
    pub fn invoke_with<A, F, Fut>(&self, name: &'static str, args: A, body: F) -> TaskHandle
    where
        A: 'static,
        F: FnOnce(TaskContext, ArgBlock<A>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.sched.spawn_with(name, Some(self.handle), 0, args, body)
    }

    /// Start `D` as a child whose first run happens `delay` frames from now.
    pub fn invoke_delayed<D: TaskDef>(&self, delay: u32, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(Some(self.handle), delay, args)
    }

    /// Start `D` as a root task, independent of this one.
    pub fn invoke_detached<D: TaskDef>(&self, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(None, 0, args)
    }

    /// Start `D` as a child of `parent` instead of this task.
    ///
    /// If `parent` is gone or terminating the new task is born canceled.
    pub fn invoke_child_of<D: TaskDef>(&self, parent: TaskHandle, args: D::Args) -> TaskHandle {
        self.sched.spawn_def::<D>(Some(parent), 0, args)
    }

    /// Start a child that runs `D`'s body only if `event` is signaled.
    pub fn invoke_when<D: TaskDef>(&self, event: EventId, args: D::Args) -> TaskHandle {
        self.sched.spawn_on_event::<D>(Some(self.handle), event, true, args)
    }

    /// Start a child that runs `D`'s body once `event` is signaled or
    /// canceled.
    pub fn invoke_after<D: TaskDef>(&self, event: EventId, args: D::Args) -> TaskHandle {
        self.sched.spawn_on_event::<D>(Some(self.handle), event, false, args)
    }

    // ── Cancellation ───────────────────────────────────────────────

    /// Cancel `h` and its subtree. Returns `false` if it was already gone
    /// or terminating.
    pub fn cancel(&self, h: TaskHandle) -> bool {
        let canceled = self.sched.state.borrow_mut().cancel_tree(h);
        self.sched.settle_if_idle();
        canceled
    }

    /// Cancel this task. It keeps running until its next suspension point
    /// and is never resumed after that.
    pub fn cancel_self(&self) {
        self.cancel(self.handle);
    }

    /// Cancel `target` once `event` is signaled. The helper dies with
    /// `target`. Returns `None` if `target` is not alive.
    pub fn cancel_task_when(&self, event: EventId, target: TaskHandle) -> Option<TaskHandle> {
        self.sched.spawn_canceler(event, target, true)
    }

    /// Cancel `target` once `event` is signaled or canceled.
    pub fn cancel_task_after(&self, event: EventId, target: TaskHandle) -> Option<TaskHandle> {
        self.sched.spawn_canceler(event, target, false)
    }

    // ── Finalizers ─────────────────────────────────────────────────

    /// Attach this task's finalizer. It runs exactly once, however the
    /// task ends, after all of its children have been finalized.
    ///
    /// # Panics
    ///
    /// Panics if a finalizer is already attached.
    pub fn set_finalizer(&self, f: impl FnOnce() + 'static) {
        let mut st = self.sched.state.borrow_mut();
        let Some(rec) = st.tasks.get_mut(self.handle.0) else {
            return;
        };
        assert!(
            rec.finalizer.is_none(),
            "{} ({}) already has a finalizer",
            self.handle,
            rec.name
        );
        rec.finalizer = Some(Box::new(f));
    }

    /// Attach a finalizer that sees the final state of `args`.
    pub fn finalize_with_args<A: 'static>(
        &self,
        args: &ArgBlock<A>,
        f: impl FnOnce(&mut A) + 'static,
    ) {
        let args = args.clone();
        self.set_finalizer(move || args.with_mut(f));
    }

    // ── Entity coupling ────────────────────────────────────────────

    /// Tie this task to `entity`: despawning it cancels the task. Binding
    /// an entity that is already dead cancels the task immediately.
    ///
    /// # Panics
    ///
    /// Panics if the task is already bound.
    pub fn bind<T: Entity>(&self, entity: Boxed<T>) -> Boxed<T> {
        {
            let mut st = self.sched.state.borrow_mut();
            let Some(rec) = st.task(self.handle) else {
                return entity;
            };
            assert!(
                rec.bound.is_none(),
                "{} ({}) is already bound to an entity",
                self.handle,
                rec.name
            );
            let hook = DespawnHook::CancelTask(self.handle.0);
            if st.arena.add_hook(entity, hook).is_ok() {
                if let Some(rec) = st.tasks.get_mut(self.handle.0) {
                    rec.bound = Some(entity.erase());
                }
            } else {
                st.cancel_tree(self.handle);
            }
        }
        self.sched.settle_if_idle();
        entity
    }

    /// Spawn an entity owned by this task. It is despawned when the task
    /// is finalized.
    ///
    /// Called through a context whose task has already been reclaimed, the
    /// entity is despawned at once and the returned reference is stale.
    pub fn host_entity<T: Entity>(&self, value: T) -> Boxed<T> {
        let (entity, orphan) = {
            let mut st = self.sched.state.borrow_mut();
            let entity = st.arena.spawn(value);
            match st.tasks.get_mut(self.handle.0) {
                Some(rec) => {
                    rec.hosted_entities.push(entity.erase());
                    (entity, None)
                }
                None => {
                    warn!(task = %self.handle, "host_entity on a reclaimed task");
                    (entity, st.despawn_entity(entity.erase()).ok())
                }
            }
        };
        drop(orphan);
        entity
    }

    /// Create `n` events owned by this task. They are canceled when the
    /// task is finalized, or at once if it has already been reclaimed.
    pub fn host_events(&self, n: usize, kind: EventKind) -> Vec<EventId> {
        let mut st = self.sched.state.borrow_mut();
        let ids: Vec<EventId> = (0..n).map(|_| st.create_event(kind)).collect();
        match st.tasks.get_mut(self.handle.0) {
            Some(rec) => rec.hosted_events.extend(ids.iter().copied()),
            None => {
                warn!(task = %self.handle, events = n, "host_events on a reclaimed task");
                for &id in &ids {
                    st.cancel_event(id);
                }
            }
        }
        ids
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Create a free-standing event.
    pub fn create_event(&self, kind: EventKind) -> EventId {
        self.sched.state.borrow_mut().create_event(kind)
    }

    /// Wake every waiter of `event` with [`WaitOutcome::Signaled`].
    pub fn signal(&self, event: EventId) -> bool {
        let fired = self.sched.state.borrow_mut().signal_event(event);
        self.sched.settle_if_idle();
        fired
    }

    /// Signal `event` only if it has never been signaled.
    pub fn signal_once(&self, event: EventId) -> bool {
        let fired = self.sched.state.borrow_mut().signal_event_once(event);
        self.sched.settle_if_idle();
        fired
    }

    /// Cancel `event`, waking every waiter with [`WaitOutcome::Canceled`].
    pub fn cancel_event(&self, event: EventId) -> bool {
        let canceled = self.sched.state.borrow_mut().cancel_event(event);
        self.sched.settle_if_idle();
        canceled
    }

    /// Capture `event`'s current state for [`poll`](Self::poll).
    pub fn snapshot(&self, event: EventId) -> EventSnapshot {
        self.sched.state.borrow().snapshot(event)
    }

    /// What happened to an event since `snapshot`, without suspending.
    pub fn poll(&self, snapshot: EventSnapshot) -> EventStatus {
        self.sched.state.borrow().poll_event(snapshot)
    }

    /// The event signaled when `h` finishes normally and canceled when it
    /// is canceled. `None` once `h` has been reclaimed.
    pub fn finished_event(&self, h: TaskHandle) -> Option<EventId> {
        self.sched.state.borrow().task(h).map(|r| r.finished_event)
    }

    // ── World ──────────────────────────────────────────────────────

    /// Run `f` with access to the entity arena.
    ///
    /// `f` must not call back into this context (or any other); the
    /// runtime is borrowed for the duration.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World<'_>) -> R) -> R {
        let result = {
            let mut st = self.sched.state.borrow_mut();
            let mut world = World::new(&mut st);
            f(&mut world)
        };
        self.sched.settle_if_idle();
        result
    }
}
