//! The frame-stepped scheduler.
//!
//! One [`Scheduler`] is shared (via `Rc`) by the [`Runtime`](crate::Runtime)
//! and every [`TaskContext`]. It owns the [`RuntimeState`] and is the only
//! code that polls task bodies or runs finalizers.
//!
//! # Frame order
//!
//! 1. Advance the frame counter and count down timed waits.
//! 2. Sweep the run list in creation order, resuming every ready task.
//!    Tasks woken by an event are resumed right after the task that woke
//!    them. Tasks created during the sweep are appended to the run list and
//!    are visited by the same sweep, but resume only if already ready.
//! 3. Finalize terminated tasks bottom-up, resuming any waiters that
//!    finalization wakes, until nothing is left to do.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Instant;

use indexmap::IndexSet;
use tracing::{debug, trace};

use skein_core::{EventId, FrameId, TaskHandle};

use crate::config::RuntimeConfig;
use crate::context::TaskContext;
use crate::event::WaitOutcome;
use crate::metrics::FrameMetrics;
use crate::state::RuntimeState;
use crate::task::{ArgBlock, TaskDef, TaskFuture, TaskStatus, WaitCondition};

pub(crate) struct Scheduler {
    pub(crate) state: RefCell<RuntimeState>,
}

enum Work {
    Wake(TaskHandle),
    Reclaim(TaskHandle),
}

impl Scheduler {
    pub(crate) fn new(config: &RuntimeConfig) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(RuntimeState::new(config)),
        })
    }

    // ── Spawning ───────────────────────────────────────────────────

    /// Create a task and, unless delayed or born canceled, run it to its
    /// first suspension point before returning.
    pub(crate) fn spawn(
        self: &Rc<Self>,
        name: &'static str,
        parent: Option<TaskHandle>,
        delay: u32,
        make: impl FnOnce(TaskContext) -> TaskFuture,
    ) -> TaskHandle {
        let h = self.state.borrow_mut().attach_task(name, parent, delay);
        let future = make(TaskContext::new(Rc::clone(self), h));
        let run_now = {
            let mut st = self.state.borrow_mut();
            match st.tasks.get_mut(h.0) {
                Some(rec) => {
                    rec.future = Some(future);
                    delay == 0 && !rec.is_terminating()
                }
                None => false,
            }
        };
        if run_now {
            self.try_resume(h);
        }
        self.settle_if_idle();
        h
    }

    pub(crate) fn spawn_def<D: TaskDef>(
        self: &Rc<Self>,
        parent: Option<TaskHandle>,
        delay: u32,
        args: D::Args,
    ) -> TaskHandle {
        let args = ArgBlock::new(args);
        self.spawn(D::NAME, parent, delay, move |ctx| Box::pin(D::body(ctx, args)))
    }

    pub(crate) fn spawn_with<A, F, Fut>(
        self: &Rc<Self>,
        name: &'static str,
        parent: Option<TaskHandle>,
        delay: u32,
        args: A,
        body: F,
    ) -> TaskHandle
    where
        A: 'static,
        F: FnOnce(TaskContext, ArgBlock<A>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let args = ArgBlock::new(args);
        self.spawn(name, parent, delay, move |ctx| Box::pin(body(ctx, args)))
    }

    /// Spawn `D` gated on `event`: the body runs once the event resolves,
    /// or only if it is signaled when `require_signal` is set.
    pub(crate) fn spawn_on_event<D: TaskDef>(
        self: &Rc<Self>,
        parent: Option<TaskHandle>,
        event: EventId,
        require_signal: bool,
        args: D::Args,
    ) -> TaskHandle {
        let args = ArgBlock::new(args);
        self.spawn(D::NAME, parent, 0, move |ctx| {
            Box::pin(async move {
                let outcome = ctx.wait_event(event).await;
                if outcome == WaitOutcome::Signaled || !require_signal {
                    D::body(ctx, args).await;
                }
            })
        })
    }

    /// Spawn a helper under `target` that cancels it once `event` resolves
    /// (or only on signal when `require_signal` is set).
    pub(crate) fn spawn_canceler(
        self: &Rc<Self>,
        event: EventId,
        target: TaskHandle,
        require_signal: bool,
    ) -> Option<TaskHandle> {
        if !self.state.borrow().is_live_task(target) {
            return None;
        }
        let name = if require_signal {
            "cancel_task_when"
        } else {
            "cancel_task_after"
        };
        Some(self.spawn(name, Some(target), 0, move |ctx| {
            Box::pin(async move {
                let outcome = ctx.wait_event(event).await;
                if outcome == WaitOutcome::Signaled || !require_signal {
                    ctx.cancel(target);
                }
            })
        }))
    }

    // ── Resumption ─────────────────────────────────────────────────

    /// Poll `h` once if it is ready. Returns whether it was polled.
    pub(crate) fn try_resume(&self, h: TaskHandle) -> bool {
        let mut future = {
            let mut st = self.state.borrow_mut();
            if !st.is_ready(h) {
                return false;
            }
            let st = &mut *st;
            let frame = st.frame.0;
            let Some(rec) = st.tasks.get_mut(h.0) else {
                return false;
            };
            let Some(future) = rec.future.take() else {
                return false;
            };
            rec.status = TaskStatus::Running;
            trace!(task = rec.name, %h, frame, "resume");
            if let Some(t) = st.trace.as_mut() {
                t.record(frame, rec.creation);
            }
            st.depth += 1;
            st.running.push(h);
            st.frame_metrics.tasks_resumed += 1;
            st.stats.tasks_resumed += 1;
            future
        };

        let poll = future.as_mut().poll(&mut Context::from_waker(Waker::noop()));

        let leftover = {
            let mut st = self.state.borrow_mut();
            st.depth -= 1;
            let popped = st.running.pop();
            assert_eq!(popped, Some(h), "task poll stack corrupted");
            match poll {
                Poll::Ready(()) => {
                    st.complete_task(h);
                    Some(future)
                }
                Poll::Pending => match st.tasks.get_mut(h.0) {
                    Some(rec) => {
                        rec.status = TaskStatus::Suspended;
                        if rec.wait == WaitCondition::None && !rec.is_terminating() {
                            // Suspended on something foreign: retry next frame.
                            rec.wait = WaitCondition::Frames(1);
                        }
                        rec.future = Some(future);
                        None
                    }
                    None => Some(future),
                },
            }
        };
        drop(leftover);
        true
    }

    /// Resume woken tasks until the wake queue is empty.
    fn drain_wakes(&self) {
        loop {
            let next = self.state.borrow_mut().wake_queue.pop_front();
            match next {
                Some(h) => {
                    self.try_resume(h);
                }
                None => break,
            }
        }
    }

    // ── Cleanup ────────────────────────────────────────────────────

    fn next_work(&self) -> Option<Work> {
        let mut st = self.state.borrow_mut();
        if let Some(h) = st.wake_queue.pop_front() {
            return Some(Work::Wake(h));
        }
        st.reclaim.pop_front().map(Work::Reclaim)
    }

    /// Run wakes and finalizations until both queues are empty.
    pub(crate) fn settle(&self) {
        while let Some(work) = self.next_work() {
            match work {
                Work::Wake(h) => {
                    self.try_resume(h);
                }
                Work::Reclaim(root) => {
                    let order = self.state.borrow().post_order(root);
                    for h in order {
                        self.finalize(h);
                    }
                }
            }
        }
    }

    /// Settle unless task code is on the stack or a frame is in progress.
    pub(crate) fn settle_if_idle(&self) {
        let idle = {
            let st = self.state.borrow();
            st.depth == 0 && !st.in_frame
        };
        if idle {
            self.settle();
        }
    }

    /// Drop the task's body, run its finalizer, then reclaim it.
    fn finalize(&self, h: TaskHandle) {
        let Some((future, finalizer)) = self.state.borrow_mut().begin_finalize(h) else {
            return;
        };
        self.state.borrow_mut().depth += 1;
        drop(future);
        if let Some(f) = finalizer {
            f();
        }
        let despawned = {
            let mut st = self.state.borrow_mut();
            st.depth -= 1;
            st.end_finalize(h)
        };
        // Entity destructors may call back into the runtime.
        drop(despawned);
    }

    // ── Frames ─────────────────────────────────────────────────────

    pub(crate) fn run_frame(&self) -> FrameMetrics {
        let start = Instant::now();
        {
            let mut st = self.state.borrow_mut();
            assert!(
                st.depth == 0 && !st.in_frame,
                "run_frame called from inside task code"
            );
            st.in_frame = true;
            st.frame = FrameId(st.frame.0 + 1);
            st.frame_metrics = FrameMetrics {
                frame: st.frame.0,
                ..FrameMetrics::default()
            };
            st.tick_timers();
        }

        let mut cursor = 0;
        loop {
            let next = self.state.borrow().run_list.get(cursor).copied();
            let Some(h) = next else {
                break;
            };
            cursor += 1;
            if self.try_resume(h) {
                self.drain_wakes();
            }
        }

        self.settle();

        let mut st = self.state.borrow_mut();
        st.in_frame = false;
        st.compact_run_list();
        st.stats.frames += 1;
        let mut metrics = std::mem::take(&mut st.frame_metrics);
        metrics.live_tasks = st.tasks.len();
        metrics.live_entities = st.arena.len();
        metrics.total_us = start.elapsed().as_micros() as u64;
        trace!(
            frame = metrics.frame,
            resumed = metrics.tasks_resumed,
            live = metrics.live_tasks,
            "frame complete"
        );
        st.last_metrics = metrics.clone();
        metrics
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Cancel every blocking event, then every task, then clear the arena.
    pub(crate) fn finish(&self) {
        {
            let mut st = self.state.borrow_mut();
            if st.finished {
                return;
            }
            assert!(
                st.depth == 0 && !st.in_frame,
                "runtime finished from inside task code"
            );
            st.shutting_down = true;
        }

        // Waiters get a chance to run their cancellation paths first.
        let blocking: IndexSet<EventId> = {
            let st = self.state.borrow();
            st.run_list
                .iter()
                .filter_map(|h| match st.task(*h)?.wait {
                    WaitCondition::Event(snap) => Some(snap.id),
                    _ => None,
                })
                .collect()
        };
        debug!(events = blocking.len(), "canceling blocking events");
        for id in blocking {
            self.state.borrow_mut().cancel_event(id);
            self.settle();
        }

        loop {
            let live: Vec<TaskHandle> = {
                let st = self.state.borrow();
                st.run_list
                    .iter()
                    .copied()
                    .filter(|h| st.tasks.contains(h.0))
                    .collect()
            };
            if live.is_empty() {
                break;
            }
            {
                let mut st = self.state.borrow_mut();
                for h in live {
                    st.cancel_tree(h);
                }
            }
            self.settle();
            self.state.borrow_mut().compact_run_list();
        }

        let despawned = {
            let mut st = self.state.borrow_mut();
            let despawned = st.arena.clear();
            debug!(entities = despawned.len(), "arena cleared");
            st.events.drain();
            st.run_list.clear();
            st.wake_queue.clear();
            st.finished = true;
            debug!(frame = %st.frame, "runtime finished");
            despawned
        };
        drop(despawned);
    }
}
