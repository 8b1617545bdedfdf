//! Suspension points.
//!
//! Each future here registers a wait condition on its task the first time
//! it is polled and returns `Pending`. The scheduler polls the task again
//! only once that condition is satisfied, so the second poll always
//! completes. A task that is already canceled parks forever at its next
//! suspension point instead of registering anything.
//!
//! Awaiting two of these concurrently from one task (e.g. via `join`) is a
//! bug and panics.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use skein_core::EventId;

use crate::context::TaskContext;
use crate::event::{EventKind, WaitOutcome};
use crate::task::WaitCondition;

/// Outcome of registering a wait.
enum Register<T> {
    /// Satisfied without suspending.
    Done(T),
    /// Registered, or parked because the task is canceled.
    Suspended,
}

impl TaskContext {
    /// Install `cond` on the calling task, or park it if it is terminating.
    fn suspend(&self, cond: WaitCondition) {
        let mut st = self.sched.state.borrow_mut();
        st.assert_running(self.handle);
        let Some(rec) = st.tasks.get_mut(self.handle.0) else {
            return;
        };
        if rec.is_terminating() {
            rec.wait = WaitCondition::Stall;
            return;
        }
        assert!(
            rec.wait == WaitCondition::None,
            "{} ({}) is already suspended on {:?}",
            self.handle,
            rec.name,
            rec.wait
        );
        rec.wait = cond;
    }

    fn take_outcome(&self) -> WaitOutcome {
        let mut st = self.sched.state.borrow_mut();
        let rec = st
            .tasks
            .get_mut(self.handle.0)
            .unwrap_or_else(|| panic!("{} resumed after reclamation", self.handle));
        rec.outcome
            .take()
            .unwrap_or_else(|| panic!("{} ({}) resumed from an event wait without an outcome", self.handle, rec.name))
    }

    fn register_event(&self, id: EventId, once: bool) -> Register<WaitOutcome> {
        let mut st = self.sched.state.borrow_mut();
        st.assert_running(self.handle);
        let snapshot = st.snapshot(id);
        let st = &mut *st;
        let Some(rec) = st.tasks.get_mut(self.handle.0) else {
            return Register::Suspended;
        };
        if rec.is_terminating() {
            rec.wait = WaitCondition::Stall;
            return Register::Suspended;
        }
        let Some(evt) = st.events.get_mut(id.0) else {
            return Register::Done(WaitOutcome::Canceled);
        };
        if evt.num_signaled > 0 && (once || evt.kind == EventKind::OneShot) {
            return Register::Done(WaitOutcome::Signaled);
        }
        assert!(
            rec.wait == WaitCondition::None,
            "{} ({}) is already suspended on {:?}",
            self.handle,
            rec.name,
            rec.wait
        );
        evt.subscribers.push(self.handle);
        rec.wait = WaitCondition::Event(snapshot);
        Register::Suspended
    }
}

/// Future returned by [`TaskContext::wait`] and [`TaskContext::yield_now`].
#[must_use = "waits do nothing unless awaited"]
pub struct WaitFrames<'a> {
    ctx: &'a TaskContext,
    frames: u32,
    registered: bool,
}

impl<'a> WaitFrames<'a> {
    pub(crate) fn new(ctx: &'a TaskContext, frames: u32) -> Self {
        Self {
            ctx,
            frames,
            registered: false,
        }
    }
}

impl Future for WaitFrames<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.registered || self.frames == 0 {
            return Poll::Ready(());
        }
        self.ctx.suspend(WaitCondition::Frames(self.frames));
        self.registered = true;
        Poll::Pending
    }
}

/// Future returned by [`TaskContext::wait_event`] and
/// [`TaskContext::wait_event_once`].
#[must_use = "waits do nothing unless awaited"]
pub struct WaitEvent<'a> {
    ctx: &'a TaskContext,
    event: EventId,
    once: bool,
    registered: bool,
}

impl<'a> WaitEvent<'a> {
    pub(crate) fn new(ctx: &'a TaskContext, event: EventId, once: bool) -> Self {
        Self {
            ctx,
            event,
            once,
            registered: false,
        }
    }
}

impl Future for WaitEvent<'_> {
    type Output = WaitOutcome;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<WaitOutcome> {
        if self.registered {
            return Poll::Ready(self.ctx.take_outcome());
        }
        match self.ctx.register_event(self.event, self.once) {
            Register::Done(outcome) => Poll::Ready(outcome),
            Register::Suspended => {
                self.registered = true;
                Poll::Pending
            }
        }
    }
}

/// Future returned by [`TaskContext::wait_subtasks`].
#[must_use = "waits do nothing unless awaited"]
pub struct WaitSubtasks<'a> {
    ctx: &'a TaskContext,
    registered: bool,
}

impl<'a> WaitSubtasks<'a> {
    pub(crate) fn new(ctx: &'a TaskContext) -> Self {
        Self {
            ctx,
            registered: false,
        }
    }
}

impl Future for WaitSubtasks<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.registered || !self.ctx.has_children() {
            return Poll::Ready(());
        }
        self.ctx.suspend(WaitCondition::Subtasks);
        self.registered = true;
        Poll::Pending
    }
}

/// Future returned by [`TaskContext::stall`]. Never completes.
#[must_use = "waits do nothing unless awaited"]
pub struct Stall<'a> {
    ctx: &'a TaskContext,
    registered: bool,
}

impl<'a> Stall<'a> {
    pub(crate) fn new(ctx: &'a TaskContext) -> Self {
        Self {
            ctx,
            registered: false,
        }
    }
}

impl Future for Stall<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if !self.registered {
            self.ctx.suspend(WaitCondition::Stall);
            self.registered = true;
        }
        Poll::Pending
    }
}
