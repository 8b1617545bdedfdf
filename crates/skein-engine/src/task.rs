//! Task definitions, argument blocks, and per-task bookkeeping.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use smallvec::SmallVec;

use skein_arena::BoxedEntity;
use skein_core::{EventId, TaskHandle};

use crate::context::TaskContext;
use crate::event::{EventSnapshot, WaitOutcome};

// ── Public surface ─────────────────────────────────────────────────

/// A named task type.
///
/// The body receives the task's [`TaskContext`] and its [`ArgBlock`]. Write
/// it as a function returning an `async move` block:
///
/// ```
/// use skein_engine::{ArgBlock, TaskContext, TaskDef};
///
/// struct Blink;
///
/// impl TaskDef for Blink {
///     type Args = u32;
///     const NAME: &'static str = "blink";
///
///     fn body(ctx: TaskContext, args: ArgBlock<u32>) -> impl std::future::Future<Output = ()> + 'static {
///         async move {
///             for _ in 0..args.get() {
///                 ctx.yield_now().await;
///             }
///         }
///     }
/// }
/// ```
pub trait TaskDef: 'static {
    /// The task's argument record.
    type Args: 'static;
    /// Debug label carried by every instance.
    const NAME: &'static str;
    /// Build the task body.
    fn body(ctx: TaskContext, args: ArgBlock<Self::Args>) -> impl Future<Output = ()> + 'static;
}

/// Persistent, shared storage for a task's arguments.
///
/// The block lives as long as any clone of it does, so a subtask or a
/// finalizer holding a clone observes the owner's latest writes even after
/// the owner has finished.
pub struct ArgBlock<A> {
    inner: Rc<RefCell<A>>,
}

impl<A> ArgBlock<A> {
    /// Wrap an argument record.
    pub fn new(args: A) -> Self {
        Self {
            inner: Rc::new(RefCell::new(args)),
        }
    }

    /// Read the arguments.
    pub fn with<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Modify the arguments.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Replace the arguments, returning the old record.
    pub fn replace(&self, args: A) -> A {
        self.inner.replace(args)
    }

    /// Whether two blocks are the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: Clone> ArgBlock<A> {
    /// Copy of the current arguments.
    pub fn get(&self) -> A {
        self.inner.borrow().clone()
    }
}

impl<A> Clone for ArgBlock<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for ArgBlock<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgBlock").field(&*self.inner.borrow()).finish()
    }
}

/// Why a task stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The body returned.
    Finished,
    /// The task, an ancestor, or its bound entity was canceled.
    Canceled,
}

// ── Internal bookkeeping ───────────────────────────────────────────

pub(crate) type TaskFuture = Pin<Box<dyn Future<Output = ()>>>;
pub(crate) type Finalizer = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    /// Never polled.
    Created,
    /// Inside its own poll.
    Running,
    /// Parked at a suspension point.
    Suspended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WaitCondition {
    /// Runnable.
    None,
    /// Frames left before the task is runnable again.
    Frames(u32),
    /// Subscribed to an event.
    Event(EventSnapshot),
    /// Until no child is alive.
    Subtasks,
    /// Never runnable again.
    Stall,
}

pub(crate) struct TaskRecord {
    pub(crate) name: &'static str,
    pub(crate) creation: u64,
    pub(crate) parent: Option<TaskHandle>,
    pub(crate) children: SmallVec<[TaskHandle; 4]>,
    pub(crate) status: TaskStatus,
    pub(crate) termination: Option<Termination>,
    pub(crate) wait: WaitCondition,
    pub(crate) outcome: Option<WaitOutcome>,
    pub(crate) future: Option<TaskFuture>,
    pub(crate) finalizer: Option<Finalizer>,
    pub(crate) finalized: bool,
    pub(crate) bound: Option<BoxedEntity>,
    pub(crate) hosted_entities: SmallVec<[BoxedEntity; 1]>,
    pub(crate) hosted_events: SmallVec<[EventId; 2]>,
    pub(crate) finished_event: EventId,
}

impl TaskRecord {
    pub(crate) fn new(
        name: &'static str,
        creation: u64,
        parent: Option<TaskHandle>,
        finished_event: EventId,
    ) -> Self {
        Self {
            name,
            creation,
            parent,
            children: SmallVec::new(),
            status: TaskStatus::Created,
            termination: None,
            wait: WaitCondition::None,
            outcome: None,
            future: None,
            finalizer: None,
            finalized: false,
            bound: None,
            hosted_entities: SmallVec::new(),
            hosted_events: SmallVec::new(),
            finished_event,
        }
    }

    pub(crate) fn is_terminating(&self) -> bool {
        self.termination.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Args {
        hp: i32,
    }

    #[test]
    fn clones_share_storage() {
        let a = ArgBlock::new(Args { hp: 3 });
        let b = a.clone();
        b.with_mut(|x| x.hp = 7);
        assert_eq!(a.get(), Args { hp: 7 });
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ArgBlock::new(Args { hp: 7 })));
    }

    #[test]
    fn replace_returns_previous() {
        let a = ArgBlock::new(1u8);
        assert_eq!(a.replace(2), 1);
        assert_eq!(a.with(|v| *v), 2);
    }

    #[test]
    fn block_outlives_original_handle() {
        let survivor = {
            let a = ArgBlock::new(String::from("boss"));
            a.clone()
        };
        assert_eq!(survivor.get(), "boss");
    }
}
