//! The runtime's single mutable state record.
//!
//! Everything the scheduler, the task tree, and the event table touch lives
//! here behind one `RefCell`. No borrow of it is ever held while task code
//! (a body poll or a finalizer) runs.

use std::collections::VecDeque;

use smallvec::SmallVec;

use skein_arena::{ArenaError, BoxedEntity, DespawnHook, Despawned, EntityArena, SlotMap};
use skein_core::{EventId, FrameId, TaskHandle};

use crate::config::RuntimeConfig;
use crate::event::{EventKind, EventRecord};
use crate::metrics::{FrameMetrics, RuntimeStats};
use crate::task::{TaskRecord, TaskStatus, WaitCondition};
use crate::trace::ResumeTrace;

pub(crate) struct RuntimeState {
    pub(crate) frame: FrameId,
    pub(crate) arena: EntityArena,
    pub(crate) tasks: SlotMap<TaskRecord>,
    /// Every task ever created that has not been reclaimed, in creation order.
    pub(crate) run_list: Vec<TaskHandle>,
    pub(crate) next_creation: u64,
    pub(crate) events: SlotMap<EventRecord>,
    /// Tasks woken by an event or by their last child going away.
    pub(crate) wake_queue: VecDeque<TaskHandle>,
    /// Terminated tasks awaiting finalization.
    pub(crate) reclaim: VecDeque<TaskHandle>,
    /// Tasks currently inside their own poll, innermost last.
    pub(crate) running: SmallVec<[TaskHandle; 8]>,
    /// Nesting level of task code (polls and finalizers).
    pub(crate) depth: u32,
    pub(crate) in_frame: bool,
    pub(crate) shutting_down: bool,
    pub(crate) finished: bool,
    pub(crate) frame_metrics: FrameMetrics,
    pub(crate) last_metrics: FrameMetrics,
    pub(crate) stats: RuntimeStats,
    pub(crate) trace: Option<ResumeTrace>,
}

impl RuntimeState {
    pub(crate) fn new(config: &RuntimeConfig) -> Self {
        Self {
            frame: FrameId::default(),
            arena: EntityArena::new(&config.arena),
            tasks: SlotMap::with_capacity(config.initial_task_capacity),
            run_list: Vec::with_capacity(config.initial_task_capacity),
            next_creation: 0,
            events: SlotMap::with_capacity(config.initial_event_capacity),
            wake_queue: VecDeque::new(),
            reclaim: VecDeque::new(),
            running: SmallVec::new(),
            depth: 0,
            in_frame: false,
            shutting_down: false,
            finished: false,
            frame_metrics: FrameMetrics::default(),
            last_metrics: FrameMetrics::default(),
            stats: RuntimeStats::default(),
            trace: config.trace_resumptions.then(ResumeTrace::new),
        }
    }

    pub(crate) fn task(&self, h: TaskHandle) -> Option<&TaskRecord> {
        self.tasks.get(h.0)
    }

    /// Present and not terminating.
    pub(crate) fn is_live_task(&self, h: TaskHandle) -> bool {
        self.task(h).is_some_and(|r| !r.is_terminating())
    }

    /// Whether `h` may be polled now.
    pub(crate) fn is_ready(&self, h: TaskHandle) -> bool {
        let Some(rec) = self.task(h) else {
            return false;
        };
        if rec.is_terminating() || rec.future.is_none() || rec.status == TaskStatus::Running {
            return false;
        }
        match rec.wait {
            WaitCondition::None => true,
            WaitCondition::Subtasks => rec.children.is_empty(),
            _ => false,
        }
    }

    /// The innermost task currently being polled.
    pub(crate) fn current(&self) -> Option<TaskHandle> {
        self.running.last().copied()
    }

    /// Panic unless `h` is the task being polled right now.
    pub(crate) fn assert_running(&self, h: TaskHandle) {
        let current = self.current();
        if current != Some(h) {
            let name = self.task(h).map_or("<reclaimed>", |r| r.name);
            panic!("{h} ({name}) suspended from outside its own body (running: {current:?})");
        }
    }

    /// Wake `parent` if it waits on subtasks and its last child has been
    /// finalized.
    pub(crate) fn note_child_gone(&mut self, parent: TaskHandle) {
        let Some(rec) = self.tasks.get_mut(parent.0) else {
            return;
        };
        if rec.wait != WaitCondition::Subtasks
            || rec.is_terminating()
            || !rec.children.is_empty()
        {
            return;
        }
        rec.wait = WaitCondition::None;
        self.wake_queue.push_back(parent);
    }

    /// Count down timed waits at the start of a frame.
    pub(crate) fn tick_timers(&mut self) {
        for h in &self.run_list {
            let Some(rec) = self.tasks.get_mut(h.0) else {
                continue;
            };
            if rec.is_terminating() {
                continue;
            }
            if let WaitCondition::Frames(k) = rec.wait {
                rec.wait = if k <= 1 {
                    WaitCondition::None
                } else {
                    WaitCondition::Frames(k - 1)
                };
            }
        }
    }

    /// Drop reclaimed tasks from the run list.
    pub(crate) fn compact_run_list(&mut self) {
        let tasks = &self.tasks;
        self.run_list.retain(|h| tasks.contains(h.0));
    }

    // ── Entities ───────────────────────────────────────────────────

    /// Despawn an entity and run its hooks.
    pub(crate) fn despawn_entity(&mut self, r: BoxedEntity) -> Result<Despawned, ArenaError> {
        let gone = self.arena.despawn(r)?;
        for hook in &gone.hooks {
            match *hook {
                DespawnHook::CancelTask(key) => {
                    self.cancel_tree(TaskHandle(key));
                }
                DespawnHook::CancelEvent(key) => {
                    self.cancel_event(EventId(key));
                }
            }
        }
        Ok(gone)
    }

    /// Create an event that is canceled when `r` is despawned.
    pub(crate) fn entity_event(&mut self, r: BoxedEntity, kind: EventKind) -> Option<EventId> {
        if !self.arena.is_alive(r) {
            return None;
        }
        let id = self.create_event(kind);
        self.arena.add_hook(r, DespawnHook::CancelEvent(id.0)).ok()?;
        Some(id)
    }
}
