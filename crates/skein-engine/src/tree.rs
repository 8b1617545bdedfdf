//! Structured concurrency: parent links, cancellation, and reclamation.
//!
//! Every task has at most one parent and owns the handles of its children.
//! Terminating a task (natural finish or cancellation) marks its whole
//! subtree canceled in the same instant. Marked tasks are never polled
//! again; they are finalized later, bottom-up, by the scheduler.
//!
//! Invariant: every descendant of a terminating task is terminating.

use smallvec::{smallvec, SmallVec};
use tracing::debug;

use skein_arena::{DespawnHook, Despawned};
use skein_core::TaskHandle;

use crate::event::EventKind;
use crate::state::RuntimeState;
use crate::task::{Finalizer, TaskFuture, TaskRecord, Termination, WaitCondition};

impl RuntimeState {
    /// Create a task record under `parent` and schedule it.
    ///
    /// A task whose parent is terminating or gone, or that is created
    /// during teardown, is born canceled: it is never polled and goes
    /// straight to reclamation.
    pub(crate) fn attach_task(
        &mut self,
        name: &'static str,
        parent: Option<TaskHandle>,
        delay: u32,
    ) -> TaskHandle {
        let finished_event = self.create_event(EventKind::OneShot);
        let creation = self.next_creation;
        self.next_creation += 1;

        let live_parent = parent.filter(|p| self.tasks.contains(p.0));
        let orphaned = parent.is_some() && live_parent.is_none_or(|p| !self.is_live_task(p));
        let born_canceled = self.shutting_down || orphaned;

        let mut rec = TaskRecord::new(name, creation, live_parent, finished_event);
        if delay > 0 {
            rec.wait = WaitCondition::Frames(delay);
        }
        if born_canceled {
            rec.termination = Some(Termination::Canceled);
        }
        let h = TaskHandle(self.tasks.insert(rec));

        if let Some(p) = live_parent.and_then(|p| self.tasks.get_mut(p.0)) {
            p.children.push(h);
        }
        self.run_list.push(h);
        if born_canceled {
            self.reclaim.push_back(h);
        }

        self.frame_metrics.tasks_spawned += 1;
        self.stats.tasks_spawned += 1;
        self.stats.peak_live_tasks = self.stats.peak_live_tasks.max(self.tasks.len());
        debug!(task = name, %h, parent = ?live_parent, delay, born_canceled, "task spawned");
        h
    }

    /// Cancel `root` and every descendant.
    ///
    /// Returns `false` if `root` is gone or already terminating.
    pub(crate) fn cancel_tree(&mut self, root: TaskHandle) -> bool {
        let Some(rec) = self.tasks.get(root.0) else {
            return false;
        };
        if rec.is_terminating() {
            return false;
        }

        let mut stack: SmallVec<[TaskHandle; 8]> = smallvec![root];
        while let Some(h) = stack.pop() {
            let Some(rec) = self.tasks.get_mut(h.0) else {
                continue;
            };
            if rec.termination.is_some() {
                continue;
            }
            rec.termination = Some(Termination::Canceled);
            self.reclaim.push_back(h);
            debug!(task = rec.name, %h, "task canceled");
            stack.extend(rec.children.iter().rev().copied());
        }
        true
    }

    /// Record that `h`'s body returned.
    ///
    /// Signals the finished event on a natural finish and cancels whatever
    /// children are still running.
    pub(crate) fn complete_task(&mut self, h: TaskHandle) {
        let Some(rec) = self.tasks.get_mut(h.0) else {
            return;
        };
        let natural = rec.termination.is_none();
        if natural {
            rec.termination = Some(Termination::Finished);
        }
        let name = rec.name;
        let finished = rec.finished_event;
        let children = rec.children.clone();

        if !natural {
            // Already queued for reclamation when it was canceled.
            debug!(task = name, %h, "canceled task returned");
            return;
        }
        self.reclaim.push_back(h);
        debug!(task = name, %h, "task finished");
        self.signal_event(finished);
        for c in children {
            self.cancel_tree(c);
        }
    }

    /// `root`'s subtree, children before parents, siblings in creation order.
    pub(crate) fn post_order(&self, root: TaskHandle) -> Vec<TaskHandle> {
        let mut out = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((h, expanded)) = stack.pop() {
            let Some(rec) = self.tasks.get(h.0) else {
                continue;
            };
            debug_assert!(rec.is_terminating(), "{h} ({}) reclaimed while live", rec.name);
            if expanded || rec.children.is_empty() {
                out.push(h);
            } else {
                stack.push((h, true));
                stack.extend(rec.children.iter().rev().map(|c| (*c, false)));
            }
        }
        out
    }

    /// First half of finalization: mark and hand out the body and finalizer.
    ///
    /// # Panics
    ///
    /// Panics if `h` was already finalized or is still live.
    pub(crate) fn begin_finalize(
        &mut self,
        h: TaskHandle,
    ) -> Option<(Option<TaskFuture>, Option<Finalizer>)> {
        let rec = self.tasks.get_mut(h.0)?;
        assert!(!rec.finalized, "{h} ({}) finalized twice", rec.name);
        assert!(rec.is_terminating(), "{h} ({}) finalized while live", rec.name);
        rec.finalized = true;
        Some((rec.future.take(), rec.finalizer.take()))
    }

    /// Second half of finalization: unlink and release everything the
    /// task hosted, then reclaim its slot.
    ///
    /// Unlinking is what lets a parent in `wait_subtasks` resume, so it
    /// only ever sees children whose finalizers have run. The despawned
    /// hosted entities are handed back so the caller can drop them once
    /// the state is no longer borrowed.
    pub(crate) fn end_finalize(&mut self, h: TaskHandle) -> Vec<Despawned> {
        let Some(rec) = self.tasks.remove(h.0) else {
            return Vec::new();
        };

        if let Some(p) = rec.parent {
            if let Some(parent) = self.tasks.get_mut(p.0) {
                parent.children.retain(|c| *c != h);
            }
            self.note_child_gone(p);
        }
        // Children spawned by the finalizer itself; already queued.
        for c in &rec.children {
            if let Some(child) = self.tasks.get_mut(c.0) {
                debug_assert!(child.is_terminating());
                child.parent = None;
            }
        }

        if let WaitCondition::Event(snap) = rec.wait {
            self.unsubscribe(h, snap.id);
        }
        for &e in &rec.hosted_events {
            self.cancel_event(e);
        }
        self.cancel_event(rec.finished_event);

        if let Some(bound) = rec.bound {
            self.arena.remove_hook(bound, DespawnHook::CancelTask(h.0));
        }
        let mut despawned = Vec::with_capacity(rec.hosted_entities.len());
        for &ent in &rec.hosted_entities {
            // Gameplay code may have despawned it already.
            if !self.arena.is_alive(ent) {
                continue;
            }
            match self.despawn_entity(ent) {
                Ok(gone) => despawned.push(gone),
                Err(e) => panic!("{h} ({}) lost hosted entity {ent:?}: {e}", rec.name),
            }
        }

        self.frame_metrics.tasks_finalized += 1;
        self.stats.tasks_finalized += 1;
        debug!(task = rec.name, %h, termination = ?rec.termination, "task finalized");
        despawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    fn state() -> RuntimeState {
        RuntimeState::new(&RuntimeConfig::default())
    }

    #[test]
    fn cancel_marks_whole_subtree() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        let a = st.attach_task("a", Some(root), 0);
        let b = st.attach_task("b", Some(a), 0);
        let other = st.attach_task("other", None, 0);

        assert!(st.cancel_tree(root));
        for h in [root, a, b] {
            assert_eq!(st.task(h).unwrap().termination, Some(Termination::Canceled));
        }
        assert!(st.is_live_task(other));
        assert!(!st.cancel_tree(root));
        assert_eq!(st.reclaim.len(), 3);
    }

    #[test]
    fn child_of_terminating_parent_is_born_canceled() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        st.cancel_tree(root);
        let late = st.attach_task("late", Some(root), 0);
        assert!(!st.is_live_task(late));
        assert!(st.task(late).unwrap().is_terminating());
    }

    #[test]
    fn post_order_puts_children_first() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        let a = st.attach_task("a", Some(root), 0);
        let a1 = st.attach_task("a1", Some(a), 0);
        let b = st.attach_task("b", Some(root), 0);
        st.cancel_tree(root);
        assert_eq!(st.post_order(root), vec![a1, a, b, root]);
    }

    #[test]
    fn natural_finish_cancels_children_and_signals() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        let child = st.attach_task("child", Some(root), 0);
        let finished = st.task(root).unwrap().finished_event;
        st.complete_task(root);
        assert_eq!(st.task(root).unwrap().termination, Some(Termination::Finished));
        assert_eq!(st.task(child).unwrap().termination, Some(Termination::Canceled));
        assert_eq!(st.snapshot(finished).num_signaled, 1);
    }

    #[test]
    fn end_finalize_unlinks_and_reclaims() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        let child = st.attach_task("child", Some(root), 0);
        st.cancel_tree(child);
        assert!(st.begin_finalize(child).is_some());
        st.end_finalize(child);
        assert!(st.task(child).is_none());
        assert!(st.task(root).unwrap().children.is_empty());
        assert!(st.is_live_task(root));
    }

    #[test]
    fn subtask_waiter_wakes_on_unlink_not_on_cancel() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        let child = st.attach_task("child", Some(root), 0);
        st.tasks.get_mut(root.0).unwrap().wait = WaitCondition::Subtasks;

        st.cancel_tree(child);
        assert!(st.wake_queue.is_empty());
        assert_eq!(st.task(root).unwrap().wait, WaitCondition::Subtasks);

        assert!(st.begin_finalize(child).is_some());
        st.end_finalize(child);
        assert_eq!(st.wake_queue.front(), Some(&root));
        assert_eq!(st.task(root).unwrap().wait, WaitCondition::None);
    }

    #[test]
    #[should_panic(expected = "finalized while live")]
    fn finalizing_live_task_panics() {
        let mut st = state();
        let root = st.attach_task("root", None, 0);
        st.begin_finalize(root);
    }
}
