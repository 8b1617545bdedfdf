//! Events: wait/notify objects with FIFO waiters.
//!
//! An event lives in the runtime's event table and is addressed by an
//! [`EventId`]. Signaling wakes every current waiter with
//! [`WaitOutcome::Signaled`]; canceling removes the event and wakes every
//! waiter with [`WaitOutcome::Canceled`]. Because cancellation removes the
//! record, a stale [`EventId`] is indistinguishable from a canceled event,
//! and every operation treats it that way.

use smallvec::SmallVec;
use tracing::debug;

use skein_core::{EventId, TaskHandle};

use crate::state::RuntimeState;
use crate::task::WaitCondition;

/// How an event behaves after its first signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fires at most once. Later signals are no-ops and later waits
    /// complete immediately with [`WaitOutcome::Signaled`].
    OneShot,
    /// Wakes the current waiters on every signal and stays reusable.
    Repeatable,
}

/// Result of waiting on an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitOutcome {
    /// The event was signaled.
    Signaled,
    /// The event was canceled (explicitly, by its host's death, or at teardown).
    Canceled,
}

/// Result of a non-suspending [`poll`](crate::TaskContext::poll).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// Nothing happened since the snapshot.
    Pending,
    /// Signaled at least once since the snapshot.
    Signaled,
    /// Canceled since the snapshot (or before it).
    Canceled,
}

/// Point-in-time view of an event, for later polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventSnapshot {
    /// The observed event.
    pub id: EventId,
    /// Signal count at snapshot time.
    pub num_signaled: u32,
}

pub(crate) struct EventRecord {
    pub(crate) kind: EventKind,
    pub(crate) subscribers: SmallVec<[TaskHandle; 4]>,
    pub(crate) num_signaled: u32,
}

impl EventRecord {
    pub(crate) fn new(kind: EventKind) -> Self {
        Self {
            kind,
            subscribers: SmallVec::new(),
            num_signaled: 0,
        }
    }
}

impl RuntimeState {
    pub(crate) fn create_event(&mut self, kind: EventKind) -> EventId {
        EventId(self.events.insert(EventRecord::new(kind)))
    }

    pub(crate) fn snapshot(&self, id: EventId) -> EventSnapshot {
        EventSnapshot {
            id,
            num_signaled: self.events.get(id.0).map_or(0, |e| e.num_signaled),
        }
    }

    pub(crate) fn poll_event(&self, snap: EventSnapshot) -> EventStatus {
        match self.events.get(snap.id.0) {
            None => EventStatus::Canceled,
            Some(e) if e.num_signaled > snap.num_signaled => EventStatus::Signaled,
            Some(_) => EventStatus::Pending,
        }
    }

    /// Signal an event. Returns `false` if nothing was signaled (canceled
    /// event, or an already-fired one-shot).
    pub(crate) fn signal_event(&mut self, id: EventId) -> bool {
        let Some(evt) = self.events.get_mut(id.0) else {
            return false;
        };
        if evt.kind == EventKind::OneShot && evt.num_signaled > 0 {
            return false;
        }
        evt.num_signaled = evt
            .num_signaled
            .checked_add(1)
            .unwrap_or_else(|| panic!("{id} signal counter overflowed"));
        let subscribers = std::mem::take(&mut evt.subscribers);
        debug!(%id, waiters = subscribers.len(), "event signaled");
        self.wake_subscribers(id, &subscribers, WaitOutcome::Signaled);
        true
    }

    pub(crate) fn signal_event_once(&mut self, id: EventId) -> bool {
        match self.events.get(id.0) {
            Some(e) if e.num_signaled == 0 => self.signal_event(id),
            _ => false,
        }
    }

    /// Cancel an event. No-op (returns `false`) if it is already canceled.
    pub(crate) fn cancel_event(&mut self, id: EventId) -> bool {
        let Some(evt) = self.events.remove(id.0) else {
            return false;
        };
        debug!(%id, waiters = evt.subscribers.len(), "event canceled");
        self.wake_subscribers(id, &evt.subscribers, WaitOutcome::Canceled);
        true
    }

    fn wake_subscribers(&mut self, id: EventId, subscribers: &[TaskHandle], outcome: WaitOutcome) {
        for &h in subscribers {
            let Some(rec) = self.tasks.get_mut(h.0) else {
                continue;
            };
            let waiting_here = matches!(rec.wait, WaitCondition::Event(snap) if snap.id == id);
            if !waiting_here || rec.termination.is_some() {
                continue;
            }
            rec.wait = WaitCondition::None;
            rec.outcome = Some(outcome);
            self.wake_queue.push_back(h);
            self.frame_metrics.event_wakeups += 1;
        }
    }

    /// Drop `h` from the waiter list of the event it is subscribed to.
    pub(crate) fn unsubscribe(&mut self, h: TaskHandle, id: EventId) {
        if let Some(evt) = self.events.get_mut(id.0) {
            evt.subscribers.retain(|s| *s != h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    #[test]
    fn poll_tracks_signals_and_cancellation() {
        let mut st = RuntimeState::new(&RuntimeConfig::default());
        let e = st.create_event(EventKind::Repeatable);
        let snap = st.snapshot(e);
        assert_eq!(st.poll_event(snap), EventStatus::Pending);
        assert!(st.signal_event(e));
        assert_eq!(st.poll_event(snap), EventStatus::Signaled);
        let snap2 = st.snapshot(e);
        assert_eq!(st.poll_event(snap2), EventStatus::Pending);
        assert!(st.cancel_event(e));
        assert_eq!(st.poll_event(snap2), EventStatus::Canceled);
        assert!(!st.cancel_event(e));
        assert!(!st.signal_event(e));
    }

    #[test]
    fn one_shot_fires_once() {
        let mut st = RuntimeState::new(&RuntimeConfig::default());
        let e = st.create_event(EventKind::OneShot);
        assert!(st.signal_event(e));
        assert!(!st.signal_event(e));
        assert_eq!(st.snapshot(e).num_signaled, 1);
    }

    #[test]
    fn signal_once_only_fires_unsignaled_events() {
        let mut st = RuntimeState::new(&RuntimeConfig::default());
        let e = st.create_event(EventKind::Repeatable);
        assert!(st.signal_event_once(e));
        assert!(!st.signal_event_once(e));
        assert!(st.signal_event(e));
        assert_eq!(st.snapshot(e).num_signaled, 2);
    }
}
