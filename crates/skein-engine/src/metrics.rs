//! Per-frame and cumulative scheduler metrics.
//!
//! [`FrameMetrics`] describes a single [`run_frame`](crate::Runtime::run_frame)
//! call. [`RuntimeStats`] accumulates over the runtime's whole life, including
//! work done outside frames (top-level invokes, teardown).

/// Counters collected during a single frame.
///
/// Durations are in microseconds. Counts cover only work done inside the
/// frame; the live counts are sampled after end-of-frame cleanup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    /// Frame these metrics describe.
    pub frame: u64,
    /// Task resumptions, including first runs of new tasks.
    pub tasks_resumed: u32,
    /// Tasks created.
    pub tasks_spawned: u32,
    /// Tasks finalized and reclaimed.
    pub tasks_finalized: u32,
    /// Waiters woken by event signal or cancellation.
    pub event_wakeups: u32,
    /// Live tasks after cleanup.
    pub live_tasks: usize,
    /// Live entities after cleanup.
    pub live_entities: usize,
    /// Wall-clock time for the whole frame, in microseconds.
    pub total_us: u64,
}

/// Totals over the runtime's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Frames run.
    pub frames: u64,
    /// Tasks ever created.
    pub tasks_spawned: u64,
    /// Tasks ever finalized.
    pub tasks_finalized: u64,
    /// Total task resumptions.
    pub tasks_resumed: u64,
    /// Highest number of simultaneously live tasks.
    pub peak_live_tasks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = FrameMetrics::default();
        assert_eq!(m.frame, 0);
        assert_eq!(m.tasks_resumed, 0);
        assert_eq!(m.tasks_spawned, 0);
        assert_eq!(m.tasks_finalized, 0);
        assert_eq!(m.event_wakeups, 0);
        assert_eq!(m.live_tasks, 0);
        assert_eq!(m.live_entities, 0);
        assert_eq!(m.total_us, 0);
        assert_eq!(RuntimeStats::default().peak_live_tasks, 0);
    }
}
