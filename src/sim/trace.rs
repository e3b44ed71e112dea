//! Bounded trace ring of scheduler transitions.
//!
//! Every state transition the controller performs is recorded here in the
//! order it happened. When the ring is full, the oldest events are evicted
//! first. Tests use the ring to assert transition order; failures attach a
//! dump of it for forensics.

use std::collections::VecDeque;

/// Transition event set. Task ids are PCB indices.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TraceEvent {
    /// A new epoch started.
    Tick { epoch: u64 },
    /// Task appended to the ready queue tail.
    Enqueue { task: u32 },
    /// Task taken from the ready queue head.
    Dequeue { task: u32 },
    /// Stale ready-queue entry discarded during pop.
    StaleDropped { task: u32 },
    /// Task promoted to RUNNING with a fresh quantum.
    Select { task: u32, quantum: u32 },
    /// Permission granted; `quantum_left` is after the decrement.
    Grant { task: u32, quantum_left: u32 },
    /// RUNNING task demoted to READY on quantum exhaustion.
    Preempt { task: u32 },
    /// Every READY task had an empty quantum; `refreshed` tasks were reset.
    QuantumRefresh { refreshed: u32 },
    /// `running_id` named a task that was no longer RUNNING.
    StaleRunningCleared { task: u32 },
    /// Task blocked on simulated I/O until `wake_at`.
    IoBlock { task: u32, wake_at: u64 },
    /// Sleeping task returned to READY.
    Wake { task: u32 },
    /// Task reached DONE; `alive` is the remaining population.
    Terminate { task: u32, alive: u32 },
    /// Notification from a handle that maps to no PCB.
    UnknownSource { handle: u64 },
    /// Notification for a task whose state does not accept it.
    Ignored { task: u32, reason: IgnoreReason },
    /// Population reached zero.
    Finished { epoch: u64 },
}

/// Why a notification was dropped without mutating state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IgnoreReason {
    AlreadyDone,
    AlreadySleeping,
}

impl TraceEvent {
    /// Task id the event concerns, if any.
    pub fn task(&self) -> Option<u32> {
        match *self {
            Self::Enqueue { task }
            | Self::Dequeue { task }
            | Self::StaleDropped { task }
            | Self::Select { task, .. }
            | Self::Grant { task, .. }
            | Self::Preempt { task }
            | Self::StaleRunningCleared { task }
            | Self::IoBlock { task, .. }
            | Self::Wake { task }
            | Self::Terminate { task, .. }
            | Self::Ignored { task, .. } => Some(task),
            Self::Tick { .. }
            | Self::QuantumRefresh { .. }
            | Self::UnknownSource { .. }
            | Self::Finished { .. } => None,
        }
    }
}

/// Fixed-capacity ring buffer of trace events.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TraceRing {
    cap: usize,
    buf: VecDeque<TraceEvent>,
    evicted: u64,
}

impl TraceRing {
    /// Create a trace ring with at least one slot.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            buf: VecDeque::with_capacity(cap.min(1 << 16)),
            evicted: 0,
        }
    }

    /// Maximum number of events retained.
    #[inline(always)]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Current number of retained events.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the ring is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of events dropped because the ring was full.
    #[inline(always)]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Push a new event, evicting the oldest if at capacity.
    #[inline(always)]
    pub fn push(&mut self, ev: TraceEvent) {
        if self.buf.len() == self.cap {
            self.buf.pop_front();
            self.evicted += 1;
        }
        self.buf.push_back(ev);
    }

    /// Iterate retained events in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEvent> {
        self.buf.iter()
    }

    /// Snapshot the ring contents in chronological order.
    pub fn dump(&self) -> Vec<TraceEvent> {
        self.buf.iter().cloned().collect()
    }
}
