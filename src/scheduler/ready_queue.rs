//! FIFO ready queue with O(1) duplicate checks.
//!
//! Membership is tracked per task id with a sequence stamp; the FIFO stores
//! `(id, stamp)` pairs. An entry is live only while the id's recorded stamp
//! matches the entry's stamp, so `remove` is O(1) and simply leaves a dead
//! entry behind for `pop` to skip. This mirrors the generation-tag trick used
//! for O(1) set resets: validity is a stamp comparison, not a scan.
//!
//! Invariants:
//! - An id has at most one live entry.
//! - Live entries preserve push order.
//! - `pop` permanently discards entries whose task is no longer READY; they
//!   are never reinserted.

use std::collections::VecDeque;

use super::pcb::{TaskId, TaskState};

/// Result of a `pop`: the selected task plus any stale entries discarded on
/// the way to it, in queue order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Popped {
    pub task: Option<TaskId>,
    pub stale: Vec<TaskId>,
}

/// Set-backed FIFO of READY task ids with capacity `N`.
#[derive(Clone, Debug)]
pub struct ReadyQueue {
    fifo: VecDeque<(TaskId, u64)>,
    member: Vec<Option<u64>>,
    next_stamp: u64,
    live: usize,
}

impl ReadyQueue {
    /// Queue able to hold ids `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fifo: VecDeque::with_capacity(capacity),
            member: vec![None; capacity],
            next_stamp: 0,
            live: 0,
        }
    }

    /// Number of live entries.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline(always)]
    pub fn contains(&self, id: TaskId) -> bool {
        self.member.get(id.index()).is_some_and(Option::is_some)
    }

    /// Append `id` unless it is not READY or already queued.
    ///
    /// Returns `true` when the id was appended. Rejected pushes are no-ops.
    pub fn push(&mut self, id: TaskId, state: TaskState) -> bool {
        if state != TaskState::Ready {
            return false;
        }
        let Some(slot) = self.member.get_mut(id.index()) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        *slot = Some(stamp);
        self.fifo.push_back((id, stamp));
        self.live += 1;
        true
    }

    /// Drop the live entry for `id`, if any. The FIFO slot becomes dead.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let Some(slot) = self.member.get_mut(id.index()) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        self.live -= 1;
        self.maybe_compact();
        true
    }

    /// Remove entries from the head until one whose task is still READY.
    ///
    /// Live entries whose task changed state are reported in `stale` and
    /// discarded. Returns no task once the whole queue has been scanned.
    pub fn pop(&mut self, state_of: impl Fn(TaskId) -> TaskState) -> Popped {
        let mut out = Popped::default();
        while let Some((id, stamp)) = self.fifo.pop_front() {
            if self.member[id.index()] != Some(stamp) {
                // Removed earlier; nothing to report.
                continue;
            }
            self.member[id.index()] = None;
            self.live -= 1;
            if state_of(id) == TaskState::Ready {
                out.task = Some(id);
                return out;
            }
            out.stale.push(id);
        }
        out
    }

    /// Live ids in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.fifo
            .iter()
            .filter(|(id, stamp)| self.member[id.index()] == Some(*stamp))
            .map(|(id, _)| *id)
    }

    fn maybe_compact(&mut self) {
        if self.fifo.len() > self.member.len().saturating_mul(2).max(16) {
            let member = &self.member;
            self.fifo
                .retain(|(id, stamp)| member[id.index()] == Some(*stamp));
        }
    }
}
