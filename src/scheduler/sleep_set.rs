//! Tasks blocked on simulated I/O, keyed by wake epoch.
//!
//! Entries due at the same epoch are released in insertion order.

use std::collections::BTreeMap;

use super::pcb::TaskId;

#[derive(Clone, Debug)]
pub struct SleepSet {
    by_wake: BTreeMap<u64, Vec<TaskId>>,
    wake_of: Vec<Option<u64>>,
    len: usize,
}

impl SleepSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_wake: BTreeMap::new(),
            wake_of: vec![None; capacity],
            len: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn contains(&self, id: TaskId) -> bool {
        self.wake_of.get(id.index()).is_some_and(Option::is_some)
    }

    /// Wake epoch recorded for `id`, if sleeping.
    pub fn wake_at(&self, id: TaskId) -> Option<u64> {
        self.wake_of.get(id.index()).copied().flatten()
    }

    /// Record `id` as sleeping until `wake_at`. Re-inserting replaces the
    /// previous deadline.
    pub fn insert(&mut self, id: TaskId, wake_at: u64) {
        debug_assert!(id.index() < self.wake_of.len());
        self.remove(id);
        self.wake_of[id.index()] = Some(wake_at);
        self.by_wake.entry(wake_at).or_default().push(id);
        self.len += 1;
    }

    /// Drop `id` without waking it.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let Some(wake_at) = self.wake_of.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        if let Some(bucket) = self.by_wake.get_mut(&wake_at) {
            bucket.retain(|t| *t != id);
            if bucket.is_empty() {
                self.by_wake.remove(&wake_at);
            }
        }
        self.len -= 1;
        true
    }

    /// Remove and return every entry with `wake_at <= now`.
    ///
    /// Safe to call with nothing pending.
    pub fn expire(&mut self, now: u64) -> Vec<TaskId> {
        let due: Vec<u64> = self.by_wake.range(..=now).map(|(k, _)| *k).collect();
        let mut woken = Vec::new();
        for key in due {
            if let Some(tasks) = self.by_wake.remove(&key) {
                for id in tasks {
                    self.wake_of[id.index()] = None;
                    self.len -= 1;
                    woken.push(id);
                }
            }
        }
        woken
    }

    /// Earliest pending wake epoch.
    pub fn next_wake(&self) -> Option<u64> {
        self.by_wake.keys().next().copied()
    }

    /// Sleeping ids in wake order.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.by_wake.values().flatten().copied()
    }
}
