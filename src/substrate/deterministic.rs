//! Single-thread substrate with virtual time.
//!
//! Task entities are stepped inline: a permit is handled the moment it is
//! delivered and any resulting notification is appended to the inbound FIFO.
//! The FIFO is always drained before another tick is produced, so every
//! notification caused by epoch `t` is processed before epoch `t + 1`.
//! Identical configuration and seed give identical traces.
//!
//! Supports spawn-failure injection to exercise the fatal startup path, and
//! direct event injection to exercise arbitrary interleavings.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tracing::trace;

use super::{EventSubstrate, TaskHandle};
use crate::error::SpawnError;
use crate::scheduler::event::{Event, Notice};
use crate::task::TaskEntity;

#[derive(Debug, Default)]
pub struct DeterministicSubstrate {
    tasks: Vec<Option<TaskEntity>>,
    pending: VecDeque<Event>,
    finished: Vec<TaskHandle>,
    periodic: bool,
    fail_spawn_at: Option<usize>,
    delivered: u64,
}

impl DeterministicSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th spawn (0-based) fail.
    pub fn with_spawn_failure_at(mut self, n: usize) -> Self {
        self.fail_spawn_at = Some(n);
        self
    }

    /// Append an arbitrary event to the inbound FIFO.
    pub fn inject(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    /// Inspect a live entity.
    pub fn entity(&self, handle: TaskHandle) -> Option<&TaskEntity> {
        self.tasks.get(handle.raw() as usize).and_then(Option::as_ref)
    }

    /// Number of entities that have not exited.
    pub fn live_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_some()).count()
    }

    /// Notices delivered to live entities so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl EventSubstrate for DeterministicSubstrate {
    fn spawn(&mut self, entity: TaskEntity) -> Result<TaskHandle, SpawnError> {
        if self.fail_spawn_at == Some(self.tasks.len()) {
            return Err(SpawnError::Injected { task: entity.id() });
        }
        let handle = TaskHandle::from_raw(self.tasks.len() as u64);
        self.tasks.push(Some(entity));
        Ok(handle)
    }

    fn notify(&mut self, target: TaskHandle, notice: Notice) {
        let idx = target.raw() as usize;
        let Some(entity) = self.tasks.get_mut(idx).and_then(Option::as_mut) else {
            trace!(handle = %target, ?notice, "notice for exited task dropped");
            return;
        };
        self.delivered += 1;
        if let Some(emission) = entity.on_notice(notice) {
            self.pending.push_back(emission.into_event(target));
        }
        if entity.is_terminated() {
            self.tasks[idx] = None;
            self.finished.push(target);
        }
    }

    fn await_next_event(&mut self) -> Option<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.periodic.then_some(Event::Tick)
    }

    fn reap_terminated(&mut self) -> Vec<TaskHandle> {
        std::mem::take(&mut self.finished)
    }

    fn schedule_periodic(&mut self, _interval: Duration) -> io::Result<()> {
        // Virtual time: a tick is produced whenever the FIFO is empty.
        self.periodic = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.periodic = false;
        self.pending.clear();
        for (idx, slot) in self.tasks.iter_mut().enumerate() {
            if let Some(mut entity) = slot.take() {
                entity.on_notice(Notice::Shutdown);
                self.finished.push(TaskHandle::from_raw(idx as u64));
            }
        }
    }
}
