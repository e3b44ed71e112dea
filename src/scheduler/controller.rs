//! Round-robin controller: the only writer of scheduling state.
//!
//! The controller owns the PCB table, the ready queue, the sleep set, and the
//! global counters. It is a plain state machine with three entry points, one
//! per inbound event kind. The runner calls exactly one of them at a time, so
//! handlers never interleave and no locking is needed.
//!
//! # Epoch (timer tick)
//! 1. Expire due sleepers into READY with a fresh quantum, enqueue, wake them.
//! 2. Accrue one unit of wait time for every READY task.
//! 3. Clear `running_id` if it names a task that is no longer RUNNING.
//! 4. With nothing RUNNING, pop the next READY task and promote it.
//! 5. Grant the RUNNING task one unit of work and decrement its quantum
//!    (floored at zero).
//! 6. On quantum exhaustion: if every READY task also has an empty quantum,
//!    refresh all READY quanta; then demote the RUNNING task to READY and
//!    requeue it, and clear `running_id`.
//!
//! # Invariants (checked by [`Controller::check_invariants`])
//! - At most one PCB is RUNNING and `running_id` names it.
//! - Ready-queue membership matches READY exactly, without duplicates.
//! - Sleep-set membership matches SLEEP exactly.
//! - `alive_count` equals the number of non-DONE PCBs; DONE is absorbing.
//!
//! Outbound notices are appended to a caller-provided buffer in the order the
//! transitions happened; the runner forwards them to the substrate.

use tracing::{debug, info, trace, warn};

use super::event::{Directive, Event, Notice};
use super::pcb::{Pcb, PcbTable, TaskId, TaskState};
use super::ready_queue::ReadyQueue;
use super::report::Report;
use super::sleep_set::SleepSet;
use crate::error::InvariantViolation;
use crate::sim::clock::EpochClock;
use crate::sim::trace::{IgnoreReason, TraceEvent, TraceRing};
use crate::substrate::TaskHandle;

pub struct Controller {
    base_quantum: u32,
    pcbs: PcbTable,
    ready: ReadyQueue,
    sleeping: SleepSet,
    running: Option<TaskId>,
    alive: u32,
    clock: EpochClock,
    trace: TraceRing,
    report: Option<Report>,
}

impl Controller {
    /// Create one READY PCB per handle and enqueue them in id order.
    ///
    /// `base_quantum` is clamped to at least 1.
    ///
    /// # Panics
    ///
    /// Panics if there are more handles than `u32` task ids.
    pub fn new(handles: &[TaskHandle], base_quantum: u32, trace_capacity: usize) -> Self {
        let base_quantum = base_quantum.max(1);
        let n = handles.len();
        let alive = population(n);
        let mut ctl = Self {
            base_quantum,
            pcbs: PcbTable::new(handles, base_quantum),
            ready: ReadyQueue::with_capacity(n),
            sleeping: SleepSet::with_capacity(n),
            running: None,
            alive,
            clock: EpochClock::new(),
            trace: TraceRing::new(trace_capacity),
            report: None,
        };
        for idx in 0..n {
            ctl.enqueue(TaskId::from_u32(idx as u32));
        }
        ctl
    }

    /// Dispatch one inbound event to its handler.
    pub fn handle(&mut self, event: Event, out: &mut Vec<Directive>) {
        match event {
            Event::Tick => self.on_tick(out),
            Event::IoRequest { source, duration } => self.on_io_request(source, duration),
            Event::Terminated { source } => self.on_terminated(source),
        }
    }

    /// Run one scheduling epoch.
    pub fn on_tick(&mut self, out: &mut Vec<Directive>) {
        let epoch = self.clock.tick();
        self.record(TraceEvent::Tick { epoch });

        self.expire_sleepers(epoch, out);

        for pcb in self.pcbs.iter_mut() {
            if pcb.state == TaskState::Ready {
                pcb.wait_time += 1;
            }
        }

        if let Some(id) = self.running {
            if self.pcbs.state(id) != TaskState::Running {
                self.running = None;
                self.record(TraceEvent::StaleRunningCleared { task: id.as_u32() });
            }
        }

        if self.running.is_none() {
            self.select_next();
        }

        let Some(id) = self.running else {
            trace!(epoch, "no task to dispatch");
            return;
        };

        let pcb = self.pcbs.get_mut(id);
        out.push(Directive {
            target: pcb.handle,
            notice: Notice::Permit,
        });
        pcb.grants += 1;
        pcb.quantum_remaining = pcb.quantum_remaining.saturating_sub(1);
        let quantum_left = pcb.quantum_remaining;
        self.record(TraceEvent::Grant {
            task: id.as_u32(),
            quantum_left,
        });

        if quantum_left == 0 {
            self.on_quantum_exhausted(id);
        }
    }

    /// A task asked to block on simulated I/O for `duration` epochs.
    pub fn on_io_request(&mut self, source: TaskHandle, duration: u64) {
        let Some(id) = self.resolve(source) else {
            return;
        };
        match self.pcbs.state(id) {
            TaskState::Done => {
                self.ignore(id, IgnoreReason::AlreadyDone);
                return;
            }
            TaskState::Sleep => {
                self.ignore(id, IgnoreReason::AlreadySleeping);
                return;
            }
            TaskState::Ready | TaskState::Running => {}
        }

        self.ready.remove(id);
        let wake_at = self.clock.deadline_after(duration);
        self.sleeping.insert(id, wake_at);
        let pcb = self.pcbs.get_mut(id);
        pcb.state = TaskState::Sleep;
        pcb.io_blocks += 1;
        self.record(TraceEvent::IoBlock {
            task: id.as_u32(),
            wake_at,
        });

        if self.running == Some(id) {
            debug!(task = %id, "released from RUNNING");
            self.running = None;
        }
    }

    /// A task exited. The last exit builds the final report.
    pub fn on_terminated(&mut self, source: TaskHandle) {
        let Some(id) = self.resolve(source) else {
            return;
        };
        if self.pcbs.state(id) == TaskState::Done {
            self.ignore(id, IgnoreReason::AlreadyDone);
            return;
        }

        self.ready.remove(id);
        self.sleeping.remove(id);
        self.pcbs.get_mut(id).state = TaskState::Done;
        if self.running == Some(id) {
            self.running = None;
        }
        self.alive -= 1;
        self.record(TraceEvent::Terminate {
            task: id.as_u32(),
            alive: self.alive,
        });

        if self.alive == 0 {
            let epoch = self.clock.now();
            let report = Report::from_table(&self.pcbs, self.base_quantum, epoch);
            info!(
                epoch,
                mean_wait = report.mean_wait,
                total_wait = report.total_wait(),
                "all tasks finished"
            );
            self.report = Some(report);
            self.record(TraceEvent::Finished { epoch });
        }
    }

    /// Verify every structural invariant against the current state.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut running_seen: Option<TaskId> = None;
        let mut counted_alive = 0u32;
        for pcb in self.pcbs.iter() {
            if pcb.state.is_alive() {
                counted_alive += 1;
            }
            match pcb.state {
                TaskState::Running => {
                    if let Some(first) = running_seen {
                        return Err(InvariantViolation::MultipleRunning {
                            first,
                            second: pcb.id,
                        });
                    }
                    running_seen = Some(pcb.id);
                }
                TaskState::Ready if !self.ready.contains(pcb.id) => {
                    return Err(InvariantViolation::ReadyNotQueued { task: pcb.id });
                }
                TaskState::Sleep if !self.sleeping.contains(pcb.id) => {
                    return Err(InvariantViolation::SleepNotInSet { task: pcb.id });
                }
                _ => {}
            }
        }

        if running_seen != self.running {
            return Err(InvariantViolation::RunningMismatch {
                recorded: self.running,
                actual: running_seen,
            });
        }

        for id in self.ready.iter() {
            let state = self.pcbs.state(id);
            if state != TaskState::Ready {
                return Err(InvariantViolation::QueuedNotReady { task: id, state });
            }
        }

        for id in self.sleeping.iter() {
            let state = self.pcbs.state(id);
            if state != TaskState::Sleep {
                return Err(InvariantViolation::SleepingNotSleep { task: id, state });
            }
        }

        if counted_alive != self.alive {
            return Err(InvariantViolation::AliveMismatch {
                recorded: self.alive,
                counted: counted_alive,
            });
        }

        Ok(())
    }

    #[inline(always)]
    pub fn epoch(&self) -> u64 {
        self.clock.now()
    }

    #[inline(always)]
    pub fn base_quantum(&self) -> u32 {
        self.base_quantum
    }

    #[inline(always)]
    pub fn running(&self) -> Option<TaskId> {
        self.running
    }

    #[inline(always)]
    pub fn alive(&self) -> u32 {
        self.alive
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    pub fn pcb(&self, id: TaskId) -> &Pcb {
        self.pcbs.get(id)
    }

    pub fn pcbs(&self) -> &PcbTable {
        &self.pcbs
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn sleep_set(&self) -> &SleepSet {
        &self.sleeping
    }

    pub fn trace(&self) -> &TraceRing {
        &self.trace
    }

    /// Final report, available once every task is DONE.
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    fn expire_sleepers(&mut self, epoch: u64, out: &mut Vec<Directive>) {
        for id in self.sleeping.expire(epoch) {
            let pcb = self.pcbs.get_mut(id);
            debug_assert_eq!(pcb.state, TaskState::Sleep);
            pcb.state = TaskState::Ready;
            pcb.quantum_remaining = self.base_quantum;
            let target = pcb.handle;
            self.record(TraceEvent::Wake { task: id.as_u32() });
            self.enqueue(id);
            out.push(Directive {
                target,
                notice: Notice::Wake,
            });
        }
    }

    fn select_next(&mut self) {
        let pcbs = &self.pcbs;
        let popped = self.ready.pop(|id| pcbs.state(id));
        for stale in popped.stale {
            self.record(TraceEvent::StaleDropped {
                task: stale.as_u32(),
            });
        }
        let Some(id) = popped.task else {
            return;
        };
        self.record(TraceEvent::Dequeue { task: id.as_u32() });

        let pcb = self.pcbs.get_mut(id);
        pcb.state = TaskState::Running;
        pcb.quantum_remaining = self.base_quantum;
        self.running = Some(id);
        self.record(TraceEvent::Select {
            task: id.as_u32(),
            quantum: self.base_quantum,
        });
    }

    fn on_quantum_exhausted(&mut self, id: TaskId) {
        // Only READY quanta are considered; RUNNING/SLEEP/DONE are ignored.
        let all_ready_empty = self
            .pcbs
            .iter()
            .filter(|p| p.state == TaskState::Ready)
            .all(|p| p.quantum_remaining == 0);
        if all_ready_empty {
            let mut refreshed = 0u32;
            for pcb in self.pcbs.iter_mut() {
                if pcb.state == TaskState::Ready {
                    pcb.quantum_remaining = self.base_quantum;
                    refreshed += 1;
                }
            }
            if refreshed > 0 {
                self.record(TraceEvent::QuantumRefresh { refreshed });
            }
        }

        match self.pcbs.state(id) {
            TaskState::Done | TaskState::Sleep => {}
            _ => {
                self.pcbs.get_mut(id).state = TaskState::Ready;
                self.record(TraceEvent::Preempt { task: id.as_u32() });
                self.enqueue(id);
            }
        }
        self.running = None;
    }

    fn enqueue(&mut self, id: TaskId) {
        if self.ready.push(id, self.pcbs.state(id)) {
            self.record(TraceEvent::Enqueue { task: id.as_u32() });
        }
    }

    fn resolve(&mut self, source: TaskHandle) -> Option<TaskId> {
        let id = self.pcbs.lookup(source);
        if id.is_none() {
            warn!(handle = %source, "notification from unknown source dropped");
            self.record(TraceEvent::UnknownSource {
                handle: source.raw(),
            });
        }
        id
    }

    fn ignore(&mut self, id: TaskId, reason: IgnoreReason) {
        debug!(task = %id, ?reason, "notification ignored");
        self.record(TraceEvent::Ignored {
            task: id.as_u32(),
            reason,
        });
    }

    fn record(&mut self, ev: TraceEvent) {
        debug!(epoch = self.clock.now(), event = ?ev, "transition");
        self.trace.push(ev);
    }
}

fn population(n: usize) -> u32 {
    match u32::try_from(n) {
        Ok(alive) => alive,
        Err(_) => panic!("population {n} exceeds the u32 task id space"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(n: u64) -> Vec<TaskHandle> {
        (0..n).map(|i| TaskHandle::from_raw(100 + i)).collect()
    }

    fn id(n: u32) -> TaskId {
        TaskId::from_u32(n)
    }

    fn tick(ctl: &mut Controller) -> Vec<Directive> {
        let mut out = Vec::new();
        ctl.on_tick(&mut out);
        ctl.check_invariants().expect("invariants after tick");
        out
    }

    #[test]
    fn startup_enqueues_everyone_in_order() {
        let ctl = Controller::new(&handles(3), 2, 64);
        assert_eq!(
            ctl.ready_queue().iter().collect::<Vec<_>>(),
            vec![id(0), id(1), id(2)]
        );
        assert_eq!(ctl.alive(), 3);
        assert!(ctl.running().is_none());
        ctl.check_invariants().expect("startup invariants");
    }

    #[test]
    fn first_tick_selects_and_grants() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 3, 64);
        let out = tick(&mut ctl);
        assert_eq!(
            out,
            vec![Directive {
                target: hs[0],
                notice: Notice::Permit
            }]
        );
        assert_eq!(ctl.running(), Some(id(0)));
        assert_eq!(ctl.pcb(id(0)).quantum_remaining, 2);
        // Both were READY when the epoch started.
        assert_eq!(ctl.pcb(id(0)).wait_time, 1);
        assert_eq!(ctl.pcb(id(1)).wait_time, 1);
    }

    #[test]
    fn quantum_exhaustion_requeues_at_tail() {
        let mut ctl = Controller::new(&handles(2), 1, 64);
        tick(&mut ctl);
        assert!(ctl.running().is_none());
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Ready);
        assert_eq!(
            ctl.ready_queue().iter().collect::<Vec<_>>(),
            vec![id(1), id(0)]
        );
    }

    #[test]
    fn io_request_blocks_running_task() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 3, 64);
        tick(&mut ctl);
        ctl.on_io_request(hs[0], 2);
        ctl.check_invariants().expect("after io request");
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Sleep);
        assert_eq!(ctl.sleep_set().wake_at(id(0)), Some(3));
        assert!(ctl.running().is_none());
    }

    #[test]
    fn wake_resets_quantum_and_notifies() {
        let hs = handles(1);
        let mut ctl = Controller::new(&hs, 2, 64);
        tick(&mut ctl); // epoch 1
        ctl.on_io_request(hs[0], 1);
        let out = tick(&mut ctl); // epoch 2: wakes, then reselects
        assert_eq!(
            out,
            vec![
                Directive {
                    target: hs[0],
                    notice: Notice::Wake
                },
                Directive {
                    target: hs[0],
                    notice: Notice::Permit
                },
            ]
        );
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Running);
        assert_eq!(ctl.pcb(id(0)).quantum_remaining, 1);
    }

    #[test]
    fn unknown_source_is_dropped() {
        let mut ctl = Controller::new(&handles(2), 2, 64);
        let before: Vec<Pcb> = ctl.pcbs().iter().cloned().collect();
        ctl.on_io_request(TaskHandle::from_raw(9_999), 3);
        ctl.on_terminated(TaskHandle::from_raw(9_999));
        let after: Vec<Pcb> = ctl.pcbs().iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(ctl.alive(), 2);
        assert!(ctl
            .trace()
            .iter()
            .any(|e| matches!(e, TraceEvent::UnknownSource { handle: 9_999 })));
    }

    #[test]
    fn done_is_absorbing() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 2, 64);
        ctl.on_terminated(hs[1]);
        ctl.on_terminated(hs[1]);
        ctl.on_io_request(hs[1], 4);
        ctl.check_invariants().expect("after duplicate termination");
        assert_eq!(ctl.alive(), 1);
        assert_eq!(ctl.pcb(id(1)).state, TaskState::Done);
        for _ in 0..5 {
            tick(&mut ctl);
            assert_eq!(ctl.pcb(id(1)).state, TaskState::Done);
        }
    }

    #[test]
    fn last_termination_builds_report_once() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 1, 64);
        tick(&mut ctl);
        ctl.on_terminated(hs[0]);
        assert!(!ctl.is_finished());
        tick(&mut ctl);
        ctl.on_terminated(hs[1]);
        let report = ctl.report().expect("report");
        assert_eq!(report.epochs, 2);
        assert_eq!(report.tasks.len(), 2);
        ctl.on_terminated(hs[1]);
        let finished = ctl
            .trace()
            .iter()
            .filter(|e| matches!(e, TraceEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn idle_epoch_dispatches_nothing() {
        let hs = handles(1);
        let mut ctl = Controller::new(&hs, 2, 64);
        tick(&mut ctl);
        ctl.on_io_request(hs[0], 5);
        let out = tick(&mut ctl);
        assert!(out.is_empty());
        assert!(ctl.running().is_none());
    }

    #[test]
    fn zero_quantum_is_clamped() {
        let mut ctl = Controller::new(&handles(1), 0, 64);
        assert_eq!(ctl.base_quantum(), 1);
        tick(&mut ctl);
        assert!(ctl.running().is_none());
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Ready);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "exceeds the u32 task id space")]
    fn oversized_population_panics() {
        population(u32::MAX as usize + 1);
    }

    #[test]
    fn population_fits() {
        assert_eq!(population(0), 0);
        assert_eq!(population(u32::MAX as usize), u32::MAX);
    }

    #[test]
    fn stale_running_is_cleared_and_next_selected() {
        let mut ctl = Controller::new(&handles(2), 3, 64);
        tick(&mut ctl);
        assert_eq!(ctl.running(), Some(id(0)));

        // Leave `running` pointing at a task that is no longer RUNNING.
        ctl.pcbs.get_mut(id(0)).state = TaskState::Done;
        ctl.alive -= 1;

        tick(&mut ctl);
        assert_eq!(ctl.running(), Some(id(1)));
        assert_eq!(ctl.pcb(id(1)).state, TaskState::Running);
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Done);
        let events: Vec<_> = ctl.trace().iter().cloned().collect();
        let cleared = events
            .iter()
            .position(|e| *e == TraceEvent::StaleRunningCleared { task: 0 })
            .expect("stale running cleared");
        let selected = events
            .iter()
            .position(|e| matches!(e, TraceEvent::Select { task: 1, .. }))
            .expect("task 1 selected");
        assert!(cleared < selected);
    }

    #[test]
    fn io_request_while_sleeping_is_ignored() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 3, 64);
        tick(&mut ctl);
        ctl.on_io_request(hs[0], 2);
        assert_eq!(ctl.sleep_set().wake_at(id(0)), Some(3));
        assert_eq!(ctl.pcb(id(0)).io_blocks, 1);

        ctl.on_io_request(hs[0], 5);
        ctl.check_invariants().expect("after repeated io request");
        assert_eq!(ctl.pcb(id(0)).state, TaskState::Sleep);
        assert_eq!(ctl.sleep_set().wake_at(id(0)), Some(3));
        assert_eq!(ctl.pcb(id(0)).io_blocks, 1);
        assert!(ctl.trace().iter().any(|e| *e
            == TraceEvent::Ignored {
                task: 0,
                reason: IgnoreReason::AlreadySleeping
            }));
    }

    #[test]
    fn io_request_from_queued_task_leaves_queue() {
        let hs = handles(2);
        let mut ctl = Controller::new(&hs, 3, 64);
        ctl.on_io_request(hs[1], 2);
        ctl.check_invariants().expect("after io from READY task");
        assert!(!ctl.ready_queue().contains(id(1)));
        assert_eq!(ctl.ready_queue().len(), 1);
    }
}
