//! Task entity: a simulated program that works only when permitted.
//!
//! The entity is a pure state machine. Substrates decide where it lives (its
//! own thread, or inline in the deterministic driver) and feed it notices.
//!
//! ```text
//!  WaitingForPermission --Permit--> RunningUnit --burst>0--> WaitingForPermission
//!                                        |
//!                                        +--burst==0, terminate--> Terminated
//!                                        +--burst==0, I/O-------> BlockedOnIo --Wake--> WaitingForPermission
//! ```

use tracing::trace;

use super::entropy::Entropy;
use crate::scheduler::event::{Event, Notice};
use crate::scheduler::pcb::TaskId;
use crate::substrate::TaskHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskPhase {
    WaitingForPermission,
    RunningUnit,
    BlockedOnIo,
    Terminated,
}

/// Notification the entity raises towards the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emission {
    IoRequest { duration: u64 },
    Terminate,
}

impl Emission {
    pub fn into_event(self, source: TaskHandle) -> Event {
        match self {
            Self::IoRequest { duration } => Event::IoRequest { source, duration },
            Self::Terminate => Event::Terminated { source },
        }
    }
}

pub struct TaskEntity {
    id: TaskId,
    initial_burst: u32,
    burst: u32,
    phase: TaskPhase,
    entropy: Box<dyn Entropy>,
}

impl TaskEntity {
    /// Draw the initial burst and start waiting for permission.
    pub fn new(id: TaskId, mut entropy: Box<dyn Entropy>) -> Self {
        let initial_burst = entropy.initial_burst().max(1);
        trace!(task = %id, burst = initial_burst, "task started");
        Self {
            id,
            initial_burst,
            burst: initial_burst,
            phase: TaskPhase::WaitingForPermission,
            entropy,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[inline(always)]
    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    #[inline(always)]
    pub fn burst(&self) -> u32 {
        self.burst
    }

    #[inline(always)]
    pub fn initial_burst(&self) -> u32 {
        self.initial_burst
    }

    #[inline(always)]
    pub fn is_terminated(&self) -> bool {
        self.phase == TaskPhase::Terminated
    }

    /// Feed one notice; returns the notification to send back, if any.
    pub fn on_notice(&mut self, notice: Notice) -> Option<Emission> {
        match notice {
            Notice::Permit => self.on_permit(),
            Notice::Wake => {
                self.on_wake();
                None
            }
            Notice::Shutdown => {
                self.phase = TaskPhase::Terminated;
                None
            }
        }
    }

    /// Perform one unit of work.
    ///
    /// A permit is a no-op unless the entity is waiting with burst left; a
    /// late or duplicated permit can never double-decrement.
    pub fn on_permit(&mut self) -> Option<Emission> {
        if self.phase != TaskPhase::WaitingForPermission || self.burst == 0 {
            trace!(task = %self.id, phase = ?self.phase, "permit ignored");
            return None;
        }

        self.phase = TaskPhase::RunningUnit;
        self.burst -= 1;
        trace!(task = %self.id, burst = self.burst, "unit of work done");

        if self.burst > 0 {
            self.phase = TaskPhase::WaitingForPermission;
            return None;
        }

        if self.entropy.terminate_after_burst() {
            self.phase = TaskPhase::Terminated;
            trace!(task = %self.id, "burst finished, exiting");
            Some(Emission::Terminate)
        } else {
            let duration = self.entropy.io_duration();
            self.phase = TaskPhase::BlockedOnIo;
            trace!(task = %self.id, duration, "burst finished, requesting I/O");
            Some(Emission::IoRequest { duration })
        }
    }

    /// I/O finished: restore the original burst. Ignored unless blocked.
    pub fn on_wake(&mut self) -> bool {
        if self.phase != TaskPhase::BlockedOnIo {
            trace!(task = %self.id, phase = ?self.phase, "wake ignored");
            return false;
        }
        self.burst = self.initial_burst;
        self.phase = TaskPhase::WaitingForPermission;
        trace!(task = %self.id, burst = self.burst, "woken with fresh burst");
        true
    }
}

impl std::fmt::Debug for TaskEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEntity")
            .field("id", &self.id)
            .field("initial_burst", &self.initial_burst)
            .field("burst", &self.burst)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::entropy::{BurstOutcome, ScriptedEntropy, TaskScript};

    fn entity(burst: u32, outcomes: Vec<BurstOutcome>) -> TaskEntity {
        let script = TaskScript { burst, outcomes };
        TaskEntity::new(TaskId::from_u32(0), Box::new(ScriptedEntropy::new(&script)))
    }

    #[test]
    fn counts_down_then_terminates() {
        let mut t = entity(3, vec![BurstOutcome::Terminate]);
        assert_eq!(t.on_permit(), None);
        assert_eq!(t.on_permit(), None);
        assert_eq!(t.on_permit(), Some(Emission::Terminate));
        assert!(t.is_terminated());
        assert_eq!(t.on_permit(), None);
    }

    #[test]
    fn io_blocks_until_wake() {
        let mut t = entity(1, vec![BurstOutcome::Io { duration: 4 }]);
        assert_eq!(t.on_permit(), Some(Emission::IoRequest { duration: 4 }));
        assert_eq!(t.phase(), TaskPhase::BlockedOnIo);
        // Permits while blocked do nothing.
        assert_eq!(t.on_permit(), None);
        assert_eq!(t.burst(), 0);
        assert!(t.on_wake());
        assert_eq!(t.burst(), 1);
        assert_eq!(t.phase(), TaskPhase::WaitingForPermission);
        assert_eq!(t.on_permit(), Some(Emission::Terminate));
    }

    #[test]
    fn stray_wake_is_ignored() {
        let mut t = entity(2, vec![]);
        assert!(!t.on_wake());
        assert_eq!(t.burst(), 2);
    }

    #[test]
    fn zero_burst_is_raised_to_one() {
        let t = entity(0, vec![]);
        assert_eq!(t.initial_burst(), 1);
    }

    #[test]
    fn shutdown_terminates_silently() {
        let mut t = entity(5, vec![]);
        assert_eq!(t.on_notice(Notice::Shutdown), None);
        assert!(t.is_terminated());
    }

    #[test]
    fn emission_maps_to_event() {
        let h = TaskHandle::from_raw(3);
        assert_eq!(
            Emission::IoRequest { duration: 2 }.into_event(h),
            Event::IoRequest {
                source: h,
                duration: 2
            }
        );
        assert_eq!(
            Emission::Terminate.into_event(h),
            Event::Terminated { source: h }
        );
    }
}
