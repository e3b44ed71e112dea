//! Messages exchanged between the controller and task entities.
//!
//! Inbound events are consumed one at a time by the runner; outbound notices
//! travel on each task's private inbox.

use serde::{Deserialize, Serialize};

use crate::substrate::TaskHandle;

/// Inbound event for the controller's single-consumer loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Periodic timer expiry; drives one epoch.
    Tick,
    /// Task finished its burst and wants to block for `duration` epochs.
    IoRequest { source: TaskHandle, duration: u64 },
    /// Task finished its burst and exited.
    Terminated { source: TaskHandle },
}

/// Notice delivered to a task entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Perform one unit of work.
    Permit,
    /// Simulated I/O finished; reset the burst.
    Wake,
    /// Process-wide shutdown; exit without further notifications.
    Shutdown,
}

/// Outbound notice produced by a controller handler, addressed to a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Directive {
    pub target: TaskHandle,
    pub notice: Notice,
}
