//! Virtual epoch clock for deterministic scheduling.
//!
//! The clock only advances when the controller handles a timer tick. Wake
//! deadlines are expressed in the same unit, so sleep expiry is reproducible
//! regardless of how fast the host delivers ticks.

/// Tick-based virtual clock. One tick is one scheduling epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EpochClock {
    now: u64,
}

impl EpochClock {
    /// Create a new clock at tick 0 (before the first epoch).
    pub fn new() -> Self {
        Self { now: 0 }
    }

    /// Current epoch number.
    #[inline(always)]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advance by one epoch and return the new epoch number.
    #[inline(always)]
    pub fn tick(&mut self) -> u64 {
        self.now = self.now.saturating_add(1);
        self.now
    }

    /// Absolute epoch `dt` epochs from now, saturating on overflow.
    #[inline(always)]
    pub fn deadline_after(&self, dt: u64) -> u64 {
        self.now.saturating_add(dt)
    }
}
