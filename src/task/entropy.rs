//! Pluggable randomness for task entities.
//!
//! A task draws three kinds of random values: its initial burst (once), the
//! terminate-or-I/O decision (each time a burst completes), and the I/O
//! duration. Production runs use [`SeededEntropy`]; tests use
//! [`ScriptedEntropy`] to force exact outcomes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::sim::rng::SimRng;

/// Source of every random decision a task entity makes.
///
/// Implementations are owned by exactly one task and may live on that task's
/// thread, hence `Send`.
pub trait Entropy: Send {
    /// Burst length drawn once at task start. Values below 1 are raised to 1.
    fn initial_burst(&mut self) -> u32;

    /// Called when a burst reaches zero: `true` terminates, `false` requests I/O.
    fn terminate_after_burst(&mut self) -> bool;

    /// Duration of the I/O request, in epochs.
    fn io_duration(&mut self) -> u64;
}

/// Ranges for seeded workload generation. All ranges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadProfile {
    pub burst_min: u32,
    pub burst_max: u32,
    pub io_min: u32,
    pub io_max: u32,
    /// Termination probability is `terminate_num / terminate_den`.
    pub terminate_num: u32,
    pub terminate_den: u32,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            burst_min: 1,
            burst_max: 10,
            io_min: 1,
            io_max: 5,
            terminate_num: 1,
            terminate_den: 2,
        }
    }
}

impl WorkloadProfile {
    /// Reject empty ranges and impossible probabilities.
    pub fn validate(&self) -> Result<(), String> {
        if self.burst_min == 0 || self.burst_min > self.burst_max {
            return Err(format!(
                "burst range {}..={} must be non-empty and start at 1 or more",
                self.burst_min, self.burst_max
            ));
        }
        if self.io_min > self.io_max {
            return Err(format!("io range {}..={} is empty", self.io_min, self.io_max));
        }
        if self.terminate_den == 0 || self.terminate_num > self.terminate_den {
            return Err(format!(
                "terminate probability {}/{} is not in [0, 1]",
                self.terminate_num, self.terminate_den
            ));
        }
        Ok(())
    }
}

/// Entropy backed by a per-task [`SimRng`] stream.
#[derive(Clone, Debug)]
pub struct SeededEntropy {
    rng: SimRng,
    profile: WorkloadProfile,
}

impl SeededEntropy {
    pub fn new(rng: SimRng, profile: WorkloadProfile) -> Self {
        Self { rng, profile }
    }
}

impl Entropy for SeededEntropy {
    fn initial_burst(&mut self) -> u32 {
        self.rng
            .gen_range_inclusive(self.profile.burst_min, self.profile.burst_max)
    }

    fn terminate_after_burst(&mut self) -> bool {
        self.rng
            .gen_bool(self.profile.terminate_num, self.profile.terminate_den)
    }

    fn io_duration(&mut self) -> u64 {
        u64::from(
            self.rng
                .gen_range_inclusive(self.profile.io_min, self.profile.io_max),
        )
    }
}

/// What a task does when a burst completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstOutcome {
    Terminate,
    Io { duration: u64 },
}

/// Forced behaviour for one task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskScript {
    pub burst: u32,
    /// Consumed in order, one per completed burst. Once exhausted the task
    /// terminates.
    pub outcomes: Vec<BurstOutcome>,
}

impl TaskScript {
    /// Task that runs one burst of `burst` units and exits.
    pub fn terminate_after(burst: u32) -> Self {
        Self {
            burst,
            outcomes: vec![BurstOutcome::Terminate],
        }
    }
}

/// Entropy that replays a [`TaskScript`].
#[derive(Clone, Debug)]
pub struct ScriptedEntropy {
    burst: u32,
    outcomes: VecDeque<BurstOutcome>,
    pending_io: Option<u64>,
}

impl ScriptedEntropy {
    pub fn new(script: &TaskScript) -> Self {
        Self {
            burst: script.burst,
            outcomes: script.outcomes.iter().copied().collect(),
            pending_io: None,
        }
    }
}

impl Entropy for ScriptedEntropy {
    fn initial_burst(&mut self) -> u32 {
        self.burst
    }

    fn terminate_after_burst(&mut self) -> bool {
        match self.outcomes.pop_front() {
            Some(BurstOutcome::Io { duration }) => {
                self.pending_io = Some(duration);
                false
            }
            Some(BurstOutcome::Terminate) | None => true,
        }
    }

    fn io_duration(&mut self) -> u64 {
        self.pending_io.take().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_values_respect_profile() {
        let profile = WorkloadProfile::default();
        let mut e = SeededEntropy::new(SimRng::new(11), profile);
        for _ in 0..500 {
            let b = e.initial_burst();
            assert!((1..=10).contains(&b));
            let d = e.io_duration();
            assert!((1..=5).contains(&d));
        }
    }

    #[test]
    fn scripted_replays_then_terminates() {
        let script = TaskScript {
            burst: 4,
            outcomes: vec![
                BurstOutcome::Io { duration: 3 },
                BurstOutcome::Io { duration: 7 },
            ],
        };
        let mut e = ScriptedEntropy::new(&script);
        assert_eq!(e.initial_burst(), 4);
        assert!(!e.terminate_after_burst());
        assert_eq!(e.io_duration(), 3);
        assert!(!e.terminate_after_burst());
        assert_eq!(e.io_duration(), 7);
        assert!(e.terminate_after_burst());
        assert!(e.terminate_after_burst());
    }

    #[test]
    fn profile_validation() {
        assert!(WorkloadProfile::default().validate().is_ok());
        let bad = WorkloadProfile {
            burst_min: 0,
            ..WorkloadProfile::default()
        };
        assert!(bad.validate().is_err());
        let bad = WorkloadProfile {
            terminate_num: 3,
            terminate_den: 2,
            ..WorkloadProfile::default()
        };
        assert!(bad.validate().is_err());
    }
}
