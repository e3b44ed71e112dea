//! Run configuration.
//!
//! `SimConfig` is plain data with a `Default` that matches the reference
//! workload: ten tasks, a quantum of three, bursts in `1..=10`, I/O in
//! `1..=5` epochs, and an even split between exiting and blocking.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::scheduler::pcb::TaskId;
use crate::sim::rng::SimRng;
use crate::task::{Entropy, ScriptedEntropy, SeededEntropy, TaskScript, WorkloadProfile};

pub const DEFAULT_BASE_QUANTUM: u32 = 3;
pub const DEFAULT_TASKS: usize = 10;
pub const DEFAULT_MAX_EPOCHS: u64 = 100_000;
pub const DEFAULT_TRACE_CAPACITY: usize = 4096;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// How task entities draw their random decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadPlan {
    /// Each task gets an independent stream forked from `seed`.
    Seeded { seed: u64, profile: WorkloadProfile },
    /// Task `i` replays `tasks[i]`.
    Scripted { tasks: Vec<TaskScript> },
}

impl WorkloadPlan {
    pub fn seeded(seed: u64) -> Self {
        Self::Seeded {
            seed,
            profile: WorkloadProfile::default(),
        }
    }

    /// Randomness for task `id`. Scripted plans fall back to a one-unit
    /// burst that terminates when `id` has no script.
    pub fn entropy_for(&self, id: TaskId) -> Box<dyn Entropy> {
        match self {
            Self::Seeded { seed, profile } => Box::new(SeededEntropy::new(
                SimRng::fork(*seed, u64::from(id.as_u32())),
                *profile,
            )),
            Self::Scripted { tasks } => match tasks.get(id.index()) {
                Some(script) => Box::new(ScriptedEntropy::new(script)),
                None => Box::new(ScriptedEntropy::new(&TaskScript::terminate_after(1))),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Population size `N`, fixed for the run.
    pub tasks: usize,
    pub base_quantum: u32,
    /// Hang guard: the run fails if tasks are still alive after this epoch.
    pub max_epochs: u64,
    /// Wall-clock spacing of ticks. Only the threaded substrate sleeps.
    pub tick_interval: Duration,
    pub trace_capacity: usize,
    /// Verify controller invariants after every event.
    pub check_invariants: bool,
    pub workload: WorkloadPlan,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tasks: DEFAULT_TASKS,
            base_quantum: DEFAULT_BASE_QUANTUM,
            max_epochs: DEFAULT_MAX_EPOCHS,
            tick_interval: DEFAULT_TICK_INTERVAL,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            check_invariants: true,
            workload: WorkloadPlan::seeded(0),
        }
    }
}

impl SimConfig {
    /// One task per script, with the given quantum.
    pub fn scripted(base_quantum: u32, scripts: Vec<TaskScript>) -> Self {
        Self {
            tasks: scripts.len(),
            base_quantum,
            workload: WorkloadPlan::Scripted { tasks: scripts },
            ..Self::default()
        }
    }

    /// `tasks` seeded tasks with the default profile.
    pub fn seeded(tasks: usize, base_quantum: u32, seed: u64) -> Self {
        Self {
            tasks,
            base_quantum,
            workload: WorkloadPlan::seeded(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |detail: String| Err(SimError::InvalidConfig { detail });
        if self.tasks == 0 {
            return invalid("population must contain at least one task".to_string());
        }
        if u32::try_from(self.tasks).is_err() {
            return invalid(format!("population {} does not fit in u32", self.tasks));
        }
        if self.base_quantum == 0 {
            return invalid("base quantum must be at least 1".to_string());
        }
        if self.max_epochs == 0 {
            return invalid("epoch cap must be at least 1".to_string());
        }
        match &self.workload {
            WorkloadPlan::Seeded { profile, .. } => {
                if let Err(detail) = profile.validate() {
                    return invalid(detail);
                }
            }
            WorkloadPlan::Scripted { tasks } => {
                if tasks.len() < self.tasks {
                    return invalid(format!(
                        "{} scripts for {} tasks",
                        tasks.len(),
                        self.tasks
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Interpret the optional quantum argument.
///
/// Reads like C `atoi`: leading whitespace, an optional sign, then the
/// longest run of digits; anything after it is ignored. Absent, digitless, or
/// non-positive values fall back to [`DEFAULT_BASE_QUANTUM`]; values beyond
/// `u32` saturate.
pub fn parse_base_quantum(arg: Option<&str>) -> u32 {
    arg.and_then(leading_integer)
        .filter(|&q| q > 0)
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
        .unwrap_or(DEFAULT_BASE_QUANTUM)
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for d in digits {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(d - b'0'));
    }
    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantum_defaults() {
        assert_eq!(parse_base_quantum(None), 3);
        assert_eq!(parse_base_quantum(Some("0")), 3);
        assert_eq!(parse_base_quantum(Some("-4")), 3);
        assert_eq!(parse_base_quantum(Some("abc")), 3);
        assert_eq!(parse_base_quantum(Some("5")), 5);
        assert_eq!(parse_base_quantum(Some(" 7 ")), 7);
        assert_eq!(parse_base_quantum(Some("99999999999")), u32::MAX);
    }

    #[test]
    fn quantum_reads_leading_digits_only() {
        assert_eq!(parse_base_quantum(Some("5abc")), 5);
        assert_eq!(parse_base_quantum(Some("4.7")), 4);
        assert_eq!(parse_base_quantum(Some("  +6ms")), 6);
        assert_eq!(parse_base_quantum(Some("-2x")), 3);
        assert_eq!(parse_base_quantum(Some("x5")), 3);
        assert_eq!(parse_base_quantum(Some("+")), 3);
        assert_eq!(parse_base_quantum(Some("")), 3);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_population() {
        let cfg = SimConfig {
            tasks: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_short_script_list() {
        let mut cfg = SimConfig::scripted(2, vec![TaskScript::terminate_after(1)]);
        cfg.tasks = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = SimConfig::seeded(4, 2, 77);
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SimConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(cfg, back);
    }
}
