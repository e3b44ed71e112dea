//! Real-thread runs. Slow relative to the deterministic substrate, so the
//! populations stay small and the tick interval short.

use std::time::Duration;

use rrsched::{run_threaded, Runner, SimConfig, TaskScript, TaskState, ThreadedSubstrate};

fn fast(cfg: SimConfig) -> SimConfig {
    SimConfig {
        tick_interval: Duration::from_millis(1),
        ..cfg
    }
}

#[test]
fn seeded_threaded_run_completes() {
    let report = run_threaded(fast(SimConfig::seeded(4, 2, 99))).expect("run completes");
    assert_eq!(report.tasks.len(), 4);
    let total: u64 = report.tasks.iter().map(|t| t.wait_time).sum();
    assert!((report.mean_wait - total as f64 / 4.0).abs() < 1e-9);
}

#[test]
fn every_thread_is_joined_after_run() {
    let cfg = fast(SimConfig::scripted(
        1,
        vec![
            TaskScript::terminate_after(2),
            TaskScript::terminate_after(3),
            TaskScript::terminate_after(1),
        ],
    ));
    let mut runner = Runner::new(cfg, ThreadedSubstrate::new());
    let report = runner.run().expect("run completes");

    assert_eq!(runner.substrate().live_threads(), 0);
    let ctl = runner.controller().expect("controller");
    assert!(ctl.pcbs().iter().all(|p| p.state == TaskState::Done));
    // Permits may race a task's own exit, so only a lower bound holds.
    let grants: u64 = report.tasks.iter().map(|t| t.grants).sum();
    assert!(grants >= 6);
}
