//! Round-robin scheduling simulator CLI.
//!
//! Spawns a fixed population of simulated tasks and schedules them with a
//! round-robin controller until every task has exited, then prints each
//! task's accumulated wait time and the mean.
//!
//! # Output Format
//!
//! The report is written to stdout, either as text (one line per task, then
//! `mean wait: X.XX epochs`) or, with `--json`, as a single JSON object.
//! Transition logs go to stderr; `-v` or `RUST_LOG=debug` shows every one.
//!
//! # Exit Codes
//!
//! - `0`: Every task finished
//! - `1`: The run failed (spawn failure, epoch cap, invariant violation)
//! - `2`: Invalid arguments

use std::env;
use std::process;
use std::time::Duration;

use rrsched::config::{parse_base_quantum, SimConfig, WorkloadPlan};
use rrsched::logging;
use rrsched::runner::{run_deterministic, run_threaded};

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] [QUANTUM]

QUANTUM defaults to 3 when absent or not a positive integer.

OPTIONS:
    --tasks=<N>         Number of simulated tasks (default: 10)
    --seed=<S>          Workload seed (default: derived from the clock)
    --max-epochs=<N>    Fail if tasks are still alive after N epochs (default: 100000)
    --tick-ms=<N>       Wall-clock tick interval for --threaded (default: 10)
    --threaded          Run each task on its own thread
    --json              Print the report as JSON
    -v, --verbose       Log every scheduling transition
    --help, -h          Show this help message",
        exe.to_string_lossy()
    );
}

fn parse_flag<T: std::str::FromStr>(name: &str, value: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("invalid {name} value: {value}");
        process::exit(2);
    })
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ u64::from(process::id())
}

fn main() {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "rrsched".into());
    let mut quantum_arg: Option<String> = None;
    let mut tasks: Option<usize> = None;
    let mut seed: Option<u64> = None;
    let mut max_epochs: Option<u64> = None;
    let mut tick_ms: Option<u64> = None;
    let mut threaded = false;
    let mut json = false;
    let mut verbose = false;

    for arg in args {
        let flag = arg.to_string_lossy().into_owned();
        if let Some(value) = flag.strip_prefix("--tasks=") {
            let n: usize = parse_flag("--tasks", value);
            if n == 0 {
                eprintln!("--tasks must be >= 1");
                process::exit(2);
            }
            tasks = Some(n);
            continue;
        }
        if let Some(value) = flag.strip_prefix("--seed=") {
            seed = Some(parse_flag("--seed", value));
            continue;
        }
        if let Some(value) = flag.strip_prefix("--max-epochs=") {
            max_epochs = Some(parse_flag("--max-epochs", value));
            continue;
        }
        if let Some(value) = flag.strip_prefix("--tick-ms=") {
            tick_ms = Some(parse_flag("--tick-ms", value));
            continue;
        }
        match flag.as_str() {
            "--threaded" => {
                threaded = true;
                continue;
            }
            "--json" => {
                json = true;
                continue;
            }
            "-v" | "--verbose" => {
                verbose = true;
                continue;
            }
            "--help" | "-h" => {
                print_usage(&exe);
                process::exit(0);
            }
            _ if flag.starts_with("--") => {
                eprintln!("unknown flag: {flag}");
                print_usage(&exe);
                process::exit(2);
            }
            _ => {}
        }

        if quantum_arg.is_some() {
            print_usage(&exe);
            process::exit(2);
        }
        quantum_arg = Some(flag);
    }

    logging::init(verbose);

    let mut cfg = SimConfig {
        base_quantum: parse_base_quantum(quantum_arg.as_deref()),
        workload: WorkloadPlan::seeded(seed.unwrap_or_else(clock_seed)),
        ..SimConfig::default()
    };
    if let Some(n) = tasks {
        cfg.tasks = n;
    }
    if let Some(n) = max_epochs {
        cfg.max_epochs = n;
    }
    if let Some(ms) = tick_ms {
        cfg.tick_interval = Duration::from_millis(ms.max(1));
    }

    let result = if threaded {
        run_threaded(cfg)
    } else {
        run_deterministic(cfg)
    };

    match result {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        eprintln!("failed to encode report: {err}");
                        process::exit(1);
                    }
                }
            } else {
                println!("{report}");
            }
        }
        Err(err) => {
            eprintln!("simulation failed: {err}");
            process::exit(1);
        }
    }
}
