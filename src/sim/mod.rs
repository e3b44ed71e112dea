//! Deterministic simulation primitives.
//!
//! Purpose:
//! - Provide a stable RNG, a virtual epoch clock, and a bounded trace buffer.
//! - Keep runs replayable by avoiding OS time for anything that affects state.
//!
//! Invariants:
//! - `EpochClock` is monotonic and advances only through explicit ticks.
//! - `TraceRing` never exceeds its capacity and evicts oldest events first.
//! - `SimRng` is deterministic and remaps a zero seed to a non-zero state.

pub mod clock;
pub mod rng;
pub mod trace;

pub use clock::EpochClock;
pub use rng::SimRng;
pub use trace::{IgnoreReason, TraceEvent, TraceRing};
