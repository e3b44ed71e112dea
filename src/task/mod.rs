//! Task entities and the randomness they draw from.

pub mod entity;
pub mod entropy;

pub use entity::{Emission, TaskEntity, TaskPhase};
pub use entropy::{
    BurstOutcome, Entropy, ScriptedEntropy, SeededEntropy, TaskScript, WorkloadProfile,
};
