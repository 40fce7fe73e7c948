//! Load Generation Module
//!
//! Drives `/item` on a running server with configurable key patterns so the
//! policy modes can be compared under stampede conditions. Used by the
//! `loadgen` binary.

mod runner;
mod workload;

pub use runner::{run_phase, LoadClient, Phase, PhaseReport};
pub use workload::KeyPattern;
