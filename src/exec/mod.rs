// src/exec/mod.rs

//! Execution helpers: the run backend used by the watch runtime and the
//! external command step used by transform chains.

pub mod backend;
pub mod command;

pub use backend::{RunBackend, RunnerBackend};
pub use command::CommandStep;
