// src/dag/mod.rs

//! Task graph: named tasks, series/parallel composition and execution.
//!
//! - [`composite`] holds the composition tree.
//! - [`graph`] is the registry of leaf tasks and named composites.
//! - [`runner`] executes trees with ordering guarantees and timeouts.
//! - [`report`] defines per-task and per-run results.

pub mod composite;
pub mod graph;
pub mod report;
pub mod runner;

pub use composite::{Composite, TaskName};
pub use graph::{FnAction, TaskAction, TaskGraph, action_fn};
pub use report::{BatchReport, FileFailure, RunReport, TaskRecord};
pub use runner::Runner;
