// src/engine/mod.rs

//! Watch-mode engine.
//!
//! This module ties together:
//! - the per-binding state machine (`Idle → Running → Idle`)
//! - the trigger queue (what happens when a binding fires while it runs)
//! - the async event loop that reacts to:
//!   - debounced file-watch triggers
//!   - run completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Index of a watch binding in the list handed to the watcher.
pub type BindingId = usize;

/// Outcome of one composite run started by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(String),
}

/// Events flowing into the watch runtime from the watcher and from runs.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A binding's debounced watch globs matched a change.
    BindingTriggered { binding: BindingId },
    /// A run started for `binding` finished.
    RunFinished {
        binding: BindingId,
        outcome: RunOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{BindingState, CoreCommand, CoreStep, WatchCore};
pub use queue::TriggerQueue;
pub use runtime::WatchRuntime;
