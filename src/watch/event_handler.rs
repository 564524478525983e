// src/watch/event_handler.rs

//! Event processing logic for file system changes.
//!
//! Everything here is synchronous and free of IO so the watcher loop stays a
//! thin shell: it filters raw `notify` events, maps paths onto bindings, and
//! lets the [`Debouncer`] decide when a burst is over.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::ModifyKind;
use tracing::debug;

use crate::engine::BindingId;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{WatchBinding, matching_bindings};

/// Only content-bearing events: creates, writes and renames.
pub fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Map a changed path onto the bindings it triggers.
///
/// Paths outside `root`, and paths under any of the `ignored` directories
/// (relative to `root`, e.g. the build root and the cache dir), trigger
/// nothing. This keeps a task's own output from re-triggering it.
pub fn bindings_for_path(
    root: &Path,
    ignored: &[PathBuf],
    bindings: &[WatchBinding],
    path: &Path,
) -> Vec<BindingId> {
    let Some(rel) = relative_str(root, path) else {
        debug!(?path, "event outside project root; ignoring");
        return Vec::new();
    };
    if ignored.iter().any(|dir| Path::new(&rel).starts_with(dir)) {
        return Vec::new();
    }
    let hits = matching_bindings(bindings, &rel);
    if !hits.is_empty() {
        debug!(%rel, ?hits, "watch match");
    }
    hits
}

/// Per-binding trailing-edge debounce.
///
/// Every event pushes the binding's deadline to `now + window`; a binding is
/// due once it has been quiet for a whole window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadlines: BTreeMap<BindingId, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: BTreeMap::new(),
        }
    }

    pub fn note(&mut self, binding: BindingId, now: Instant) {
        self.deadlines.insert(binding, now + self.window);
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every binding whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<BindingId> {
        let due: Vec<BindingId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(binding, _)| *binding)
            .collect();
        for binding in &due {
            self.deadlines.remove(binding);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
