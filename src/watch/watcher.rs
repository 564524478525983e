// src/watch/watcher.rs

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::WatchEvent;
use crate::errors::{Result, SiteflowError};
use crate::watch::event_handler::{Debouncer, bindings_for_path, is_relevant};
use crate::watch::patterns::WatchBinding;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Options for [`spawn_watcher`].
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Project root all globs are relative to.
    pub root: PathBuf,
    /// Directories (relative to `root`) whose events are dropped.
    pub ignored: Vec<PathBuf>,
    pub debounce: Duration,
}

/// Spawn a filesystem watcher that observes `root` recursively and sends
/// [`WatchEvent::BindingTriggered`] for every binding whose watch globs match
/// a changed path, once that binding has been quiet for `debounce`.
pub fn spawn_watcher(
    options: WatcherOptions,
    bindings: Vec<WatchBinding>,
    events_tx: mpsc::Sender<WatchEvent>,
) -> Result<WatcherHandle> {
    let WatcherOptions {
        root,
        ignored,
        debounce,
    } = options;
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = raw_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("siteflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("siteflow: file watch error: {err}"),
        },
        Config::default(),
    )
    .map_err(|e| SiteflowError::Other(e.into()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| SiteflowError::Other(e.into()))?;

    info!(root = ?root, bindings = bindings.len(), "file watcher started");

    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(debounce);

        loop {
            let deadline = debouncer.next_deadline().map(Instant::from_std);

            tokio::select! {
                maybe = raw_rx.recv() => {
                    let Some(event) = maybe else { break };
                    if !is_relevant(&event.kind) {
                        continue;
                    }
                    let now = std::time::Instant::now();
                    for path in &event.paths {
                        for binding in bindings_for_path(&root, &ignored, &bindings, path) {
                            debouncer.note(binding, now);
                        }
                    }
                }
                _ = sleep_until(deadline) => {
                    for binding in debouncer.take_due(std::time::Instant::now()) {
                        debug!(binding = %bindings[binding].name(), "debounced trigger");
                        if events_tx.send(WatchEvent::BindingTriggered { binding }).await.is_err() {
                            warn!("watch runtime channel closed; stopping watcher loop");
                            return;
                        }
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
