// src/exec/backend.rs

//! Pluggable run backend.
//!
//! The watch runtime talks to a `RunBackend` instead of a [`Runner`]
//! directly. Production code uses [`RunnerBackend`]; tests provide a backend
//! that records which bindings started and reports completion themselves.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dag::{Composite, Runner};
use crate::engine::{BindingId, RunOutcome, WatchEvent};
use crate::errors::Result;
use crate::watch::WatchBinding;

/// Trait abstracting how a binding's composite gets executed.
///
/// Implementations must not block: start the run, return, and later send
/// [`WatchEvent::RunFinished`] for the same binding.
pub trait RunBackend: Send {
    fn start_run(&mut self, binding: BindingId)
    -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend that runs binding composites on the shared [`Runner`].
pub struct RunnerBackend {
    runner: Runner,
    composites: Arc<Vec<(String, Composite)>>,
    events_tx: mpsc::Sender<WatchEvent>,
}

impl RunnerBackend {
    pub fn new(
        runner: Runner,
        bindings: &[WatchBinding],
        events_tx: mpsc::Sender<WatchEvent>,
    ) -> Self {
        let composites = bindings
            .iter()
            .map(|b| (b.name().to_string(), b.composite().clone()))
            .collect();
        Self {
            runner,
            composites: Arc::new(composites),
            events_tx,
        }
    }
}

impl RunBackend for RunnerBackend {
    fn start_run(
        &mut self,
        binding: BindingId,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone handles so the spawned run does not borrow `self`.
        let runner = self.runner.clone();
        let composites = Arc::clone(&self.composites);
        let tx = self.events_tx.clone();

        Box::pin(async move {
            // Completions are sent from a spawned task: the runtime polling
            // this future is the channel's only reader.
            let Some((name, composite)) = composites.get(binding).cloned() else {
                warn!(binding, "no composite for binding; reporting failure");
                tokio::spawn(async move {
                    let outcome = RunOutcome::Failed("unknown binding".to_string());
                    if tx.send(WatchEvent::RunFinished { binding, outcome }).await.is_err() {
                        debug!(binding, "watch runtime gone; dropping completion");
                    }
                });
                return Ok(());
            };

            debug!(binding = %name, tree = %composite, "spawning watch run");
            tokio::spawn(async move {
                let outcome = match runner.run(&composite).await {
                    Ok(report) if report.is_clean() => RunOutcome::Success,
                    Ok(report) => RunOutcome::Failed(format!(
                        "{} file(s) failed to build",
                        report.failure_count()
                    )),
                    Err(e) => RunOutcome::Failed(e.to_string()),
                };
                if tx
                    .send(WatchEvent::RunFinished { binding, outcome })
                    .await
                    .is_err()
                {
                    debug!(binding = %name, "watch runtime gone; dropping completion");
                }
            });
            Ok(())
        })
    }
}
