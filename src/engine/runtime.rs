// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::RunBackend;

use super::core::{CoreCommand, WatchCore};
use super::WatchEvent;

/// Drives [`WatchCore`] in response to [`WatchEvent`]s and delegates the
/// actual composite runs to a [`RunBackend`].
///
/// All watch semantics live in the core; this struct only reads the channel
/// and dispatches commands.
pub struct WatchRuntime<B: RunBackend> {
    core: WatchCore,
    event_rx: mpsc::Receiver<WatchEvent>,
    backend: B,
}

impl<B: RunBackend> fmt::Debug for WatchRuntime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: RunBackend> WatchRuntime<B> {
    pub fn new(core: WatchCore, event_rx: mpsc::Receiver<WatchEvent>, backend: B) -> Self {
        Self {
            core,
            event_rx,
            backend,
        }
    }

    /// Main event loop. Returns the core so callers can inspect counters.
    pub async fn run(mut self) -> Result<WatchCore> {
        info!("watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "watch runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::StartRun(binding) => self.backend.start_run(binding).await?,
                }
            }

            if !step.keep_running {
                info!("shutdown requested; stopping watch runtime");
                return Ok(self.core);
            }
        }

        info!("watch event channel closed; exiting");
        Ok(self.core)
    }
}
