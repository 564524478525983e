use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use siteflow::engine::{BindingId, RunOutcome, WatchEvent};
use siteflow::errors::Result;
use siteflow::exec::RunBackend;

/// A fake backend that:
/// - records which bindings were started
/// - reports `RunFinished(Success)` for each one after `run_time`.
pub struct FakeRunBackend {
    events_tx: mpsc::Sender<WatchEvent>,
    started: Arc<Mutex<Vec<BindingId>>>,
    run_time: Duration,
}

impl FakeRunBackend {
    pub fn new(
        events_tx: mpsc::Sender<WatchEvent>,
        started: Arc<Mutex<Vec<BindingId>>>,
        run_time: Duration,
    ) -> Self {
        Self {
            events_tx,
            started,
            run_time,
        }
    }
}

impl RunBackend for FakeRunBackend {
    fn start_run(
        &mut self,
        binding: BindingId,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.events_tx.clone();
        let run_time = self.run_time;
        self.started.lock().unwrap().push(binding);

        Box::pin(async move {
            tokio::spawn(async move {
                tokio::time::sleep(run_time).await;
                let _ = tx
                    .send(WatchEvent::RunFinished {
                        binding,
                        outcome: RunOutcome::Success,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
