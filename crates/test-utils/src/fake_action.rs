use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use siteflow::dag::{BatchReport, FileFailure, TaskAction};
use siteflow::errors::{Result, SiteflowError};

/// Shared event log: `"<name>:start"` / `"<name>:end"` entries in the order
/// they happened.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    Fail,
    FailOneFile,
    Hang,
}

/// A task action that records its start and end, optionally after a delay.
pub struct RecordingAction {
    name: String,
    delay: Duration,
    behaviour: Behaviour,
    log: EventLog,
}

impl RecordingAction {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            behaviour: Behaviour::Succeed,
            log: Arc::clone(log),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Resolve with an error after the delay.
    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::Fail;
        self
    }

    /// Succeed, but report one per-file failure.
    pub fn with_file_failure(mut self) -> Self {
        self.behaviour = Behaviour::FailOneFile;
        self
    }

    /// Never complete.
    pub fn hanging(mut self) -> Self {
        self.behaviour = Behaviour::Hang;
        self
    }

    pub fn shared(self) -> Arc<dyn TaskAction> {
        Arc::new(self)
    }

    fn push(&self, what: &str) {
        self.log.lock().unwrap().push(format!("{}:{what}", self.name));
    }
}

impl TaskAction for RecordingAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>> {
        Box::pin(async move {
            self.push("start");
            if self.behaviour == Behaviour::Hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(self.delay).await;
            self.push("end");

            match self.behaviour {
                Behaviour::Fail => Err(SiteflowError::TaskFailed {
                    task: self.name.clone(),
                    message: "boom".into(),
                }),
                Behaviour::FailOneFile => {
                    let mut report = BatchReport::empty();
                    report.failures.push(FileFailure {
                        path: format!("{}.src", self.name).into(),
                        message: "bad input".into(),
                    });
                    Ok(report)
                }
                _ => Ok(BatchReport::empty()),
            }
        })
    }
}
