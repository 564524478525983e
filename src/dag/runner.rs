// src/dag/runner.rs

//! Executes composite trees against a [`TaskGraph`].

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::dag::composite::Composite;
use crate::dag::graph::TaskGraph;
use crate::dag::report::{RunReport, TaskRecord};
use crate::errors::{Result, SiteflowError};

type NodeFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Runs composites. Cheap to clone; clones share the graph.
///
/// - `Series`: children run strictly in order; the first error aborts the
///   remaining children and is returned immediately.
/// - `Parallel`: children run concurrently on the runtime; every child is
///   awaited, then the first error (in completion order) is returned.
/// - Every leaf is bounded by `task_timeout`, so a task that never completes
///   fails instead of stalling its series forever.
#[derive(Clone)]
pub struct Runner {
    graph: Arc<TaskGraph>,
    task_timeout: Duration,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("task_timeout", &self.task_timeout)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(graph: Arc<TaskGraph>, task_timeout: Duration) -> Self {
        Self {
            graph,
            task_timeout,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Resolve `name` and run it.
    pub async fn run_named(&self, name: &str) -> Result<RunReport> {
        let composite = self.graph.task(name)?;
        self.run(&composite).await
    }

    /// Run a composite to completion.
    ///
    /// On failure the error is returned and the partial report is dropped;
    /// use [`Runner::run_with_report`] when both are needed.
    pub async fn run(&self, composite: &Composite) -> Result<RunReport> {
        let (result, report) = self.run_with_report(composite).await;
        result.map(|()| report)
    }

    /// Run a composite, returning the outcome alongside whatever executed.
    pub async fn run_with_report(&self, composite: &Composite) -> (Result<()>, RunReport) {
        let report = Arc::new(Mutex::new(RunReport::default()));
        debug!(tree = %composite, "running composite");

        let result = self.clone().run_node(composite.clone(), Arc::clone(&report)).await;

        let report = match Arc::try_unwrap(report) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
            Err(shared) => shared.lock().map(|r| r.clone()).unwrap_or_default(),
        };
        (result, report)
    }

    fn run_node(self, node: Composite, report: Arc<Mutex<RunReport>>) -> NodeFuture {
        Box::pin(async move {
            match node {
                Composite::Task(name) => self.run_leaf(name, report).await,
                Composite::Series(units) => {
                    for unit in units {
                        self.clone().run_node(unit, Arc::clone(&report)).await?;
                    }
                    Ok(())
                }
                Composite::Parallel(units) => {
                    let mut set = JoinSet::new();
                    for unit in units {
                        set.spawn(self.clone().run_node(unit, Arc::clone(&report)));
                    }

                    let mut first_error = None;
                    while let Some(joined) = set.join_next().await {
                        let outcome = joined.unwrap_or_else(|e| {
                            Err(SiteflowError::TaskFailed {
                                task: "<parallel>".to_string(),
                                message: format!("task panicked: {e}"),
                            })
                        });
                        if let Err(e) = outcome {
                            if first_error.is_none() {
                                first_error = Some(e);
                            } else {
                                warn!(error = %e, "additional failure in parallel group");
                            }
                        }
                    }

                    match first_error {
                        Some(e) => Err(e),
                        None => Ok(()),
                    }
                }
            }
        })
    }

    async fn run_leaf(&self, name: String, report: Arc<Mutex<RunReport>>) -> Result<()> {
        let action = self
            .graph
            .action(&name)
            .ok_or_else(|| SiteflowError::UnknownTask(name.clone()))?;

        info!(task = %name, "starting task");
        let started = Instant::now();

        let outcome = match timeout(self.task_timeout, action.run()).await {
            Ok(result) => result,
            Err(_) => Err(SiteflowError::TaskTimeout {
                task: name.clone(),
                timeout: self.task_timeout,
            }),
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(batch) => {
                info!(
                    task = %name,
                    written = batch.written.len(),
                    failed = batch.failures.len(),
                    cache_hits = batch.cache_hits,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "finished task"
                );
                if let Ok(mut guard) = report.lock() {
                    guard.tasks.push(TaskRecord {
                        name,
                        report: batch,
                        elapsed,
                    });
                }
                Ok(())
            }
            Err(e) => {
                error!(task = %name, error = %e, "task failed");
                Err(e)
            }
        }
    }
}
