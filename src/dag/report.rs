// src/dag/report.rs

//! Results produced by tasks and by composite runs.

use std::path::PathBuf;
use std::time::Duration;

use crate::dag::TaskName;
use crate::types::AssetCategory;

/// Per-file outcome of one task run.
///
/// A transform task never fails because of a single bad source file: that
/// file lands in `failures` and the rest of the batch is still written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub category: Option<AssetCategory>,
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

impl BatchReport {
    /// Report for a task that does not process files (`reload`, `clear`).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_category(category: AssetCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One executed leaf of a composite run.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub name: TaskName,
    pub report: BatchReport,
    pub elapsed: Duration,
}

/// Everything a composite run executed, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskRecord>,
}

impl RunReport {
    pub fn failure_count(&self) -> usize {
        self.tasks.iter().map(|t| t.report.failures.len()).sum()
    }

    pub fn written_count(&self) -> usize {
        self.tasks.iter().map(|t| t.report.written.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn record(&self, task: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.name == task)
    }
}
