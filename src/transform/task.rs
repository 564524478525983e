// src/transform/task.rs

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::CacheLayer;
use crate::config::PathSpec;
use crate::dag::{BatchReport, FileFailure, TaskAction};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::server::{NoopSink, ReloadSink};
use crate::transform::{Asset, TransformStep};
use crate::types::AssetCategory;
use crate::watch::MatchedFile;
use crate::watch::collect_matching_files;

/// What a task announces after writing its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateNotice {
    #[default]
    None,
    /// `stream_update(category, written)`: clients patch in place.
    Stream,
}

/// Applies a fixed step chain to every file selected by a category's input
/// globs and writes the results below its output directory.
///
/// A file whose chain fails is recorded in the report and skipped; the rest
/// of the batch is still written.
pub struct TransformTask {
    name: String,
    category: AssetCategory,
    root: PathBuf,
    inputs: Vec<String>,
    output: PathBuf,
    steps: Vec<Arc<dyn TransformStep>>,
    fs: Arc<dyn FileSystem>,
    sink: Arc<dyn ReloadSink>,
    notice: UpdateNotice,
    cache: Option<Arc<CacheLayer>>,
}

impl fmt::Debug for TransformTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformTask")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("steps", &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("notice", &self.notice)
            .finish_non_exhaustive()
    }
}

impl TransformTask {
    /// A task with an empty chain: files are copied as-is.
    pub fn new(
        name: impl Into<String>,
        category: AssetCategory,
        root: impl Into<PathBuf>,
        spec: &PathSpec,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            root: root.into(),
            inputs: spec.input.clone(),
            output: spec.output.clone(),
            steps: Vec::new(),
            fs,
            sink: Arc::new(NoopSink),
            notice: UpdateNotice::None,
            cache: None,
        }
    }

    pub fn step(mut self, step: impl TransformStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn output_dir(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn notify(mut self, sink: Arc<dyn ReloadSink>, notice: UpdateNotice) -> Self {
        self.sink = sink;
        self.notice = notice;
        self
    }

    /// Report hit/miss deltas of `cache` for each run.
    pub fn cache(mut self, cache: Arc<CacheLayer>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Absolute output directory.
    pub fn output_root(&self) -> PathBuf {
        self.root.join(&self.output)
    }

    pub async fn execute(&self) -> Result<BatchReport> {
        let files = collect_matching_files(self.fs.as_ref(), &self.root, &self.inputs)?;
        let mut report = BatchReport::for_category(self.category);

        if files.is_empty() {
            info!(task = %self.name, category = %self.category, "no matching source files");
            return Ok(report);
        }

        let before = self.cache_counters();
        let output_root = self.output_root();

        for file in files {
            let source = file.path.clone();
            match self.process(file, &output_root).await {
                Ok(written) => {
                    debug!(task = %self.name, path = ?written, "wrote output");
                    report.written.push(written);
                }
                Err(e) => {
                    warn!(task = %self.name, path = ?source, error = %e, "transform failed; continuing");
                    report.failures.push(FileFailure {
                        path: source,
                        message: e.to_string(),
                    });
                }
            }
        }

        let after = self.cache_counters();
        report.cache_hits = after.0 - before.0;
        report.cache_misses = after.1 - before.1;

        if self.notice == UpdateNotice::Stream && !report.written.is_empty() {
            self.sink.stream_update(self.category, &report.written);
        }

        info!(
            task = %self.name,
            category = %self.category,
            written = report.written.len(),
            failed = report.failures.len(),
            "batch complete"
        );
        Ok(report)
    }

    async fn process(&self, file: MatchedFile, output_root: &Path) -> Result<PathBuf> {
        let bytes = self.fs.read(&file.path)?;
        let mut asset = Asset {
            source: file.path,
            relative: file.relative,
            bytes,
        };
        for step in &self.steps {
            asset = step.apply(asset).await?;
        }

        let target = output_root.join(&asset.relative);
        self.fs.write(&target, &asset.bytes)?;
        Ok(target)
    }

    fn cache_counters(&self) -> (u64, u64) {
        self.cache
            .as_ref()
            .map(|c| (c.hits(), c.misses()))
            .unwrap_or((0, 0))
    }
}

impl TaskAction for TransformTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>> {
        Box::pin(self.execute())
    }

    fn category(&self) -> Option<AssetCategory> {
        Some(self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::transform::{MinifyCss, Rename};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        streams: Mutex<Vec<(AssetCategory, Vec<PathBuf>)>>,
    }

    impl ReloadSink for RecordingSink {
        fn reload(&self) {}
        fn stream_update(&self, category: AssetCategory, paths: &[PathBuf]) {
            self.streams.lock().unwrap().push((category, paths.to_vec()));
        }
    }

    fn spec(input: &[&str], output: &str) -> PathSpec {
        PathSpec::new(input, output, &[])
    }

    #[tokio::test]
    async fn copies_with_relative_layout() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/fonts/a.woff2", "A");
        fs.add_file("/site/src/fonts/sub/b.woff2", "B");

        let task = TransformTask::new(
            "fonts",
            AssetCategory::Fonts,
            "/site",
            &spec(&["src/fonts/**/*"], "dist/fonts"),
            Arc::new(fs.clone()),
        );
        let report = task.execute().await.unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(fs.read(Path::new("/site/dist/fonts/sub/b.woff2")).unwrap(), b"B");
    }

    #[tokio::test]
    async fn empty_selection_writes_nothing() {
        let fs = MockFileSystem::new();
        let task = TransformTask::new(
            "html",
            AssetCategory::Markup,
            "/site",
            &spec(&["src/pages/*.html"], "dist"),
            Arc::new(fs.clone()),
        );
        let report = task.execute().await.unwrap();
        assert!(report.written.is_empty() && report.failures.is_empty());
        assert!(fs.file_paths().is_empty());
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch_and_stream_fires() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/css/a.css", "a { x: y; }");
        fs.add_file("/site/src/css/b.css", vec![0xff, 0xfe]);

        let sink = Arc::new(RecordingSink::default());
        let task = TransformTask::new(
            "css",
            AssetCategory::Styles,
            "/site",
            &spec(&["src/css/*.css"], "dist/css"),
            Arc::new(fs.clone()),
        )
        .step(MinifyCss)
        .step(Rename::new(".min", None))
        .notify(sink.clone(), UpdateNotice::Stream);

        let report = task.execute().await.unwrap();

        assert_eq!(report.written, vec![PathBuf::from("/site/dist/css/a.min.css")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, PathBuf::from("/site/src/css/b.css"));
        assert_eq!(fs.read(Path::new("/site/dist/css/a.min.css")).unwrap(), b"a{x:y}");

        let streams = sink.streams.lock().unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].0, AssetCategory::Styles);
    }
}
