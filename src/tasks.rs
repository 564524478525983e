// src/tasks.rs

//! Wiring: turns a validated [`ConfigFile`] into the task graph and the
//! watch bindings that drive it.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheLayer, CachedStep};
use crate::config::ConfigFile;
use crate::config::validate::composite_definition_order;
use crate::dag::{BatchReport, Composite, TaskAction, TaskGraph};
use crate::errors::Result;
use crate::exec::CommandStep;
use crate::fs::FileSystem;
use crate::server::ReloadSink;
use crate::transform::{
    ConvertWebp, InlineImports, MinifyCss, MinifyHtml, OptimizeImage, Rename, TransformTask,
    UpdateNotice,
};
use crate::types::AssetCategory;
use crate::watch::WatchBinding;

/// Names registered by [`build_task_graph`] before any user composite.
pub const BUILTIN_TASK_NAMES: &[&str] = &[
    "html", "css", "js", "images", "webp", "fonts", "favicon", "clear", "reload", "build",
];

/// Build once, then serve and watch. Handled by the CLI, not the graph.
pub const DEFAULT_TASK: &str = "default";

/// Shared collaborators handed to every task.
#[derive(Clone)]
pub struct BuildContext {
    /// Project root; every configured path is relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub cache: Arc<CacheLayer>,
    pub sink: Arc<dyn ReloadSink>,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.root)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Register every built-in task, the `build` composite and all
/// `[task.<name>]` composites.
pub fn build_task_graph(cfg: &ConfigFile, ctx: &BuildContext) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();

    for category in AssetCategory::ALL {
        let task = category_task(cfg, ctx, category)?;
        graph.register_task(category.task_name(), Arc::new(task))?;
    }
    graph.register_task("webp", Arc::new(webp_task(cfg, ctx)))?;
    graph.register_task(
        "clear",
        Arc::new(ClearTask {
            build_root: ctx.root.join(&cfg.config.build_root),
            fs: Arc::clone(&ctx.fs),
            cache: Arc::clone(&ctx.cache),
        }),
    )?;
    graph.register_task(
        "reload",
        Arc::new(ReloadTask {
            sink: Arc::clone(&ctx.sink),
        }),
    )?;

    let build = graph.parallel(&["html", "css", "js", "images", "webp", "fonts", "favicon"])?;
    graph.define("build", build)?;

    for name in composite_definition_order(&cfg.task)? {
        let Some(def) = cfg.task.get(&name) else {
            continue;
        };
        let members: Vec<&str> = def.members().iter().map(String::as_str).collect();
        let composite = if def.series.is_some() {
            graph.series(&members)?
        } else {
            graph.parallel(&members)?
        };
        graph.define(name, composite)?;
    }

    Ok(graph)
}

fn category_task(
    cfg: &ConfigFile,
    ctx: &BuildContext,
    category: AssetCategory,
) -> Result<TransformTask> {
    let spec = cfg.path_spec(category);
    let task = TransformTask::new(
        category.task_name(),
        category,
        &ctx.root,
        spec,
        Arc::clone(&ctx.fs),
    );

    let task = match category {
        AssetCategory::Markup => with_command(task, cfg.markup.cmd.as_deref())
            .step(MinifyHtml::new(&cfg.markup)?),
        AssetCategory::Styles => {
            let task = task.step(InlineImports::new(Arc::clone(&ctx.fs))?);
            let task = with_command(task, cfg.styles.cmd.as_deref());
            let task = if cfg.styles.minify { task.step(MinifyCss) } else { task };
            task.step(Rename::new(cfg.styles.suffix.clone(), Some(".css".to_string())))
                .notify(Arc::clone(&ctx.sink), UpdateNotice::Stream)
        }
        AssetCategory::Scripts => with_command(task, cfg.scripts.cmd.as_deref())
            .step(Rename::extension(cfg.scripts.extension.clone())),
        AssetCategory::Images => task
            .step(CachedStep::new(
                OptimizeImage::new(&cfg.images),
                Arc::clone(&ctx.cache),
            ))
            .cache(Arc::clone(&ctx.cache)),
        AssetCategory::Fonts | AssetCategory::Favicon => task,
    };
    Ok(task)
}

fn with_command(task: TransformTask, cmd: Option<&str>) -> TransformTask {
    match cmd {
        Some(cmd) => task.step(CommandStep::new(cmd)),
        None => task,
    }
}

fn webp_task(cfg: &ConfigFile, ctx: &BuildContext) -> TransformTask {
    TransformTask::new(
        "webp",
        AssetCategory::Images,
        &ctx.root,
        cfg.path_spec(AssetCategory::Images),
        Arc::clone(&ctx.fs),
    )
    .output_dir(cfg.webp_output().clone())
    .step(ConvertWebp)
    .step(Rename::extension(".webp"))
}

/// Watch bindings: one per category, bound to the composite that rebuilds
/// it. Styles stream their update; every other category reloads afterwards.
/// A change to an image also refreshes its WebP copy.
pub fn watch_bindings(cfg: &ConfigFile, graph: &TaskGraph) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::new();
    for category in AssetCategory::ALL {
        let spec = cfg.path_spec(category);
        if spec.watch.is_empty() {
            continue;
        }
        let composite = match category {
            AssetCategory::Styles => graph.task(category.task_name())?,
            AssetCategory::Images => Composite::series([
                graph.parallel(&[category.task_name(), "webp"])?,
                graph.task("reload")?,
            ]),
            _ => graph.series(&[category.task_name(), "reload"])?,
        };
        bindings.push(WatchBinding::new(category.as_str(), &spec.watch, composite)?);
    }
    Ok(bindings)
}

/// Deletes the build root and every cache entry.
pub struct ClearTask {
    build_root: PathBuf,
    fs: Arc<dyn FileSystem>,
    cache: Arc<CacheLayer>,
}

impl TaskAction for ClearTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>> {
        Box::pin(async move {
            self.fs.remove_dir_all(&self.build_root)?;
            self.cache.clear_all()?;
            info!(build_root = ?self.build_root, "cleared build output and image cache");
            Ok(BatchReport::empty())
        })
    }
}

/// Asks connected browsers to reload.
pub struct ReloadTask {
    sink: Arc<dyn ReloadSink>,
}

impl TaskAction for ReloadTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>> {
        Box::pin(async move {
            self.sink.reload();
            Ok(BatchReport::empty())
        })
    }
}
