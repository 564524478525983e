// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::CacheLayer;
use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::dag::{RunReport, Runner, TaskGraph};
use crate::engine::{WatchCore, WatchEvent, WatchRuntime};
use crate::errors::Result;
use crate::exec::RunnerBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::{DevServer, NoopSink, ReloadHub, ReloadSink};
use crate::tasks::{BuildContext, DEFAULT_TASK, build_task_graph, watch_bindings};
use crate::types::AssetCategory;
use crate::watch::path_utils::normalize_relative;
use crate::watch::{WatcherOptions, spawn_watcher};

/// How a completed invocation went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    /// Every task ran, but at least one source file failed to transform.
    HadFailures,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the task graph and its runner
/// - for `default`: the initial build, dev server, file watcher, and
///   Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<Outcome> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let root = config_root_dir(&config_path);
    let root = root.canonicalize().unwrap_or(root);
    let served_root = root.join(&cfg.config.build_root);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cache = Arc::new(CacheLayer::for_mode(
        cfg.images.cache,
        &root.join(&cfg.config.cache_dir),
        Arc::clone(&fs),
    ));
    let hub = Arc::new(ReloadHub::new(&served_root));
    let serving = args.task == DEFAULT_TASK;
    let sink: Arc<dyn ReloadSink> = if serving {
        hub.clone()
    } else {
        Arc::new(NoopSink)
    };

    let ctx = BuildContext {
        root: root.clone(),
        fs,
        cache,
        sink,
    };
    let graph = Arc::new(build_task_graph(&cfg, &ctx)?);
    let target = if serving { "build" } else { args.task.as_str() };
    let composite = graph.task(target)?;

    if args.dry_run {
        print_dry_run(&cfg, &root, &graph, &args.task)?;
        return Ok(Outcome::Clean);
    }

    let runner = Runner::new(
        Arc::clone(&graph),
        Duration::from_secs(cfg.config.task_timeout_secs),
    );

    if serving {
        return serve_and_watch(&cfg, root, served_root, runner, hub).await;
    }

    info!(task = %args.task, tree = %composite, "running task");
    let report = runner.run(&composite).await?;
    print_summary(&report);

    Ok(if report.is_clean() {
        Outcome::Clean
    } else {
        Outcome::HadFailures
    })
}

async fn serve_and_watch(
    cfg: &ConfigFile,
    root: PathBuf,
    served_root: PathBuf,
    runner: Runner,
    hub: Arc<ReloadHub>,
) -> Result<Outcome> {
    let build = runner.graph().task("build")?;
    match runner.run(&build).await {
        Ok(report) => print_summary(&report),
        Err(e) => warn!(error = %e, "initial build failed; serving what exists"),
    }

    let server = DevServer::serve(
        &served_root,
        &cfg.server.host,
        cfg.server.port,
        Arc::clone(&hub),
        Handle::current(),
    )?;
    println!("serving {} at {}", served_root.display(), server.url());

    let bindings = watch_bindings(cfg, runner.graph())?;
    let names = bindings.iter().map(|b| b.name().to_string()).collect();
    let (events_tx, events_rx) = mpsc::channel::<WatchEvent>(64);

    let ignored = [&cfg.config.build_root, &cfg.config.cache_dir]
        .into_iter()
        .filter_map(|p| normalize_relative(p))
        .collect();
    let _watcher = spawn_watcher(
        WatcherOptions {
            root,
            ignored,
            debounce: Duration::from_millis(cfg.watch.debounce_ms),
        },
        bindings.clone(),
        events_tx.clone(),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(WatchEvent::ShutdownRequested).await;
        });
    }

    let core = WatchCore::new(names, cfg.watch.triggered_while_running_behaviour);
    let backend = RunnerBackend::new(runner, &bindings, events_tx);
    WatchRuntime::new(core, events_rx, backend).run().await?;

    drop(server);
    info!("dev server stopped");
    Ok(Outcome::Clean)
}

/// Figure out the project root.
/// Currently: directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_summary(report: &RunReport) {
    for record in &report.tasks {
        let r = &record.report;
        if r.written.is_empty() && r.failures.is_empty() {
            continue;
        }
        println!(
            "{:<8} {} written, {} failed, {} cached ({} ms)",
            record.name,
            r.written.len(),
            r.failures.len(),
            r.cache_hits,
            record.elapsed.as_millis()
        );
        for failure in &r.failures {
            println!("  ! {}: {}", failure.path.display(), failure.message);
        }
    }
}

/// Print resolved paths and the composite tree without running anything.
fn print_dry_run(cfg: &ConfigFile, root: &Path, graph: &TaskGraph, task: &str) -> Result<()> {
    println!("siteflow dry-run");
    println!("  root = {}", root.display());
    println!("  build_root = {}", cfg.config.build_root.display());
    println!("  cache_dir = {} ({:?})", cfg.config.cache_dir.display(), cfg.images.cache);
    println!();

    println!("paths:");
    for category in AssetCategory::ALL {
        let spec = cfg.path_spec(category);
        println!("  - {category} ({})", category.task_name());
        println!("      input: {:?}", spec.input);
        println!("      output: {}", spec.output.display());
        if !spec.watch.is_empty() {
            println!("      watch: {:?}", spec.watch);
        }
    }
    println!("  - webp output: {}", cfg.webp_output().display());
    println!();

    if task == DEFAULT_TASK {
        println!("{DEFAULT_TASK}: build = {}", graph.task("build")?);
        println!(
            "  then serve on {}:{} and watch:",
            cfg.server.host, cfg.server.port
        );
        for binding in watch_bindings(cfg, graph)? {
            println!("    {} -> {}", binding.name(), binding.composite());
        }
    } else {
        println!("{task} = {}", graph.task(task)?);
    }

    let composites: Vec<_> = graph.composites().collect();
    if !composites.is_empty() {
        println!();
        println!("composites ({}):", composites.len());
        for (name, tree) in composites {
            println!("  {name} = {tree}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
