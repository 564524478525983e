// tests/watch_runtime.rs
mod common;
use crate::common::fake_backend::FakeRunBackend;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use siteflow::dag::Composite;
use siteflow::engine::{WatchCore, WatchEvent, WatchRuntime};
use siteflow::types::TriggerWhileRunningBehaviour;
use siteflow::watch::{WatchBinding, WatcherOptions, spawn_watcher};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

const RUN_TIME: Duration = Duration::from_millis(100);

/// Fire `bursts` triggers for binding 0 in quick succession, let every run
/// settle, then shut down and return which bindings were started.
async fn burst(behaviour: TriggerWhileRunningBehaviour, bursts: usize) -> (Vec<usize>, WatchCore) {
    let (tx, rx) = mpsc::channel(64);
    let started = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&started), RUN_TIME);
    let core = WatchCore::new(vec!["markup".into(), "styles".into()], behaviour);
    let runtime = tokio::spawn(WatchRuntime::new(core, rx, backend).run());

    for _ in 0..bursts {
        tx.send(WatchEvent::BindingTriggered { binding: 0 }).await.unwrap();
    }
    tokio::time::sleep(RUN_TIME * 4).await;
    tx.send(WatchEvent::ShutdownRequested).await.unwrap();

    let core = runtime.await.unwrap().unwrap();
    let started = started.lock().unwrap().clone();
    (started, core)
}

#[tokio::test]
async fn triggers_during_a_run_coalesce_into_one_follow_up() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (started, core) = burst(TriggerWhileRunningBehaviour::Queue, 4).await;

        assert_eq!(started, vec![0, 0]);
        assert_eq!(core.runs_started(0), 2);
        assert_eq!(core.runs_started(1), 0);
        assert!(core.is_idle());
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn drop_mode_ignores_triggers_while_running() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (started, core) = burst(TriggerWhileRunningBehaviour::Drop, 4).await;

        assert_eq!(started, vec![0]);
        assert!(core.is_idle());
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn bindings_run_independently() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (tx, rx) = mpsc::channel(64);
        let started = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&started), RUN_TIME);
        let core = WatchCore::new(
            vec!["markup".into(), "styles".into()],
            TriggerWhileRunningBehaviour::Queue,
        );
        let runtime = tokio::spawn(WatchRuntime::new(core, rx, backend).run());

        tx.send(WatchEvent::BindingTriggered { binding: 0 }).await?;
        tx.send(WatchEvent::BindingTriggered { binding: 1 }).await?;
        tokio::time::sleep(RUN_TIME * 3).await;
        tx.send(WatchEvent::ShutdownRequested).await?;

        let core = runtime.await??;
        assert_eq!(*started.lock().unwrap(), vec![0, 1]);
        assert_eq!(core.runs_started(1), 1);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn file_changes_trigger_the_matching_binding_once() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("src/pages"))?;
        std::fs::create_dir_all(dir.path().join("dist"))?;

        let bindings = vec![
            WatchBinding::new("markup", &["src/pages/*.html".to_string()], Composite::task("html"))?,
            WatchBinding::new("styles", &["src/**/*.scss".to_string()], Composite::task("css"))?,
        ];
        let (tx, mut rx) = mpsc::channel(16);
        let _watcher = spawn_watcher(
            WatcherOptions {
                root: dir.path().to_path_buf(),
                ignored: vec!["dist".into()],
                debounce: Duration::from_millis(150),
            },
            bindings,
            tx,
        )?;

        // Let the backend register its watches before writing.
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(dir.path().join("dist/index.html"), "ignored")?;
        for i in 0..3 {
            std::fs::write(dir.path().join("src/pages/index.html"), format!("<p>{i}</p>"))?;
        }

        let event = rx.recv().await.ok_or("watcher channel closed")?;
        assert!(matches!(event, WatchEvent::BindingTriggered { binding: 0 }));

        // The burst was debounced into that single trigger.
        let extra = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(extra.is_err(), "unexpected extra event: {extra:?}");
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}
