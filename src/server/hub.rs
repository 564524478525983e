// src/server/hub.rs

//! Reload signals shared between build tasks and connected browsers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::AssetCategory;
use crate::watch::path_utils::to_slash;

/// Receiver of "something changed" notifications from tasks.
///
/// One-shot builds use [`NoopSink`]; `default` mode hands tasks the
/// [`ReloadHub`] that feeds the dev server.
pub trait ReloadSink: Send + Sync {
    /// Ask every client to reload the page.
    fn reload(&self);
    /// Tell clients that `paths` of `category` were rewritten in place.
    fn stream_update(&self, category: AssetCategory, paths: &[PathBuf]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ReloadSink for NoopSink {
    fn reload(&self) {}
    fn stream_update(&self, _category: AssetCategory, _paths: &[PathBuf]) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Nothing has happened yet.
    Idle,
    Reload,
    Stream,
}

/// Latest signal; `seq` grows by one with every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSignal {
    pub seq: u64,
    pub kind: SignalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AssetCategory>,
    /// URL paths (`/assets/css/main.min.css`) for stream updates.
    pub paths: Vec<String>,
}

impl ReloadSignal {
    fn initial() -> Self {
        Self {
            seq: 0,
            kind: SignalKind::Idle,
            category: None,
            paths: Vec::new(),
        }
    }
}

/// Broadcasts reload signals over a tokio `watch` channel.
#[derive(Debug)]
pub struct ReloadHub {
    served_root: PathBuf,
    tx: watch::Sender<ReloadSignal>,
}

impl ReloadHub {
    /// `served_root` is the directory the dev server serves; stream paths
    /// are reported relative to it.
    pub fn new(served_root: impl Into<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(ReloadSignal::initial());
        Self {
            served_root: served_root.into(),
            tx,
        }
    }

    pub fn current(&self) -> ReloadSignal {
        self.tx.borrow().clone()
    }

    /// Wait until a signal newer than `since` exists, or `timeout` elapses.
    ///
    /// Returns the latest signal either way; callers compare `seq`.
    pub async fn wait_newer(&self, since: u64, timeout: Duration) -> ReloadSignal {
        let mut rx = self.tx.subscribe();
        let wait = rx.wait_for(|signal| signal.seq > since);
        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(signal)) => signal.clone(),
            // Timed out, or the sender is gone (cannot happen while `self` lives).
            _ => self.current(),
        }
    }

    fn publish(&self, kind: SignalKind, category: Option<AssetCategory>, paths: Vec<String>) {
        self.tx.send_modify(|signal| {
            signal.seq += 1;
            signal.kind = kind;
            signal.category = category;
            signal.paths = paths;
        });
    }

    fn url_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.served_root).unwrap_or(path);
        format!("/{}", to_slash(rel).trim_start_matches('/'))
    }
}

impl ReloadSink for ReloadHub {
    fn reload(&self) {
        self.publish(SignalKind::Reload, None, Vec::new());
        info!(seq = self.current().seq, "reload signalled");
    }

    fn stream_update(&self, category: AssetCategory, paths: &[PathBuf]) {
        let urls: Vec<String> = paths.iter().map(|p| self.url_path(p)).collect();
        debug!(%category, ?urls, "stream update");
        self.publish(SignalKind::Stream, Some(category), urls);
        info!(%category, seq = self.current().seq, "stream update signalled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_newer_exists() {
        let hub = ReloadHub::new("/site/dist");
        hub.reload();
        let signal = hub.wait_newer(0, Duration::from_secs(5)).await;
        assert_eq!(signal.seq, 1);
        assert_eq!(signal.kind, SignalKind::Reload);
    }

    #[tokio::test]
    async fn wait_times_out_with_current_signal() {
        let hub = ReloadHub::new("/site/dist");
        let signal = hub.wait_newer(0, Duration::from_millis(20)).await;
        assert_eq!(signal.seq, 0);
        assert_eq!(signal.kind, SignalKind::Idle);
    }

    #[test]
    fn stream_paths_are_relative_urls() {
        let hub = ReloadHub::new("/site/dist");
        hub.stream_update(
            AssetCategory::Styles,
            &[PathBuf::from("/site/dist/assets/css/main.min.css")],
        );
        let signal = hub.current();
        assert_eq!(signal.paths, vec!["/assets/css/main.min.css".to_string()]);
        assert_eq!(signal.category, Some(AssetCategory::Styles));

        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["kind"], "stream");
        assert_eq!(json["category"], "styles");
    }
}
