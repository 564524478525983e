// src/dag/graph.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::dag::composite::{Composite, TaskName};
use crate::dag::report::BatchReport;
use crate::errors::{Result, SiteflowError};
use crate::types::AssetCategory;

/// A zero-argument unit of build work.
///
/// Completion is the resolution of the returned future: `Ok` with the batch
/// report, or an error that fails the enclosing composite.
pub trait TaskAction: Send + Sync {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>>;

    /// Asset category this task builds, if any.
    fn category(&self) -> Option<AssetCategory> {
        None
    }
}

/// Adapter turning an async closure into a [`TaskAction`].
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<BatchReport>> + Send + 'static,
{
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + '_>> {
        Box::pin((self.f)())
    }
}

/// Wrap an async closure as a shareable task action.
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BatchReport>> + Send + 'static,
{
    Arc::new(FnAction { f })
}

/// Registry of named leaf tasks and named composites.
///
/// Composites are defined bottom-up: [`TaskGraph::define`] only accepts trees
/// whose leaves are already registered, and [`TaskGraph::task`] expands named
/// composites inline. A composite can therefore never reach itself.
#[derive(Default)]
pub struct TaskGraph {
    actions: BTreeMap<TaskName, Arc<dyn TaskAction>>,
    composites: BTreeMap<TaskName, Composite>,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.actions.keys().collect::<Vec<_>>())
            .field("composites", &self.composites)
            .finish()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `name` with a leaf action.
    pub fn register_task(
        &mut self,
        name: impl Into<TaskName>,
        action: Arc<dyn TaskAction>,
    ) -> Result<()> {
        let name = name.into();
        self.ensure_free(&name)?;
        debug!(task = %name, category = ?action.category(), "registered task");
        self.actions.insert(name, action);
        Ok(())
    }

    /// Register a named composite. Every leaf must already be registered.
    pub fn define(&mut self, name: impl Into<TaskName>, composite: Composite) -> Result<()> {
        let name = name.into();
        self.ensure_free(&name)?;
        for leaf in composite.leaves() {
            if !self.actions.contains_key(leaf) {
                return Err(SiteflowError::UnknownTask(format!(
                    "'{leaf}' (used by composite '{name}')"
                )));
            }
        }
        debug!(task = %name, tree = %composite, "defined composite");
        self.composites.insert(name, composite);
        Ok(())
    }

    /// Resolve a task or composite name into a runnable tree.
    pub fn task(&self, name: &str) -> Result<Composite> {
        if self.actions.contains_key(name) {
            return Ok(Composite::task(name));
        }
        self.composites
            .get(name)
            .cloned()
            .ok_or_else(|| SiteflowError::UnknownTask(name.to_string()))
    }

    /// `series` over names, resolved through [`TaskGraph::task`].
    pub fn series(&self, names: &[&str]) -> Result<Composite> {
        let units = names.iter().map(|n| self.task(n)).collect::<Result<Vec<_>>>()?;
        Ok(Composite::series(units))
    }

    /// `parallel` over names, resolved through [`TaskGraph::task`].
    pub fn parallel(&self, names: &[&str]) -> Result<Composite> {
        let units = names.iter().map(|n| self.task(n)).collect::<Result<Vec<_>>>()?;
        Ok(Composite::parallel(units))
    }

    pub fn action(&self, name: &str) -> Option<Arc<dyn TaskAction>> {
        self.actions.get(name).cloned()
    }

    /// Whether `name` is a registered task or a defined composite.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name) || self.composites.contains_key(name)
    }

    pub fn composites(&self) -> impl Iterator<Item = (&str, &Composite)> {
        self.composites.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Err(SiteflowError::DuplicateTask(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn TaskAction> {
        action_fn(|| async { Ok(BatchReport::empty()) })
    }

    #[test]
    fn composites_expand_inline() {
        let mut graph = TaskGraph::new();
        graph.register_task("a", noop()).unwrap();
        graph.register_task("b", noop()).unwrap();
        let ab = graph.parallel(&["a", "b"]).unwrap();
        graph.define("ab", ab).unwrap();

        let tree = graph.series(&["ab", "a"]).unwrap();
        assert_eq!(tree.to_string(), "series(parallel(a, b), a)");
    }

    #[test]
    fn unknown_names_fail_at_wiring_time() {
        let mut graph = TaskGraph::new();
        graph.register_task("a", noop()).unwrap();

        let err = graph.series(&["a", "missing"]).unwrap_err();
        assert!(matches!(err, SiteflowError::UnknownTask(ref n) if n == "missing"));

        let err = graph
            .define("broken", Composite::series([Composite::task("ghost")]))
            .unwrap_err();
        assert!(matches!(err, SiteflowError::UnknownTask(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = TaskGraph::new();
        graph.register_task("a", noop()).unwrap();
        assert!(matches!(
            graph.register_task("a", noop()),
            Err(SiteflowError::DuplicateTask(_))
        ));
        assert!(matches!(
            graph.define("a", Composite::task("a")),
            Err(SiteflowError::DuplicateTask(_))
        ));

        let tree = graph.series(&["a"]).unwrap();
        graph.define("seq", tree.clone()).unwrap();
        assert!(graph.contains("a") && graph.contains("seq") && !graph.contains("b"));
        assert!(matches!(graph.define("seq", tree), Err(SiteflowError::DuplicateTask(_))));
    }
}
