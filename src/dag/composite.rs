// src/dag/composite.rs

//! Series / parallel composition trees.

use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// A tree of tasks. Leaves are registered task names; inner nodes run their
/// children in order (`Series`) or concurrently (`Parallel`).
///
/// Named composites are expanded when resolved through
/// [`TaskGraph::task`](crate::dag::TaskGraph::task), so a tree never refers to
/// another composite by name and cannot contain itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composite {
    Task(TaskName),
    Series(Vec<Composite>),
    Parallel(Vec<Composite>),
}

impl Composite {
    pub fn task(name: impl Into<TaskName>) -> Self {
        Composite::Task(name.into())
    }

    pub fn series(units: impl IntoIterator<Item = Composite>) -> Self {
        Composite::Series(units.into_iter().collect())
    }

    pub fn parallel(units: impl IntoIterator<Item = Composite>) -> Self {
        Composite::Parallel(units.into_iter().collect())
    }

    /// Leaf task names in depth-first order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Composite::Task(name) => out.push(name),
            Composite::Series(units) | Composite::Parallel(units) => {
                for unit in units {
                    unit.collect_leaves(out);
                }
            }
        }
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, units) = match self {
            Composite::Task(name) => return f.write_str(name),
            Composite::Series(units) => ("series", units),
            Composite::Parallel(units) => ("parallel", units),
        };
        write!(f, "{label}(")?;
        for (i, unit) in units.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{unit}")?;
        }
        f.write_str(")")
    }
}
