// src/transform/mod.rs

//! Per-category transform chains.
//!
//! Every step consumes an [`Asset`] and produces the next one. Steps are
//! stateless with respect to the build: options are fixed at construction
//! and the same input always yields the same output.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;

pub mod images;
pub mod markup;
pub mod rename;
pub mod styles;
pub mod task;

pub use images::{ConvertWebp, OptimizeImage};
pub use markup::MinifyHtml;
pub use rename::Rename;
pub use styles::{InlineImports, MinifyCss};
pub use task::{TransformTask, UpdateNotice};

/// A file travelling through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Absolute path of the source file this asset was read from.
    pub source: PathBuf,
    /// Output path relative to the category's output directory.
    pub relative: PathBuf,
    pub bytes: Vec<u8>,
}

impl Asset {
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|e| {
            crate::errors::SiteflowError::transform(&self.source, format!("not valid UTF-8: {e}"))
        })
    }
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<Asset>> + Send + 'a>>;

/// One stage of a transform chain: `transform(asset) → asset`.
pub trait TransformStep: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn apply(&self, asset: Asset) -> StepFuture<'_>;
}
