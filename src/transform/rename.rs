// src/transform/rename.rs

use std::path::PathBuf;

use crate::transform::{Asset, StepFuture, TransformStep};

/// Rewrites the output file name as `<stem><suffix><extension>`.
///
/// `extension` includes its leading dot; `None` keeps the current one.
/// `main.scss` with suffix `.min` and extension `.css` → `main.min.css`;
/// `main.js` with extension `.min.js` → `main.min.js`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    suffix: String,
    extension: Option<String>,
}

impl Rename {
    pub fn new(suffix: impl Into<String>, extension: Option<String>) -> Self {
        Self {
            suffix: suffix.into(),
            extension,
        }
    }

    pub fn extension(extension: impl Into<String>) -> Self {
        Self::new("", Some(extension.into()))
    }

    pub fn renamed(&self, path: &std::path::Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match &self.extension {
            Some(ext) => ext.clone(),
            None => path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
        };
        path.with_file_name(format!("{stem}{}{ext}", self.suffix))
    }
}

impl TransformStep for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        let relative = self.renamed(&asset.relative);
        Box::pin(async move { Ok(Asset { relative, ..asset }) })
    }
}
