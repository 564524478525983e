// src/transform/styles.rs

//! Stylesheet steps: partial inlining and minification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::errors::{Result, SiteflowError};
use crate::fs::FileSystem;
use crate::watch::path_utils::normalize_lexically;
use crate::transform::{Asset, StepFuture, TransformStep};

/// Replaces `@import "partial";` with the partial's content, recursively.
///
/// Resolution follows the SCSS partial convention, relative to the importing
/// file: `name.scss`, `_name.scss`, `name` / `_name` when an extension is
/// given, then `name/_index.scss`. Plain `.css` and remote imports are left
/// for the browser.
#[derive(Debug, Clone)]
pub struct InlineImports {
    fs: Arc<dyn FileSystem>,
    import: Regex,
}

impl InlineImports {
    pub fn new(fs: Arc<dyn FileSystem>) -> Result<Self> {
        let import = Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?\s*;"#)
            .map_err(|e| SiteflowError::Other(e.into()))?;
        Ok(Self { fs, import })
    }

    /// Inline every import reachable from `entry`, whose content is `src`.
    pub fn inline(&self, entry: &Path, src: &str) -> Result<String> {
        let mut stack = vec![entry.to_path_buf()];
        self.inline_into(src, &mut stack)
    }

    fn inline_into(&self, src: &str, stack: &mut Vec<PathBuf>) -> Result<String> {
        let current = stack.last().cloned().unwrap_or_default();
        let dir = current.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut out = String::with_capacity(src.len());
        let mut last = 0;
        for caps in self.import.captures_iter(src) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if is_external(name) {
                continue;
            }

            out.push_str(&src[last..whole.start()]);
            last = whole.end();

            let partial = self.resolve(&dir, name).ok_or_else(|| {
                SiteflowError::transform(&current, format!("cannot resolve @import \"{name}\""))
            })?;
            if stack.contains(&partial) {
                return Err(SiteflowError::transform(
                    &current,
                    format!("circular @import of {}", partial.display()),
                ));
            }

            debug!(from = ?current, partial = ?partial, "inlining partial");
            let bytes = self.fs.read(&partial)?;
            let text = String::from_utf8(bytes).map_err(|e| {
                SiteflowError::transform(&partial, format!("not valid UTF-8: {e}"))
            })?;

            stack.push(partial);
            let inlined = self.inline_into(&text, stack)?;
            stack.pop();
            out.push_str(&inlined);
        }
        out.push_str(&src[last..]);
        Ok(out)
    }

    fn resolve(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let requested = normalize_lexically(&dir.join(name));
        let parent = requested.parent().map(Path::to_path_buf).unwrap_or_default();
        let file = requested.file_name()?.to_string_lossy().into_owned();

        let mut candidates = Vec::new();
        if Path::new(&file).extension().is_some() {
            candidates.push(parent.join(&file));
            candidates.push(parent.join(format!("_{file}")));
        } else {
            candidates.push(parent.join(format!("{file}.scss")));
            candidates.push(parent.join(format!("_{file}.scss")));
            candidates.push(requested.join("_index.scss"));
        }
        candidates.into_iter().find(|c| self.fs.is_file(c))
    }
}

fn is_external(name: &str) -> bool {
    name.ends_with(".css")
        || name.starts_with("http://")
        || name.starts_with("https://")
        || name.starts_with("//")
}

impl TransformStep for InlineImports {
    fn name(&self) -> &str {
        "inline-imports"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let bytes = self.inline(&asset.source, asset.text()?)?.into_bytes();
            Ok(Asset { bytes, ..asset })
        })
    }
}

/// Strips comments and insignificant whitespace from CSS.
///
/// `/*! ... */` comments are kept. Strings are copied untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyCss;

const NO_SPACE_BEFORE: &[char] = &['{', '}', ';', ',', '>'];
const NO_SPACE_AFTER: &[char] = &['{', '}', ';', ',', '>', ':'];

pub fn minify_css(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut pending_space = false;
    let mut chars = src.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        if c == '/' && src[i..].starts_with("/*") {
            let end = src[i + 2..].find("*/").map(|e| i + 2 + e + 2).unwrap_or(src.len());
            if src[i..].starts_with("/*!") {
                out.push_str(&src[i..end]);
                pending_space = false;
            }
            while chars.peek().is_some_and(|(j, _)| *j < end) {
                chars.next();
            }
            continue;
        }

        if pending_space {
            let after_punct = out.chars().last().is_none_or(|l| NO_SPACE_AFTER.contains(&l))
                || out.ends_with("*/");
            if !after_punct && !NO_SPACE_BEFORE.contains(&c) {
                out.push(' ');
            }
            pending_space = false;
        }

        if c == '}' && out.ends_with(';') {
            out.pop();
        }
        out.push(c);

        if c == '"' || c == '\'' {
            let mut escaped = false;
            for (_, s) in chars.by_ref() {
                out.push(s);
                if escaped {
                    escaped = false;
                } else if s == '\\' {
                    escaped = true;
                } else if s == c {
                    break;
                }
            }
        }
    }
    out
}

impl TransformStep for MinifyCss {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let bytes = minify_css(asset.text()?).into_bytes();
            Ok(Asset { bytes, ..asset })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn inliner(fs: &MockFileSystem) -> InlineImports {
        InlineImports::new(Arc::new(fs.clone())).unwrap()
    }

    #[test]
    fn inlines_partials_recursively() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/scss/_vars.scss", "$c: red;");
        fs.add_file("/s/scss/parts/_nav.scss", "@import \"../vars\";\nnav{}");

        let out = inliner(&fs)
            .inline(
                Path::new("/s/scss/main.scss"),
                "@import 'parts/nav';\n@import \"reset.css\";\nbody{}",
            )
            .unwrap();

        assert_eq!(out, "$c: red;\nnav{}\n@import \"reset.css\";\nbody{}");
    }

    #[test]
    fn index_partial_is_resolved() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/scss/base/_index.scss", "html{}");
        let out = inliner(&fs)
            .inline(Path::new("/s/scss/main.scss"), "@import 'base';")
            .unwrap();
        assert_eq!(out, "html{}");
    }

    #[test]
    fn missing_partial_is_a_transform_error() {
        let fs = MockFileSystem::new();
        let err = inliner(&fs)
            .inline(Path::new("/s/scss/main.scss"), "@import 'ghost';")
            .unwrap_err();
        match err {
            SiteflowError::Transform { path, message } => {
                assert_eq!(path, PathBuf::from("/s/scss/main.scss"));
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn circular_import_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/_a.scss", "@import 'b';");
        fs.add_file("/s/_b.scss", "@import 'a';");
        let err = inliner(&fs)
            .inline(Path::new("/s/main.scss"), "@import 'a';")
            .unwrap_err();
        assert!(matches!(err, SiteflowError::Transform { ref message, .. } if message.contains("circular")));
    }

    #[test]
    fn minifies_rules() {
        let css = "a {\n  color: red;\n  margin: 0 auto;\n}\n/* note */\nb > i { x: y }";
        assert_eq!(minify_css(css), "a{color:red;margin:0 auto}b>i{x:y}");
    }

    #[test]
    fn keeps_strings_and_license_comments() {
        let css = "/*! MIT */\na::after { content: \"  ;  }  \"; }";
        assert_eq!(minify_css(css), "/*! MIT */a::after{content:\"  ;  }  \"}");
    }

    #[test]
    fn no_space_after_kept_comment() {
        let css = "/*! v1 */\n\n  body { margin: 0 }\n/*! end */\n  p { b: c }";
        assert_eq!(minify_css(css), "/*! v1 */body{margin:0}/*! end */p{b:c}");
    }

    #[test]
    fn descendant_pseudo_selector_keeps_space() {
        assert_eq!(minify_css("nav  :hover { a: b; }"), "nav :hover{a:b}");
    }
}
