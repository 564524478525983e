// src/watch/patterns.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::dag::Composite;
use crate::errors::{Result, SiteflowError};
use crate::fs::FileSystem;
use crate::watch::path_utils::to_slash;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross directory separators; `**` does.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?.glob().clone());
    }
    builder.build().map_err(|source| SiteflowError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source| SiteflowError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

/// Leading components of `pattern` that contain no glob metacharacters.
///
/// `src/assets/images/**/*.png` → `src/assets/images`;
/// `src/favicon.ico` → `src/favicon.ico`.
pub fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for part in pattern.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part.contains(GLOB_META) {
            break;
        }
        base.push(part);
    }
    base
}

fn is_literal(pattern: &str) -> bool {
    !pattern.contains(GLOB_META)
}

/// A source file selected by an input glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Absolute (root-joined) path of the source.
    pub path: PathBuf,
    /// Path relative to the glob's literal base; outputs keep this layout.
    pub relative: PathBuf,
}

/// Collect all files under `root` matching any of `patterns`, sorted and
/// de-duplicated by path.
///
/// The first pattern that selects a file decides its relative path.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<MatchedFile>> {
    let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for pattern in patterns {
        let base = literal_base(pattern);

        if is_literal(pattern) {
            let path = root.join(&base);
            if fs.is_file(&path) {
                let name = base.file_name().map(PathBuf::from).unwrap_or_default();
                found.entry(path).or_insert(name);
            }
            continue;
        }

        let matcher = compile_glob(pattern)?;
        let walk_root = root.join(&base);
        if !fs.is_dir(&walk_root) {
            continue;
        }

        let mut stack = vec![walk_root.clone()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    let Ok(rel) = path.strip_prefix(root) else {
                        continue;
                    };
                    if matcher.is_match(to_slash(rel)) {
                        let relative = path
                            .strip_prefix(&walk_root)
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|_| rel.to_path_buf());
                        found.entry(path).or_insert(relative);
                    }
                }
            }
        }
    }

    Ok(found
        .into_iter()
        .map(|(path, relative)| MatchedFile { path, relative })
        .collect())
}

/// A watch globset bound to the composite that runs when it matches.
#[derive(Clone)]
pub struct WatchBinding {
    name: String,
    watch_set: GlobSet,
    composite: Composite,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("composite", &self.composite)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(name: impl Into<String>, patterns: &[String], composite: Composite) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            watch_set: build_globset(patterns)?,
            composite,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn composite(&self) -> &Composite {
        &self.composite
    }

    /// Returns true if this binding is interested in the given path
    /// (relative to project root), e.g. `"src/assets/scss/_nav.scss"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
    }
}

/// Indices of the bindings that match `rel_path`.
pub fn matching_bindings(bindings: &[WatchBinding], rel_path: &str) -> Vec<usize> {
    bindings
        .iter()
        .enumerate()
        .filter(|(_, b)| b.matches(rel_path))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn literal_base_stops_at_first_wildcard() {
        assert_eq!(
            literal_base("src/assets/images/**/*.{png,jpg}"),
            PathBuf::from("src/assets/images")
        );
        assert_eq!(literal_base("./src/favicon.ico"), PathBuf::from("src/favicon.ico"));
        assert_eq!(literal_base("**/*.html"), PathBuf::new());
    }

    #[test]
    fn single_star_does_not_descend() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/pages/a.html", "a");
        fs.add_file("/site/src/pages/nested/b.html", "b");

        let files =
            collect_matching_files(&fs, Path::new("/site"), &patterns(&["src/pages/*.html"]))
                .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("a.html"));
    }

    #[test]
    fn double_star_keeps_relative_structure() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/img/logo.png", "x");
        fs.add_file("/site/src/img/icons/home.png", "y");
        fs.add_file("/site/src/img/readme.txt", "z");

        let files =
            collect_matching_files(&fs, Path::new("/site"), &patterns(&["src/img/**/*.png"]))
                .unwrap();

        let relatives: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            relatives,
            vec![PathBuf::from("icons/home.png"), PathBuf::from("logo.png")]
        );
    }

    #[test]
    fn literal_pattern_selects_single_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/scss/main.scss", "a{}");
        fs.add_file("/site/src/scss/_nav.scss", "b{}");

        let files = collect_matching_files(
            &fs,
            Path::new("/site"),
            &patterns(&["src/scss/main.scss", "src/missing.scss"]),
        )
        .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("main.scss"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = build_globset(&patterns(&["src/[.html"])).unwrap_err();
        assert!(matches!(err, SiteflowError::InvalidGlob { .. }));
    }

    #[test]
    fn bindings_match_by_relative_path() {
        let bindings = vec![
            WatchBinding::new("styles", &patterns(&["src/scss/**/*.scss"]), Composite::task("css"))
                .unwrap(),
            WatchBinding::new("markup", &patterns(&["src/pages/*.html"]), Composite::task("html"))
                .unwrap(),
        ];

        assert_eq!(matching_bindings(&bindings, "src/scss/parts/_a.scss"), vec![0]);
        assert_eq!(matching_bindings(&bindings, "src/pages/index.html"), vec![1]);
        assert!(matching_bindings(&bindings, "dist/index.html").is_empty());
    }
}
