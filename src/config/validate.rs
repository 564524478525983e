// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Component, Path};

use globset::GlobBuilder;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{CompositeConfig, ConfigFile, PathSpec, RawConfigFile};
use crate::errors::{Result, SiteflowError};
use crate::tasks::{BUILTIN_TASK_NAMES, DEFAULT_TASK};
use crate::types::AssetCategory;
use crate::watch::path_utils::normalize_relative;
use crate::watch::patterns::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SiteflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_paths(cfg)?;
    validate_image_options(cfg)?;
    validate_composites(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.task_timeout_secs == 0 {
        return Err(SiteflowError::ConfigError(
            "[config].task_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    let root = normalize_relative(&cfg.config.build_root).ok_or_else(|| {
        SiteflowError::ConfigError(format!(
            "[config].build_root must be a relative path inside the project (got {:?})",
            cfg.config.build_root
        ))
    })?;
    if root.as_os_str().is_empty() {
        return Err(SiteflowError::ConfigError(
            "[config].build_root must not be the project root itself".to_string(),
        ));
    }

    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let build_root = normalize_relative(&cfg.config.build_root).unwrap_or_default();
    let cache_dir = normalize_relative(&cfg.config.cache_dir);

    for category in AssetCategory::ALL {
        let spec = cfg.paths.get(category);
        validate_path_spec(category, spec, &build_root)?;

        for pattern in spec.input.iter().chain(spec.watch.iter()) {
            if overlaps(pattern, &build_root) {
                return Err(SiteflowError::ConfigError(format!(
                    "[paths.{category}] pattern '{pattern}' can match files inside build root {:?}",
                    build_root
                )));
            }
            if let Some(cache_dir) = cache_dir.as_deref() {
                if overlaps(pattern, cache_dir) {
                    return Err(SiteflowError::ConfigError(format!(
                        "[paths.{category}] pattern '{pattern}' can match files inside cache dir {:?}",
                        cache_dir
                    )));
                }
            }
        }
    }

    Ok(())
}

fn validate_path_spec(category: AssetCategory, spec: &PathSpec, build_root: &Path) -> Result<()> {
    if spec.input.is_empty() {
        return Err(SiteflowError::ConfigError(format!(
            "[paths.{category}].input must list at least one glob"
        )));
    }

    build_globset(&spec.input)?;
    build_globset(&spec.watch)?;

    ensure_under_build_root(&format!("[paths.{category}].output"), &spec.output, build_root)
}

fn ensure_under_build_root(what: &str, output: &Path, build_root: &Path) -> Result<()> {
    match normalize_relative(output) {
        Some(out) if out.starts_with(build_root) => Ok(()),
        _ => Err(SiteflowError::ConfigError(format!(
            "{what} {:?} must be inside build root {:?}",
            output, build_root
        ))),
    }
}

/// Whether a glob can select paths inside `dir`.
///
/// Segments are matched one by one against the components of `dir`. Once
/// every component is matched, any remaining segment reaches inside it; a
/// `**` segment reaches anywhere.
fn overlaps(pattern: &str, dir: &Path) -> bool {
    let segments: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let components: Vec<&str> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    for (i, component) in components.iter().enumerate() {
        match segments.get(i) {
            None => return false,
            Some(&"**") => return true,
            Some(segment) if segment_matches(segment, component) => {}
            Some(_) => return false,
        }
    }
    segments.len() > components.len()
}

fn segment_matches(segment: &str, component: &str) -> bool {
    GlobBuilder::new(segment)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher().is_match(component))
        .unwrap_or(false)
}

fn validate_image_options(cfg: &RawConfigFile) -> Result<()> {
    let quality = cfg.images.jpeg_quality;
    if !(1..=100).contains(&quality) {
        return Err(SiteflowError::ConfigError(format!(
            "[images].jpeg_quality must be between 1 and 100 (got {quality})"
        )));
    }

    if let Some(webp_output) = &cfg.images.webp_output {
        let build_root = normalize_relative(&cfg.config.build_root).unwrap_or_default();
        ensure_under_build_root("[images].webp_output", webp_output, &build_root)?;
    }

    Ok(())
}

fn validate_composites(cfg: &RawConfigFile) -> Result<()> {
    for (name, composite) in cfg.task.iter() {
        if BUILTIN_TASK_NAMES.contains(&name.as_str()) || name == DEFAULT_TASK {
            return Err(SiteflowError::ConfigError(format!(
                "[task.{name}] shadows a built-in task"
            )));
        }

        match (&composite.series, &composite.parallel) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(SiteflowError::ConfigError(format!(
                    "[task.{name}] must set exactly one of `series` or `parallel`"
                )));
            }
            _ => {}
        }

        if composite.members().is_empty() {
            return Err(SiteflowError::ConfigError(format!(
                "[task.{name}] must reference at least one task"
            )));
        }

        for member in composite.members() {
            let known = BUILTIN_TASK_NAMES.contains(&member.as_str())
                || cfg.task.contains_key(member);
            if !known {
                return Err(SiteflowError::UnknownTask(format!(
                    "'{member}' (referenced by [task.{name}])"
                )));
            }
            if member == name {
                return Err(SiteflowError::CompositeCycle(format!(
                    "task '{name}' references itself"
                )));
            }
        }
    }

    composite_definition_order(&cfg.task).map(|_| ())
}

/// Order user composites so every composite comes after the composites it
/// references.
///
/// Edge direction: member -> composite. A topological sort fails on a cycle.
pub fn composite_definition_order(
    tasks: &BTreeMap<String, CompositeConfig>,
) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, composite) in tasks.iter() {
        for member in composite.members() {
            if tasks.contains_key(member) {
                graph.add_edge(member.as_str(), name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(SiteflowError::CompositeCycle(format!(
            "cycle detected between composite tasks involving '{}'",
            cycle.node_id()
        ))),
    }
}
