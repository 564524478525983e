// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{AssetCategory, CacheStorageMode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from `Siteflow.toml`.
///
/// ```toml
/// [config]
/// build_root = "dist"
/// cache_dir = ".siteflow/cache"
///
/// [paths.styles]
/// input = ["src/assets/scss/main.scss"]
/// output = "dist/assets/css"
/// watch = ["src/assets/scss/**/*.scss"]
///
/// [images]
/// jpeg_quality = 60
///
/// [task.release]
/// series = ["clear", "build"]
/// ```
///
/// Every section is optional; missing sections fall back to the layout of a
/// conventional `src/` → `dist/` site.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub markup: MarkupOptions,

    #[serde(default)]
    pub styles: StyleOptions,

    #[serde(default)]
    pub scripts: ScriptOptions,

    #[serde(default)]
    pub images: ImageOptions,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// User-defined composites from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CompositeConfig>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub markup: MarkupOptions,
    pub styles: StyleOptions,
    pub scripts: ScriptOptions,
    pub images: ImageOptions,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub task: BTreeMap<String, CompositeConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            markup: raw.markup,
            styles: raw.styles,
            scripts: raw.scripts,
            images: raw.images,
            server: raw.server,
            watch: raw.watch,
            task: raw.task,
        }
    }

    pub fn path_spec(&self, category: AssetCategory) -> &PathSpec {
        self.paths.get(category)
    }

    /// Output directory for WebP conversions.
    pub fn webp_output(&self) -> &PathBuf {
        self.images
            .webp_output
            .as_ref()
            .unwrap_or(&self.paths.images.output)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Every category writes below this directory; `clear` deletes it.
    #[serde(default = "default_build_root")]
    pub build_root: PathBuf,

    /// Where persistent image cache entries live.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Upper bound for a single task; a task exceeding it fails.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

fn default_build_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".siteflow/cache")
}

fn default_task_timeout_secs() -> u64 {
    300
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            build_root: default_build_root(),
            cache_dir: default_cache_dir(),
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

/// Input globs, output directory and watch globs for one category.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PathSpec {
    pub input: Vec<String>,
    pub output: PathBuf,
    #[serde(default)]
    pub watch: Vec<String>,
}

impl PathSpec {
    pub fn new(input: &[&str], output: &str, watch: &[&str]) -> Self {
        Self {
            input: input.iter().map(|s| s.to_string()).collect(),
            output: PathBuf::from(output),
            watch: watch.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `[paths.<category>]` sections.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_markup_paths")]
    pub markup: PathSpec,
    #[serde(default = "default_styles_paths")]
    pub styles: PathSpec,
    #[serde(default = "default_scripts_paths")]
    pub scripts: PathSpec,
    #[serde(default = "default_images_paths")]
    pub images: PathSpec,
    #[serde(default = "default_fonts_paths")]
    pub fonts: PathSpec,
    #[serde(default = "default_favicon_paths")]
    pub favicon: PathSpec,
}

impl PathsSection {
    pub fn get(&self, category: AssetCategory) -> &PathSpec {
        match category {
            AssetCategory::Markup => &self.markup,
            AssetCategory::Styles => &self.styles,
            AssetCategory::Scripts => &self.scripts,
            AssetCategory::Images => &self.images,
            AssetCategory::Fonts => &self.fonts,
            AssetCategory::Favicon => &self.favicon,
        }
    }

    pub fn get_mut(&mut self, category: AssetCategory) -> &mut PathSpec {
        match category {
            AssetCategory::Markup => &mut self.markup,
            AssetCategory::Styles => &mut self.styles,
            AssetCategory::Scripts => &mut self.scripts,
            AssetCategory::Images => &mut self.images,
            AssetCategory::Fonts => &mut self.fonts,
            AssetCategory::Favicon => &mut self.favicon,
        }
    }
}

fn default_markup_paths() -> PathSpec {
    PathSpec::new(&["src/pages/*.html"], "dist", &["src/pages/*.html"])
}

fn default_styles_paths() -> PathSpec {
    PathSpec::new(
        &["src/assets/scss/main.scss"],
        "dist/assets/css",
        &["src/assets/scss/**/*.scss"],
    )
}

fn default_scripts_paths() -> PathSpec {
    PathSpec::new(
        &["src/assets/js/main.js"],
        "dist/assets/js",
        &["src/assets/js/**/*.js"],
    )
}

fn default_images_paths() -> PathSpec {
    PathSpec::new(
        &["src/assets/images/**/*.{png,jpg,jpeg}"],
        "dist/assets/images",
        &["src/assets/images/**/*.{png,jpg,jpeg}"],
    )
}

fn default_fonts_paths() -> PathSpec {
    PathSpec::new(
        &["src/assets/fonts/**/*"],
        "dist/assets/fonts",
        &["src/assets/fonts/**/*"],
    )
}

fn default_favicon_paths() -> PathSpec {
    PathSpec::new(&["src/favicon.ico"], "dist", &["src/favicon.ico"])
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            markup: default_markup_paths(),
            styles: default_styles_paths(),
            scripts: default_scripts_paths(),
            images: default_images_paths(),
            fonts: default_fonts_paths(),
            favicon: default_favicon_paths(),
        }
    }
}

/// `[markup]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkupOptions {
    pub collapse_whitespace: bool,
    pub remove_comments: bool,
    /// Optional external command each page is piped through first.
    pub cmd: Option<String>,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            remove_comments: true,
            cmd: None,
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    /// Inserted before the extension: `main.scss` → `main.min.css`.
    pub suffix: String,
    pub minify: bool,
    /// External compiler (e.g. `sass --stdin`), run after partials are inlined.
    pub cmd: Option<String>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            suffix: ".min".to_string(),
            minify: true,
            cmd: None,
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    /// Replaces the entry's extension: `main.js` → `main.min.js`.
    pub extension: String,
    /// External bundler/minifier. `{input}` is replaced by the entry path.
    pub cmd: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            extension: ".min.js".to_string(),
            cmd: None,
        }
    }
}

/// PNG compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    pub jpeg_quality: u8,
    pub png_compression: PngCompression,
    pub cache: CacheStorageMode,
    /// Output directory of the `webp` task; defaults to `paths.images.output`.
    pub webp_output: Option<PathBuf>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 60,
            png_compression: PngCompression::Best,
            cache: CacheStorageMode::Disk,
            webp_output: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet period before a burst of events on one binding fires a run.
    pub debounce_ms: u64,
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::Queue,
        }
    }
}

/// `[task.<name>]` section: exactly one of `series` / `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompositeConfig {
    #[serde(default)]
    pub series: Option<Vec<String>>,
    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl CompositeConfig {
    /// Names this composite refers to, in declaration order.
    pub fn members(&self) -> &[String] {
        self.series
            .as_deref()
            .or(self.parallel.as_deref())
            .unwrap_or(&[])
    }
}
