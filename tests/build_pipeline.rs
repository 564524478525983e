// tests/build_pipeline.rs
mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use siteflow::cache::CacheLayer;
use siteflow::config::{ConfigFile, PathSpec};
use siteflow::dag::{RunReport, Runner};
use siteflow::fs::{FileSystem, RealFileSystem};
use siteflow::server::NoopSink;
use siteflow::tasks::{BuildContext, build_task_graph};
use siteflow::types::{AssetCategory, CacheStorageMode};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

/// A project directory plus a runner over its task graph.
struct Site {
    dir: TempDir,
    runner: Runner,
    cache: Arc<CacheLayer>,
}

impl Site {
    fn new(cfg: &ConfigFile) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let cache = Arc::new(CacheLayer::for_mode(
            cfg.images.cache,
            &dir.path().join(&cfg.config.cache_dir),
            Arc::clone(&fs),
        ));
        let ctx = BuildContext {
            root: dir.path().to_path_buf(),
            fs,
            cache: Arc::clone(&cache),
            sink: Arc::new(NoopSink),
        };
        let graph = build_task_graph(cfg, &ctx).unwrap();
        let runner = Runner::new(Arc::new(graph), Duration::from_secs(30));
        Self { dir, runner, cache }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    async fn run(&self, task: &str) -> siteflow::errors::Result<RunReport> {
        self.runner.run_named(task).await
    }
}

fn write_png(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
    img.save(path).unwrap();
}

#[tokio::test]
async fn markup_is_minified_into_the_build_root() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());
    site.write(
        "src/pages/index.html",
        "<html>\n  <body>\n    <!-- note -->\n    <p>Hello    world</p>\n  </body>\n</html>\n",
    );

    let report = site.run("html").await?;

    assert!(report.is_clean());
    assert_eq!(report.written_count(), 1);
    assert_eq!(
        site.read("dist/index.html"),
        "<html><body><p>Hello world</p></body></html>"
    );
    Ok(())
}

#[tokio::test]
async fn an_empty_selection_succeeds_without_output() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());

    let report = site.run("js").await?;

    assert!(report.is_clean());
    assert_eq!(report.written_count(), 0);
    assert!(!site.path("dist").exists());
    Ok(())
}

#[tokio::test]
async fn styles_inline_partials_and_get_a_min_suffix() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());
    site.write("src/assets/scss/main.scss", "@import \"partials/vars\";\nbody { color: red; }\n");
    site.write("src/assets/scss/partials/_vars.scss", "/* spacing */\na { margin: 0 ; }\n");

    let report = site.run("css").await?;

    assert!(report.is_clean());
    let css = site.read("dist/assets/css/main.min.css");
    assert!(css.contains("a{margin:0}"), "got {css}");
    assert!(css.contains("body{color:red}"), "got {css}");
    assert!(!css.contains("spacing"));
    Ok(())
}

#[tokio::test]
async fn a_missing_partial_is_reported_and_a_fixed_rebuild_succeeds() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());
    site.write("src/assets/scss/main.scss", "@import \"missing\";\nbody { color: red; }\n");

    let report = site.run("css").await?;
    assert_eq!(report.failure_count(), 1);
    assert!(!site.path("dist/assets/css/main.min.css").exists());

    site.write("src/assets/scss/_missing.scss", "p { margin: 0; }");
    let report = site.run("css").await?;
    assert!(report.is_clean());
    assert!(site.read("dist/assets/css/main.min.css").contains("p{margin:0}"));
    Ok(())
}

#[tokio::test]
async fn scripts_are_renamed_and_copied() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());
    site.write("src/assets/js/main.js", "console.log('hi');\n");

    site.run("js").await?;

    assert_eq!(site.read("dist/assets/js/main.min.js"), "console.log('hi');\n");
    Ok(())
}

#[tokio::test]
async fn a_second_image_build_is_served_from_the_cache() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().with_cache(CacheStorageMode::Disk).build());
    write_png(&site.path("src/assets/images/logo.png"));

    let first = site.run("images").await?;
    let first_bytes = fs::read(site.path("dist/assets/images/logo.png"))?;
    assert_eq!(first.record("images").map(|r| r.report.cache_misses), Some(1));

    let second = site.run("images").await?;
    let second_bytes = fs::read(site.path("dist/assets/images/logo.png"))?;

    assert_eq!(second.record("images").map(|r| r.report.cache_hits), Some(1));
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(site.cache.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn webp_variants_land_next_to_the_images() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().build());
    write_png(&site.path("src/assets/images/icons/logo.png"));

    site.run("webp").await?;

    let bytes = fs::read(site.path("dist/assets/images/icons/logo.webp"))?;
    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
    Ok(())
}

#[tokio::test]
async fn a_corrupt_image_fails_alone() -> TestResult {
    init_tracing();
    let site = Site::new(&ConfigFileBuilder::new().with_cache(CacheStorageMode::Memory).build());
    write_png(&site.path("src/assets/images/good.png"));
    site.write("src/assets/images/bad.png", "not a png");

    let report = site.run("images").await?;

    assert_eq!(report.failure_count(), 1);
    assert!(site.path("dist/assets/images/good.png").exists());
    assert!(!site.path("dist/assets/images/bad.png").exists());
    Ok(())
}

#[tokio::test]
async fn build_then_clear_removes_everything_generated() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_paths(
            AssetCategory::Fonts,
            PathSpec::new(&["src/fonts/*.woff2"], "dist/fonts", &[]),
        )
        .build();
    let site = Site::new(&cfg);
    site.write("src/pages/index.html", "<p>x</p>");
    site.write("src/fonts/a.woff2", "font");
    site.write("src/favicon.ico", "ico");
    write_png(&site.path("src/assets/images/logo.png"));

    let report = site.run("build").await?;
    assert!(report.is_clean());
    assert!(site.path("dist/index.html").exists());
    assert!(site.path("dist/fonts/a.woff2").exists());
    assert!(site.path("dist/favicon.ico").exists());
    assert!(site.path(".siteflow/cache/images").exists());

    site.run("clear").await?;

    assert!(!site.path("dist").exists());
    assert!(!site.path(".siteflow/cache/images").exists());
    assert!(site.path("src/pages/index.html").exists());
    Ok(())
}

#[tokio::test]
async fn user_composites_run_their_members() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_parallel("pages", &["html", "favicon"])
        .with_series("fresh", &["clear", "pages"])
        .build();
    let site = Site::new(&cfg);
    site.write("src/pages/index.html", "<p>x</p>");
    site.write("src/favicon.ico", "ico");
    site.write("dist/stale.txt", "old");

    let report = site.run("fresh").await?;

    assert!(report.record("clear").is_some());
    assert!(!site.path("dist/stale.txt").exists());
    assert!(site.path("dist/index.html").exists());
    assert!(site.path("dist/favicon.ico").exists());
    Ok(())
}
