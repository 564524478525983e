// tests/config_errors.rs
mod common;
use crate::common::builders::ConfigFileBuilder;

use std::fs;

use siteflow::config::{ConfigFile, PathSpec, load_and_validate};
use siteflow::errors::SiteflowError;
use siteflow::types::AssetCategory;

fn validate(builder: ConfigFileBuilder) -> SiteflowError {
    ConfigFile::try_from(builder.raw()).unwrap_err()
}

#[test]
fn composite_referencing_an_unknown_task_is_rejected() {
    let err = validate(ConfigFileBuilder::new().with_series("deploy", &["build", "upload"]));
    assert!(matches!(err, SiteflowError::UnknownTask(ref m) if m.contains("upload")));
    assert!(err.is_configuration());
}

#[test]
fn composites_that_reference_each_other_are_a_cycle() {
    let err = validate(
        ConfigFileBuilder::new()
            .with_series("a", &["html", "b"])
            .with_parallel("b", &["css", "a"]),
    );
    assert!(matches!(err, SiteflowError::CompositeCycle(_)));
}

#[test]
fn a_malformed_glob_is_rejected() {
    let err = validate(ConfigFileBuilder::new().with_paths(
        AssetCategory::Markup,
        PathSpec::new(&["src/pages/[.html"], "dist", &[]),
    ));
    assert!(matches!(err, SiteflowError::InvalidGlob { ref pattern, .. } if pattern == "src/pages/[.html"));
}

#[test]
fn outputs_must_stay_inside_the_build_root() {
    let err = validate(ConfigFileBuilder::new().with_paths(
        AssetCategory::Fonts,
        PathSpec::new(&["src/fonts/*"], "public/fonts", &[]),
    ));
    assert!(matches!(err, SiteflowError::ConfigError(ref m) if m.contains("build root")));
}

#[test]
fn inputs_reading_the_build_root_are_rejected() {
    let err = validate(ConfigFileBuilder::new().with_paths(
        AssetCategory::Markup,
        PathSpec::new(&["**/*.html"], "dist", &[]),
    ));
    assert!(err.is_configuration());
}

#[test]
fn builtin_names_cannot_be_shadowed() {
    let err = validate(ConfigFileBuilder::new().with_series("build", &["html"]));
    assert!(matches!(err, SiteflowError::ConfigError(ref m) if m.contains("built-in")));
}

#[test]
fn toml_file_round_trips_into_a_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Siteflow.toml");
    fs::write(
        &path,
        r#"
[config]
build_root = "public"

[paths.markup]
input = ["pages/*.html"]
output = "public"
watch = ["pages/**/*.html"]

[paths.styles]
input = ["scss/main.scss"]
output = "public/css"

[paths.scripts]
input = ["js/main.js"]
output = "public/js"

[paths.images]
input = ["img/**/*.png"]
output = "public/img"

[paths.fonts]
input = ["fonts/*"]
output = "public/fonts"

[paths.favicon]
input = ["favicon.ico"]
output = "public"

[server]
port = 8080

[watch]
triggered_while_running_behaviour = "drop"

[task.pages]
series = ["clear", "html"]
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.path_spec(AssetCategory::Markup).watch, vec!["pages/**/*.html"]);
    assert!(cfg.task.contains_key("pages"));
}

#[test]
fn unparseable_toml_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Siteflow.toml");
    fs::write(&path, "[config\nbuild_root = ").unwrap();

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SiteflowError::TomlError(_)));
    assert!(err.is_configuration());
}

#[test]
fn a_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_and_validate(dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.config.build_root.to_str(), Some("dist"));
}
