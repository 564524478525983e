// src/config/mod.rs

//! Configuration loading and validation for siteflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate path, glob and composite invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, parse_config};
pub use model::{
    CompositeConfig, ConfigFile, ConfigSection, ImageOptions, MarkupOptions, PathSpec,
    PathsSection, PngCompression, RawConfigFile, ScriptOptions, ServerSection, StyleOptions,
    WatchSection,
};
