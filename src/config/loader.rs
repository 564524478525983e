// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Parse and validate config text.
pub fn parse_config(text: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(text)?;
    ConfigFile::try_from(raw)
}

/// Load and validate the config at `path`.
///
/// A missing file is not an error: the built-in defaults describe the usual
/// `src/` → `dist/` layout. Unreadable or malformed files are.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => {
            debug!(?path, "loading config");
            parse_config(&text)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(?path, "config file not found; using built-in defaults");
            ConfigFile::try_from(RawConfigFile::default())
        }
        Err(e) => Err(e.into()),
    }
}
