// src/cache/store.rs

//! Storage backends for cached image bytes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cache::fingerprint::checksum;
use crate::errors::{Result, SiteflowError};
use crate::fs::FileSystem;

/// Magic line at the top of every disk entry.
const ENTRY_MAGIC: &[u8] = b"SFC1\n";

/// Abstract storage for cache entries, keyed by fingerprint.
pub trait CacheStore: Send + Sync {
    fn load(&self, fingerprint: &str) -> Result<Option<Vec<u8>>>;
    fn save(&self, fingerprint: &str, bytes: &[u8]) -> Result<()>;
    /// Drop every entry.
    fn clear(&self) -> Result<()>;
}

/// Stores entries as files under `<dir>/<fingerprint>`.
///
/// Each file is `SFC1\n<blake3 hex of payload>\n<payload>`; an entry whose
/// header or checksum does not match is reported as a cache error.
pub struct DiskCacheStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DiskCacheStore {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(fingerprint)
    }
}

impl CacheStore for DiskCacheStore {
    fn load(&self, fingerprint: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(fingerprint);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let raw = self.fs.read(&path)?;
        decode_entry(&raw)
            .map(|payload| Some(payload.to_vec()))
            .ok_or_else(|| SiteflowError::Cache(format!("corrupt cache entry {:?}", path)))
    }

    fn save(&self, fingerprint: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(fingerprint);
        self.fs.write(&path, &encode_entry(bytes))?;
        debug!(?path, size = bytes.len(), "stored cache entry (disk)");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.fs.remove_dir_all(&self.dir)?;
        info!(dir = ?self.dir, "cleared image cache (disk)");
        Ok(())
    }
}

fn encode_entry(payload: &[u8]) -> Vec<u8> {
    let sum = checksum(payload);
    let mut out = Vec::with_capacity(ENTRY_MAGIC.len() + sum.len() + 1 + payload.len());
    out.extend_from_slice(ENTRY_MAGIC);
    out.extend_from_slice(sum.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(payload);
    out
}

fn decode_entry(raw: &[u8]) -> Option<&[u8]> {
    let rest = raw.strip_prefix(ENTRY_MAGIC)?;
    let newline = rest.iter().position(|b| *b == b'\n')?;
    let (sum, payload) = (&rest[..newline], &rest[newline + 1..]);
    (sum == checksum(payload).as_bytes()).then_some(payload)
}

/// Stores entries in memory only.
#[derive(Default)]
pub struct MemoryCacheStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, fingerprint: &str) -> Result<Option<Vec<u8>>> {
        let map = self
            .map
            .lock()
            .map_err(|_| SiteflowError::Cache("memory cache lock poisoned".into()))?;
        Ok(map.get(fingerprint).cloned())
    }

    fn save(&self, fingerprint: &str, bytes: &[u8]) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| SiteflowError::Cache("memory cache lock poisoned".into()))?;
        map.insert(fingerprint.to_string(), bytes.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| SiteflowError::Cache("memory cache lock poisoned".into()))?;
        let removed = map.len();
        map.clear();
        info!(removed, "cleared image cache (memory)");
        Ok(())
    }
}
