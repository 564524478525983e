// src/cache/mod.rs

//! Memoisation of image optimisation results.
//!
//! Entries are keyed by [`fingerprint`] and never expire on their own: the
//! only invalidation is [`CacheLayer::clear_all`], called by the `clear`
//! task. A corrupt or unreadable entry is logged and treated as a miss.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::transform::{Asset, OptimizeImage, StepFuture, TransformStep};
use crate::types::CacheStorageMode;

pub mod fingerprint;
pub mod store;

pub use fingerprint::fingerprint;
pub use store::{CacheStore, DiskCacheStore, MemoryCacheStore};

/// Shared cache front with hit/miss counters.
pub struct CacheLayer {
    store: Box<dyn CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish_non_exhaustive()
    }
}

impl CacheLayer {
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Build the layer for `mode`; disk entries live in `<cache_dir>/images`.
    pub fn for_mode(mode: CacheStorageMode, cache_dir: &Path, fs: Arc<dyn FileSystem>) -> Self {
        let store: Box<dyn CacheStore> = match mode {
            CacheStorageMode::Disk => Box::new(DiskCacheStore::new(cache_dir.join("images"), fs)),
            CacheStorageMode::Memory => Box::new(MemoryCacheStore::new()),
        };
        Self::new(store)
    }

    pub fn get(&self, fingerprint: &str) -> Option<Vec<u8>> {
        match self.store.load(fingerprint) {
            Ok(Some(bytes)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(fingerprint, error = %e, "unusable cache entry; recomputing");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an entry. Failures are logged; the build does not depend on
    /// the cache being writable.
    pub fn put(&self, fingerprint: &str, bytes: &[u8]) {
        if let Err(e) = self.store.save(fingerprint, bytes) {
            warn!(fingerprint, error = %e, "failed to store cache entry");
        }
    }

    pub fn clear_all(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Wraps [`OptimizeImage`] with a cache lookup.
#[derive(Debug, Clone)]
pub struct CachedStep {
    inner: OptimizeImage,
    cache: Arc<CacheLayer>,
}

impl CachedStep {
    pub fn new(inner: OptimizeImage, cache: Arc<CacheLayer>) -> Self {
        Self { inner, cache }
    }
}

impl TransformStep for CachedStep {
    fn name(&self) -> &str {
        "cached-optimize-image"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let key = fingerprint(&asset.relative, &asset.bytes, &self.inner.options_key());

            if let Some(bytes) = self.cache.get(&key) {
                debug!(path = ?asset.relative, "image cache hit");
                return Ok(Asset { bytes, ..asset });
            }

            let optimized = self.inner.apply(asset).await?;
            self.cache.put(&key, &optimized.bytes);
            Ok(optimized)
        })
    }
}
