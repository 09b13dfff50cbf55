//! Shared build cache
//!
//! A process-wide cache directory for intermediate compilation artifacts of
//! modules common to many jobs. Entries are namespaced by support-directory
//! identity, and the first compilation against each entry runs alone: the
//! cold gate is held until that compile succeeds, after which compilations
//! sharing the entry proceed concurrently against the warm cache. A failed
//! cold compile leaves the entry cold, so the next job retries serially.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Process-wide build cache, shared by every job in a batch
pub struct BuildCache {
    root: PathBuf,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

#[derive(Clone)]
struct CacheEntry {
    dir: PathBuf,
    gate: Arc<Mutex<bool>>,
}

/// A job's claim on one cache entry
///
/// Cold leases hold the entry's gate; call [`CacheLease::mark_warm`] after a
/// successful compile to open it. Dropping a cold lease without marking
/// leaves the entry cold.
pub struct CacheLease {
    dir: PathBuf,
    gate: Option<OwnedMutexGuard<bool>>,
}

impl CacheLease {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether this lease is the serialized first compile for its entry.
    pub fn is_cold(&self) -> bool {
        self.gate.is_some()
    }

    /// Record a successful compile; later leases skip the gate.
    pub fn mark_warm(mut self) {
        if let Some(mut gate) = self.gate.take() {
            *gate = true;
        }
    }
}

impl BuildCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lease the cache entry for the support directory `key`.
    ///
    /// Waits while another job holds the entry's cold gate.
    pub async fn lease(&self, key: &Path) -> Result<CacheLease> {
        let entry = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(identity(key))
                .or_insert_with(|| CacheEntry {
                    dir: self.entry_dir(key),
                    gate: Arc::new(Mutex::new(false)),
                })
                .clone()
        };

        fs::create_dir_all(&entry.dir)
            .with_context(|| format!("Failed to create cache entry {}", entry.dir.display()))?;

        let gate = entry.gate.clone().lock_owned().await;
        if *gate {
            debug!("cache entry {} is warm", entry.dir.display());
            return Ok(CacheLease {
                dir: entry.dir,
                gate: None,
            });
        }

        debug!("cache entry {} is cold; holding gate", entry.dir.display());
        Ok(CacheLease {
            dir: entry.dir,
            gate: Some(gate),
        })
    }

    fn entry_dir(&self, key: &Path) -> PathBuf {
        let stem = key
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        self.root.join(format!("{}-{:016x}", stem, identity(key)))
    }
}

/// Module-identity hash of a support directory.
///
/// Canonicalized when possible so two spellings of the same directory share
/// an entry.
fn identity(key: &Path) -> u64 {
    let canonical = key.canonicalize().unwrap_or_else(|_| key.to_path_buf());
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_dirs() {
        let root = tempfile::tempdir().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let cache = BuildCache::new(root.path().join("cache"));
        let lease_a = cache.lease(&a).await.unwrap();
        let lease_b = cache.lease(&b).await.unwrap();

        assert_ne!(lease_a.dir(), lease_b.dir());
        assert!(lease_a.dir().is_dir());
    }

    #[tokio::test]
    async fn test_first_lease_is_cold_then_warm() {
        let root = tempfile::tempdir().unwrap();
        let key = root.path().join("common");
        fs::create_dir_all(&key).unwrap();

        let cache = BuildCache::new(root.path().join("cache"));

        let first = cache.lease(&key).await.unwrap();
        assert!(first.is_cold());
        first.mark_warm();

        let second = cache.lease(&key).await.unwrap();
        assert!(!second.is_cold());
    }

    #[tokio::test]
    async fn test_failed_cold_compile_leaves_entry_cold() {
        let root = tempfile::tempdir().unwrap();
        let key = root.path().join("common");
        fs::create_dir_all(&key).unwrap();

        let cache = BuildCache::new(root.path().join("cache"));

        let first = cache.lease(&key).await.unwrap();
        assert!(first.is_cold());
        drop(first);

        let retry = cache.lease(&key).await.unwrap();
        assert!(retry.is_cold());
    }

    #[tokio::test]
    async fn test_cold_gate_blocks_concurrent_lease() {
        let root = tempfile::tempdir().unwrap();
        let key = root.path().join("common");
        fs::create_dir_all(&key).unwrap();

        let cache = Arc::new(BuildCache::new(root.path().join("cache")));
        let first = cache.lease(&key).await.unwrap();

        let released = Arc::new(AtomicBool::new(false));
        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            let released = released.clone();
            tokio::spawn(async move {
                let lease = cache.lease(&key).await.unwrap();
                assert!(released.load(Ordering::SeqCst));
                assert!(!lease.is_cold());
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        released.store(true, Ordering::SeqCst);
        first.mark_warm();

        waiter.await.unwrap();
    }
}
