//! Toolchain cache store.
//!
//! Every toolchain lives in `root/<name>`, where the name encodes every
//! parameter that changes the toolchain's contents. A non-empty directory is
//! a hit. Misses are fetched into a staging directory inside `root` and then
//! renamed into place, so a half-extracted archive is never visible under
//! its final name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::errors::{CrossError, CrossResult};
use crate::sources::download::{ArchiveFormat, Fetcher};
use crate::util::fs;

/// Directory cache of downloaded toolchains keyed by name.
#[derive(Debug)]
pub struct ToolchainCache {
    root: PathBuf,

    /// One lock per toolchain name, held across check-fetch-populate
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ToolchainCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ToolchainCache {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of a toolchain, whether or not it is populated.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        fs::is_non_empty_dir(&self.path_for(name))
    }

    /// Guarantee `root/name` is populated, calling `fetch` only on a miss.
    ///
    /// `fetch` receives an empty staging directory. If it leaves a single
    /// top-level directory behind, that directory's contents become the
    /// toolchain.
    pub fn ensure<F>(&self, name: &str, fetch: F) -> CrossResult<PathBuf>
    where
        F: FnOnce(&Path) -> CrossResult<()>,
    {
        let dest = self.path_for(name);
        if fs::is_non_empty_dir(&dest) {
            tracing::debug!("toolchain cache hit: {}", name);
            return Ok(dest);
        }

        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // another thread may have populated it while we waited
        if fs::is_non_empty_dir(&dest) {
            return Ok(dest);
        }

        tracing::debug!("toolchain cache miss: {}", name);
        fs::ensure_dir(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{name}-"))
            .tempdir_in(&self.root)
            .map_err(|e| CrossError::io("failed to create staging directory", e))?;

        fetch(staging.path())?;

        if !fs::is_non_empty_dir(staging.path()) {
            return Err(CrossError::ExtractionFailed {
                path: dest,
                reason: "archive contained no files".to_string(),
            });
        }

        let contents = single_top_level_dir(staging.path())
            .unwrap_or_else(|| staging.path().to_path_buf());

        // a separate process can still win the race
        if fs::is_non_empty_dir(&dest) {
            tracing::debug!("discarding staged copy of {}, already populated", name);
            return Ok(dest);
        }
        fs::remove_dir_all_if_exists(&dest)?;
        fs::move_dir(&contents, &dest)?;

        Ok(dest)
    }

    /// `ensure` for the common case of one archive at one URL.
    pub fn ensure_archive(
        &self,
        name: &str,
        url: &str,
        fetcher: &dyn Fetcher,
    ) -> CrossResult<PathBuf> {
        let format = ArchiveFormat::from_url(url)?;
        self.ensure(name, |staging| fetcher.fetch(url, format, staging))
    }

    /// Delete a cached toolchain.
    pub fn remove(&self, name: &str) -> CrossResult<()> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        fs::remove_dir_all_if_exists(&self.path_for(name))
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }
}

fn single_top_level_dir(dir: &Path) -> Option<PathBuf> {
    let entries = fs::sorted_entries(dir);
    match entries.as_slice() {
        [only] if only.is_dir() => Some(only.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn populate(staging: &Path, top: Option<&str>) -> CrossResult<()> {
        let base = match top {
            Some(top) => staging.join(top),
            None => staging.to_path_buf(),
        };
        std::fs::create_dir_all(base.join("bin")).unwrap();
        std::fs::write(base.join("bin/gcc"), "#!/bin/sh\n").unwrap();
        Ok(())
    }

    #[test]
    fn test_ensure_fetches_once() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());
        let calls = AtomicUsize::new(0);

        let fetch = |staging: &Path| {
            calls.fetch_add(1, Ordering::SeqCst);
            populate(staging, None)
        };

        let first = cache.ensure("aarch64-linux-musl-cross-v0.7.4", fetch).unwrap();
        let second = cache
            .ensure("aarch64-linux-musl-cross-v0.7.4", |staging: &Path| {
                calls.fetch_add(1, Ordering::SeqCst);
                populate(staging, None)
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.join("bin/gcc").exists());
    }

    #[test]
    fn test_single_top_level_dir_is_flattened() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());

        let dir = cache
            .ensure("android-ndk-linux-r27d", |s| populate(s, Some("android-ndk-r27d")))
            .unwrap();
        assert!(dir.join("bin/gcc").exists());
        assert!(!dir.join("android-ndk-r27d").exists());
    }

    #[test]
    fn test_failed_fetch_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());

        let err = cache
            .ensure("broken", |staging: &Path| {
                std::fs::write(staging.join("partial"), "x").unwrap();
                Err(CrossError::DownloadFailed {
                    url: "https://example.invalid/x.tgz".to_string(),
                    reason: "connection reset".to_string(),
                })
            })
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(!cache.is_cached("broken"));
        assert_eq!(fs::sorted_entries(tmp.path()).len(), 0);
    }

    #[test]
    fn test_empty_fetch_is_error() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());
        let err = cache.ensure("empty", |_| Ok(())).unwrap_err();
        assert!(matches!(err, CrossError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_concurrent_ensure_same_name() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());
        let calls = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    cache
                        .ensure("qemu-user-static-v10.2.0", |staging: &Path| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            populate(staging, None)
                        })
                        .unwrap()
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path());
        cache.ensure("x", |s| populate(s, None)).unwrap();
        assert!(cache.is_cached("x"));
        cache.remove("x").unwrap();
        assert!(!cache.is_cached("x"));
    }
}
