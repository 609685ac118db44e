//! Test doubles for resolver, cache and synthesis tests.
//!
//! Nothing here touches the network: [`FakeFetcher`] lays out a directory
//! tree instead of downloading, and counts how often it was asked to.
//!
//! ```rust,ignore
//! use xforge::test_support::{fixtures, FakeFetcher, TestEnv};
//!
//! let env = TestEnv::with_fetcher(
//!     FakeFetcher::new().layout("cross-make", &fixtures::gcc_cross("aarch64-linux-musl")),
//! );
//! let host = fixtures::linux_x86_64_host();
//! let ctx = env.ctx(&host);
//! ```

pub mod fixtures;

use std::path::Path;
use std::sync::Mutex;

use tempfile::TempDir;

use crate::builder::toolchain::ResolveContext;
use crate::core::errors::{CrossError, CrossResult};
use crate::core::host::HostPlatform;
use crate::core::versions::ToolchainVersions;
use crate::sources::cache::ToolchainCache;
use crate::sources::download::{ArchiveFormat, Fetcher};
use crate::util::shell::{ColorChoice, Shell};

pub use fixtures::*;

/// Fetcher that writes a canned layout for URLs containing a fragment.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    layouts: Vec<(String, Vec<String>)>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        FakeFetcher::default()
    }

    /// Files to create when a URL contains `url_fragment`.
    ///
    /// Paths ending in `/` become directories; everything else is an
    /// executable shell script.
    pub fn layout(mut self, url_fragment: &str, files: &[String]) -> Self {
        self.layouts
            .push((url_fragment.to_string(), files.to_vec()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str, _format: ArchiveFormat, dest: &Path) -> CrossResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        let Some((_, files)) = self.layouts.iter().find(|(frag, _)| url.contains(frag)) else {
            return Err(CrossError::DownloadFailed {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            });
        };

        for file in files {
            write_fixture(dest, file);
        }
        Ok(())
    }
}

fn write_fixture(root: &Path, rel: &str) {
    let path = root.join(rel.trim_end_matches('/'));
    if rel.ends_with('/') {
        std::fs::create_dir_all(&path).unwrap();
        return;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    crate::util::fs::set_executable(&path).unwrap();
}

/// A scratch cache, a fake fetcher and default versions.
pub struct TestEnv {
    pub tmp: TempDir,
    pub cache: ToolchainCache,
    pub fetcher: FakeFetcher,
    pub versions: ToolchainVersions,
    pub shell: Shell,
}

impl TestEnv {
    pub fn new() -> Self {
        TestEnv::with_fetcher(FakeFetcher::new())
    }

    pub fn with_fetcher(fetcher: FakeFetcher) -> Self {
        let tmp = TempDir::new().unwrap();
        let cache = ToolchainCache::new(tmp.path().join("toolchains"));
        TestEnv {
            tmp,
            cache,
            fetcher,
            versions: ToolchainVersions::default(),
            shell: Shell::from_flags(true, false, ColorChoice::Never, false),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn ctx<'a>(&'a self, host: &'a HostPlatform) -> ResolveContext<'a> {
        ResolveContext::new(host, &self.cache, &self.fetcher, &self.versions, &self.shell)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        TestEnv::new()
    }
}
