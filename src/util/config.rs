//! Configuration file support for xforge.
//!
//! xforge reads two configuration files:
//! - Global: `~/.xforge/config.toml` - user-wide defaults
//! - Project: `.xforge/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config, environment
//! variables take precedence over both, and command-line flags win overall.
//!
//! ```toml
//! [cache]
//! dir = "/opt/xforge"
//!
//! [network]
//! github-proxy = "https://ghproxy.example/"
//!
//! [versions]
//! glibc = "2.31"
//!
//! [target.aarch64-unknown-linux-musl]
//! cc = "/usr/bin/aarch64-linux-musl-gcc"
//! runner = "qemu-aarch64 -L /usr/aarch64-linux-musl"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{CrossError, CrossResult};
use crate::core::versions::ToolchainVersions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub versions: VersionsConfig,
    /// Per-target toolchain overrides keyed by triple
    pub target: BTreeMap<String, TargetOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Toolchain cache root
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Mirror prefixed to every github.com download URL
    pub github_proxy: Option<String>,

    /// Never download; missing toolchains are an error
    pub offline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VersionsConfig {
    pub glibc: Option<String>,
    pub macos_sdk: Option<String>,
    pub iphone_sdk: Option<String>,
    pub freebsd: Option<String>,
    pub ndk: Option<String>,
    pub qemu: Option<String>,
    pub cross_deps: Option<String>,
}

/// Explicit toolchain for one target; setting `cc` skips provisioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TargetOverride {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    pub linker: Option<PathBuf>,
    pub runner: Option<String>,
    pub rustflags: Vec<String>,
}

impl TargetOverride {
    fn merge(&mut self, other: TargetOverride) {
        if other.cc.is_some() {
            self.cc = other.cc;
        }
        if other.cxx.is_some() {
            self.cxx = other.cxx;
        }
        if other.ar.is_some() {
            self.ar = other.ar;
        }
        if other.linker.is_some() {
            self.linker = other.linker;
        }
        if other.runner.is_some() {
            self.runner = other.runner;
        }
        if !other.rustflags.is_empty() {
            self.rustflags = other.rustflags;
        }
    }
}

impl VersionsConfig {
    /// Overlay configured versions onto `versions`.
    pub fn apply_to(&self, versions: &mut ToolchainVersions) {
        let pairs = [
            (&self.glibc, &mut versions.glibc),
            (&self.macos_sdk, &mut versions.macos_sdk),
            (&self.iphone_sdk, &mut versions.iphone_sdk),
            (&self.freebsd, &mut versions.freebsd),
            (&self.ndk, &mut versions.ndk),
            (&self.qemu, &mut versions.qemu),
            (&self.cross_deps, &mut versions.cross_deps),
        ];
        for (configured, slot) in pairs {
            if let Some(v) = configured {
                *slot = v.clone();
            }
        }
    }

    fn merge(&mut self, other: VersionsConfig) {
        let pairs = [
            (&mut self.glibc, other.glibc),
            (&mut self.macos_sdk, other.macos_sdk),
            (&mut self.iphone_sdk, other.iphone_sdk),
            (&mut self.freebsd, other.freebsd),
            (&mut self.ndk, other.ndk),
            (&mut self.qemu, other.qemu),
            (&mut self.cross_deps, other.cross_deps),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> CrossResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CrossError::io(format!("failed to read {}", path.display()), e))?;

        toml::from_str(&contents).map_err(|e| CrossError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Load configuration, falling back to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("ignoring config {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.cache.dir.is_some() {
            self.cache.dir = other.cache.dir;
        }
        if other.network.github_proxy.is_some() {
            self.network.github_proxy = other.network.github_proxy;
        }
        if other.network.offline {
            self.network.offline = true;
        }
        self.versions.merge(other.versions);
        for (triple, over) in other.target {
            self.target.entry(triple).or_default().merge(over);
        }
    }

    pub fn target_override(&self, triple: &str) -> Option<&TargetOverride> {
        self.target.get(triple)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.xforge/config.toml)
/// 2. Global config (~/.xforge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();
    if let Some(global) = global_path {
        config.merge(Config::load_or_default(global));
    }
    config.merge(Config::load_or_default(project_path));
    config
}

/// The global xforge config directory (~/.xforge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".xforge"))
}

pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".xforge").join("config.toml")
}
