//! Global context for xforge operations.
//!
//! Provides centralized access to the working directory, the merged
//! configuration and the toolchain cache location.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::util::config::{self, Config};

/// Project directories for xforge
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "xforge", "xforge"));

/// Directory name used under the system temp dir when nothing else is set.
pub const TEMP_CACHE_DIR_NAME: &str = "rust-cross-compiler";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    config: Config,
}

impl GlobalContext {
    /// Create a context for the current directory, loading both config files.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd`, loading both config files.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let global = config::global_config_path();
        let project = config::project_config_path(&cwd);
        let config = config::load_config(global.as_deref(), &project);
        GlobalContext::with_config(cwd, config)
    }

    pub fn with_config(cwd: PathBuf, config: Config) -> Self {
        GlobalContext { cwd, config }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve the toolchain cache root.
    ///
    /// Order: explicit value (flag or CROSS_COMPILER_DIR), `[cache] dir` from
    /// config, the platform cache directory, then the system temp dir.
    pub fn toolchain_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return self.absolutize(dir);
        }
        if let Some(dir) = &self.config.cache.dir {
            return self.absolutize(dir);
        }
        PROJECT_DIRS
            .as_ref()
            .map(|dirs| dirs.cache_dir().join("toolchains"))
            .unwrap_or_else(|| std::env::temp_dir().join(TEMP_CACHE_DIR_NAME))
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
