//! Toolchain resolution.
//!
//! A [`PlatformResolver`] turns a [`TargetDescriptor`] into a
//! [`ToolchainHandle`]: compiler paths, library search paths, sysroot and
//! SDK locations, plus any environment the toolchain needs. There is one
//! resolver per OS family; targets the registry does not know get a
//! pass-through handle and cargo's own defaults.
//!
//! Resolution order:
//! 1. Compiler variables for this exact target already in the environment
//! 2. `--cc`/`--cxx` given on the command line
//! 3. `[target.<triple>]` in the config files
//! 4. The OS family's resolver (which may download a toolchain)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::errors::{CrossError, CrossResult};
use crate::core::host::HostPlatform;
use crate::core::target::{Os, TargetDescriptor};
use crate::core::versions::ToolchainVersions;
use crate::sources::cache::ToolchainCache;
use crate::sources::download::Fetcher;
use crate::util::config::TargetOverride;
use crate::util::fs;
use crate::util::shell::Shell;

mod android;
mod darwin;
pub mod detect;
mod freebsd;
mod ios;
mod linux;
pub mod rpath;
mod windows;

pub use android::AndroidResolver;
pub use darwin::DarwinResolver;
pub use freebsd::FreeBsdResolver;
pub use ios::IosResolver;
pub use linux::LinuxResolver;
pub use windows::WindowsResolver;

/// A located, ready-to-use compiler toolchain.
///
/// An empty handle means "no configuration": cargo and the cc crate pick
/// their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainHandle {
    /// Toolchain directory in the cache; `None` for system toolchains
    pub root_dir: Option<PathBuf>,
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    pub linker: Option<PathBuf>,

    /// Passed to rustc as `-L`; target libs come before gcc runtime libs
    pub extra_lib_search_paths: Vec<PathBuf>,

    /// Apple SDK root (SDKROOT)
    pub sdk_root: Option<PathBuf>,

    /// Prepended to PATH so sibling binutils are found
    pub extra_exec_path_entries: Vec<PathBuf>,

    /// Target sysroot, used by the emulator wrappers
    pub sysroot: Option<PathBuf>,

    /// Additional rustc flags, already split into words
    pub rustflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,

    /// Prepended to LD_LIBRARY_PATH / DYLD_LIBRARY_PATH
    pub library_path: Vec<PathBuf>,

    /// Target-specific variables (deployment targets, bindgen args, ...)
    pub extra_env: BTreeMap<String, String>,
}

impl ToolchainHandle {
    pub fn passthrough() -> Self {
        ToolchainHandle::default()
    }

    pub fn is_passthrough(&self) -> bool {
        *self == ToolchainHandle::default()
    }

    /// Handle built from user-supplied compiler paths; nothing is downloaded.
    pub fn from_overrides(overrides: &CompilerOverrides) -> Self {
        let cc = overrides.cc.clone();
        let ar = overrides
            .ar
            .clone()
            .or_else(|| cc.as_deref().and_then(derive_ar));
        let linker = overrides.linker.clone().or_else(|| cc.clone());
        ToolchainHandle {
            cc,
            cxx: overrides.cxx.clone(),
            ar,
            linker,
            rustflags: overrides.rustflags.clone(),
            ..ToolchainHandle::default()
        }
    }

    /// A handle pointing into a cache directory must have a runnable compiler.
    pub fn validate(&self) -> CrossResult<()> {
        if self.root_dir.is_none() {
            return Ok(());
        }
        match &self.cc {
            Some(cc) if fs::is_executable(cc) => Ok(()),
            Some(cc) => Err(CrossError::CompilerNotFound { path: cc.clone() }),
            None => Err(CrossError::CompilerNotFound {
                path: self.root_dir.clone().unwrap_or_default(),
            }),
        }
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_env.insert(key.into(), value.into());
    }

    /// Link against an SDK: SDKROOT plus a matching `--sysroot` link arg.
    pub fn use_sdk(&mut self, sdk: &Path) {
        self.rustflags
            .push(format!("-Clink-arg=--sysroot={}", sdk.display()));
        self.sdk_root = Some(sdk.to_path_buf());
    }
}

/// Explicit compiler paths from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOverrides {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    pub linker: Option<PathBuf>,
    pub rustflags: Vec<String>,
}

impl CompilerOverrides {
    /// A named compiler replaces the whole toolchain.
    pub fn is_active(&self) -> bool {
        self.cc.is_some() || self.cxx.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.cc.is_none()
            && self.cxx.is_none()
            && self.ar.is_none()
            && self.linker.is_none()
            && self.rustflags.is_empty()
    }

    /// Slot-wise merge; `self` wins wherever it has a value.
    pub fn or(self, lower: CompilerOverrides) -> CompilerOverrides {
        CompilerOverrides {
            cc: self.cc.or(lower.cc),
            cxx: self.cxx.or(lower.cxx),
            ar: self.ar.or(lower.ar),
            linker: self.linker.or(lower.linker),
            rustflags: if self.rustflags.is_empty() {
                lower.rustflags
            } else {
                self.rustflags
            },
        }
    }

    /// Replace the slots set here on a resolved handle.
    pub fn apply_to(&self, handle: &mut ToolchainHandle) {
        if let Some(ar) = &self.ar {
            handle.ar = Some(ar.clone());
        }
        if let Some(linker) = &self.linker {
            handle.linker = Some(linker.clone());
        }
        handle.rustflags.extend(self.rustflags.iter().cloned());
    }

    /// Compiler variables already set for `target` in the environment.
    ///
    /// Accepts the spellings the cc crate and cargo read:
    /// `CC_aarch64_unknown_linux_musl`, `CC_aarch64-unknown-linux-musl`,
    /// `CC_AARCH64_UNKNOWN_LINUX_MUSL` and `CARGO_TARGET_<TRIPLE>_LINKER`.
    pub fn from_env(target: &TargetDescriptor, env: &BTreeMap<String, String>) -> Self {
        let lookup = |tool: &str| -> Option<PathBuf> {
            [
                format!("{tool}_{}", target.env_lower()),
                format!("{tool}_{}", target.triple),
                format!("{tool}_{}", target.env_upper()),
            ]
            .iter()
            .find_map(|key| env.get(key).filter(|v| !v.is_empty()))
            .map(PathBuf::from)
        };

        let linker = env
            .get(&format!("CARGO_TARGET_{}_LINKER", target.env_upper()))
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        CompilerOverrides {
            cc: lookup("CC"),
            cxx: lookup("CXX"),
            ar: lookup("AR"),
            linker,
            rustflags: Vec::new(),
        }
    }

    pub fn from_config(over: &TargetOverride) -> Self {
        CompilerOverrides {
            cc: over.cc.clone(),
            cxx: over.cxx.clone(),
            ar: over.ar.clone(),
            linker: over.linker.clone(),
            rustflags: over.rustflags.clone(),
        }
    }
}

/// Merge user overrides for a target, slot by slot.
///
/// Per slot the order is: variables already set for the target, then the
/// command line, then `[target.<triple>]` in config.
pub fn select_overrides(
    target: &TargetDescriptor,
    env: &BTreeMap<String, String>,
    cli: &CompilerOverrides,
    config: Option<&TargetOverride>,
) -> Option<CompilerOverrides> {
    let merged = CompilerOverrides::from_env(target, env)
        .or(cli.clone())
        .or(config.map(CompilerOverrides::from_config).unwrap_or_default());
    (!merged.is_empty()).then_some(merged)
}

/// Derive the archiver from a compiler name (`aarch64-linux-gnu-gcc` -> `aarch64-linux-gnu-ar`).
pub fn derive_ar(cc: &Path) -> Option<PathBuf> {
    let name = cc.file_name()?.to_str()?;
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("exe") => (stem, ".exe"),
        _ => (name, ""),
    };

    let ar = if let Some(prefix) = stem.strip_suffix("gcc") {
        format!("{prefix}ar{ext}")
    } else if stem.ends_with("clang") {
        format!("llvm-ar{ext}")
    } else if let Some(prefix) = stem.strip_suffix("cc") {
        format!("{prefix}ar{ext}")
    } else {
        return None;
    };
    Some(cc.with_file_name(ar))
}

/// Apple SDK locations given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SdkOverrides {
    pub macos: Option<PathBuf>,
    pub iphone: Option<PathBuf>,
    pub iphone_simulator: Option<PathBuf>,
}

/// Everything a resolver may consult.
pub struct ResolveContext<'a> {
    pub host: &'a HostPlatform,
    pub cache: &'a ToolchainCache,
    pub fetcher: &'a dyn Fetcher,
    pub versions: &'a ToolchainVersions,
    pub shell: &'a Shell,
    pub sdk: SdkOverrides,
    pub verbose: bool,

    /// Download a cross toolchain even when the host could compile natively
    pub force_cross: bool,

    /// Ubuntu release for osxcross/ioscross assets; detected when unset
    pub ubuntu: Option<String>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        host: &'a HostPlatform,
        cache: &'a ToolchainCache,
        fetcher: &'a dyn Fetcher,
        versions: &'a ToolchainVersions,
        shell: &'a Shell,
    ) -> Self {
        ResolveContext {
            host,
            cache,
            fetcher,
            versions,
            shell,
            sdk: SdkOverrides::default(),
            verbose: false,
            force_cross: false,
            ubuntu: None,
        }
    }

    /// Ubuntu release the Apple cross bundles were built on.
    pub(crate) fn ubuntu_release(&self) -> String {
        self.ubuntu
            .clone()
            .or_else(detect::ubuntu_version)
            .unwrap_or_else(|| detect::DEFAULT_UBUNTU_VERSION.to_string())
    }

    /// Base URL of the cross-make releases for this host.
    pub(crate) fn cross_make_url(&self, asset: &str) -> String {
        format!(
            "https://github.com/zijiren233/cross-make/releases/download/{}-{}/{}",
            self.versions.cross_deps,
            self.host.download_platform(),
            asset
        )
    }

    /// Fetch a toolchain archive into the cache unless already present.
    pub(crate) fn ensure_toolchain(&self, name: &str, url: &str) -> CrossResult<PathBuf> {
        self.cache.ensure_archive(name, url, self.fetcher)
    }
}

/// `-fuse-ld` flags pointing clang at a bundle's own linker.
pub(crate) fn use_bundled_linker(handle: &mut ToolchainHandle, ld: &Path) {
    let flag = format!("-fuse-ld={}", ld.display());
    handle.rustflags.push(format!("-Clink-arg={flag}"));
    handle.ldflags.push(flag);
}

/// Resolution strategy for one OS family.
pub trait PlatformResolver: Send + Sync {
    /// Family name for messages.
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle>;
}

/// The resolver for an OS family; `None` for pass-through targets.
pub fn resolver_for(os: Os) -> Option<&'static dyn PlatformResolver> {
    match os {
        Os::Linux => Some(&LinuxResolver),
        Os::Windows => Some(&WindowsResolver),
        Os::FreeBsd => Some(&FreeBsdResolver),
        Os::Darwin => Some(&DarwinResolver),
        Os::Ios | Os::IosSim => Some(&IosResolver),
        Os::Android => Some(&AndroidResolver),
        Os::Other => None,
    }
}

/// Resolve the toolchain for one target.
///
/// A user-named compiler short-circuits everything: no registry lookup, no
/// download. Overrides naming only the archiver or linker are laid over the
/// resolved handle.
pub fn resolve_toolchain(
    target: &TargetDescriptor,
    ctx: &ResolveContext<'_>,
    overrides: Option<&CompilerOverrides>,
) -> CrossResult<ToolchainHandle> {
    if let Some(overrides) = overrides.filter(|o| o.is_active()) {
        tracing::debug!("using user-supplied compilers for {}", target);
        return Ok(ToolchainHandle::from_overrides(overrides));
    }

    let mut handle = resolve_with_registry(target, ctx)?;
    if let Some(overrides) = overrides {
        overrides.apply_to(&mut handle);
    }
    Ok(handle)
}

fn resolve_with_registry(
    target: &TargetDescriptor,
    ctx: &ResolveContext<'_>,
) -> CrossResult<ToolchainHandle> {
    let Some(resolver) = resolver_for(target.os) else {
        ctx.shell.warn(format_args!(
            "no toolchain configuration for {target}, using cargo defaults"
        ));
        return Ok(ToolchainHandle::passthrough());
    };

    tracing::debug!("resolving {} with the {} resolver", target, resolver.name());
    let handle = resolver.resolve(target, ctx)?;
    handle.validate()?;
    Ok(handle)
}

/// The architecture of a registered target, or an error naming the family.
pub(crate) fn require_arch(
    target: &TargetDescriptor,
    family: &str,
) -> CrossResult<crate::core::target::Arch> {
    target.arch.ok_or_else(|| CrossError::UnsupportedArchitecture {
        arch: target.triple.split('-').next().unwrap_or_default().to_string(),
        os: family.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{Arch, Libc};
    use crate::test_support::{fixtures, linux_x86_64_host, FakeFetcher, TestEnv};

    fn musl_target() -> TargetDescriptor {
        TargetDescriptor::new("aarch64-unknown-linux-musl", Os::Linux, Arch::Aarch64)
            .with_libc(Libc::Musl)
    }

    #[test]
    fn test_derive_ar() {
        assert_eq!(
            derive_ar(Path::new("/opt/bin/aarch64-linux-gnu-gcc")),
            Some(PathBuf::from("/opt/bin/aarch64-linux-gnu-ar"))
        );
        assert_eq!(
            derive_ar(Path::new("x86_64-w64-mingw32-gcc.exe")),
            Some(PathBuf::from("x86_64-w64-mingw32-ar.exe"))
        );
        assert_eq!(
            derive_ar(Path::new("/usr/bin/clang")),
            Some(PathBuf::from("/usr/bin/llvm-ar"))
        );
        assert_eq!(derive_ar(Path::new("cc")), Some(PathBuf::from("ar")));
        assert_eq!(derive_ar(Path::new("icx")), None);
    }

    #[test]
    fn test_from_overrides_defaults_linker_and_ar() {
        let handle = ToolchainHandle::from_overrides(&CompilerOverrides {
            cc: Some(PathBuf::from("/x/aarch64-linux-musl-gcc")),
            cxx: Some(PathBuf::from("/x/aarch64-linux-musl-g++")),
            ..Default::default()
        });
        assert_eq!(handle.linker, handle.cc);
        assert_eq!(handle.ar, Some(PathBuf::from("/x/aarch64-linux-musl-ar")));
        assert!(handle.root_dir.is_none());
    }

    #[test]
    fn test_env_override_spellings() {
        let target = musl_target();
        for key in [
            "CC_aarch64_unknown_linux_musl",
            "CC_aarch64-unknown-linux-musl",
            "CC_AARCH64_UNKNOWN_LINUX_MUSL",
        ] {
            let env = BTreeMap::from([(key.to_string(), "/env/gcc".to_string())]);
            let found = CompilerOverrides::from_env(&target, &env);
            assert_eq!(found.cc, Some(PathBuf::from("/env/gcc")), "{key}");
        }
    }

    #[test]
    fn test_override_precedence() {
        let target = musl_target();
        let env = BTreeMap::from([(
            "CC_aarch64_unknown_linux_musl".to_string(),
            "/env/gcc".to_string(),
        )]);
        let cli = CompilerOverrides {
            cc: Some(PathBuf::from("/cli/gcc")),
            ..Default::default()
        };
        let config = TargetOverride {
            cc: Some(PathBuf::from("/config/gcc")),
            ..Default::default()
        };

        let picked = select_overrides(&target, &env, &cli, Some(&config)).unwrap();
        assert_eq!(picked.cc, Some(PathBuf::from("/env/gcc")));

        let picked = select_overrides(&target, &BTreeMap::new(), &cli, Some(&config)).unwrap();
        assert_eq!(picked.cc, Some(PathBuf::from("/cli/gcc")));

        let picked = select_overrides(
            &target,
            &BTreeMap::new(),
            &CompilerOverrides::default(),
            Some(&config),
        )
        .unwrap();
        assert_eq!(picked.cc, Some(PathBuf::from("/config/gcc")));

        assert!(select_overrides(
            &target,
            &BTreeMap::new(),
            &CompilerOverrides::default(),
            Some(&TargetOverride::default())
        )
        .is_none());
    }

    #[test]
    fn test_override_precedence_is_per_slot() {
        let target = musl_target();
        let env = BTreeMap::from([
            ("AR_aarch64_unknown_linux_musl".to_string(), "/env/ar".to_string()),
            (
                "CARGO_TARGET_AARCH64_UNKNOWN_LINUX_MUSL_LINKER".to_string(),
                "/env/ld".to_string(),
            ),
        ]);
        let cli = CompilerOverrides {
            ar: Some(PathBuf::from("/cli/ar")),
            cxx: Some(PathBuf::from("/cli/g++")),
            ..Default::default()
        };
        let config = TargetOverride {
            cc: Some(PathBuf::from("/config/gcc")),
            cxx: Some(PathBuf::from("/config/g++")),
            linker: Some(PathBuf::from("/config/ld")),
            ..Default::default()
        };

        let picked = select_overrides(&target, &env, &cli, Some(&config)).unwrap();
        assert_eq!(picked.cc, Some(PathBuf::from("/config/gcc")));
        assert_eq!(picked.cxx, Some(PathBuf::from("/cli/g++")));
        assert_eq!(picked.ar, Some(PathBuf::from("/env/ar")));
        assert_eq!(picked.linker, Some(PathBuf::from("/env/ld")));
    }

    #[test]
    fn test_linker_only_override_is_laid_over_resolved_toolchain() {
        let env = TestEnv::with_fetcher(
            FakeFetcher::new().layout("cross-make", &fixtures::gcc_cross("aarch64-linux-musl")),
        );
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let overrides = CompilerOverrides {
            linker: Some(PathBuf::from("/my/ld")),
            ..Default::default()
        };

        let handle = resolve_toolchain(&musl_target(), &ctx, Some(&overrides)).unwrap();
        assert_eq!(handle.linker, Some(PathBuf::from("/my/ld")));
        assert!(handle
            .cc
            .as_ref()
            .is_some_and(|cc| cc.ends_with("bin/aarch64-linux-musl-gcc")));
        assert_eq!(env.fetcher.call_count(), 1);
    }

    #[test]
    fn test_overrides_skip_download() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let overrides = CompilerOverrides {
            cc: Some(PathBuf::from("/usr/bin/aarch64-linux-musl-gcc")),
            ..Default::default()
        };

        let handle = resolve_toolchain(&musl_target(), &ctx, Some(&overrides)).unwrap();
        assert_eq!(handle.cc, overrides.cc);
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_unregistered_target_is_passthrough() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);

        let target = TargetDescriptor::passthrough("wasm32-unknown-unknown");
        let handle = resolve_toolchain(&target, &ctx, None).unwrap();
        assert!(handle.is_passthrough());
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_validate_requires_executable_cc() {
        let tmp = tempfile::TempDir::new().unwrap();
        let handle = ToolchainHandle {
            root_dir: Some(tmp.path().to_path_buf()),
            cc: Some(tmp.path().join("bin/gcc")),
            ..Default::default()
        };
        assert!(matches!(
            handle.validate(),
            Err(CrossError::CompilerNotFound { .. })
        ));
        assert!(ToolchainHandle::passthrough().validate().is_ok());
    }
}
