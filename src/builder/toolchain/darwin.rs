//! macOS targets: the Xcode SDK on macOS hosts, osxcross on Linux hosts.

use std::path::{Path, PathBuf};

use crate::core::errors::{CrossError, CrossResult};
use crate::core::target::TargetDescriptor;
use crate::core::versions::{ToolchainVersions, OSXCROSS_VERSION};
use crate::util::fs;

use super::detect::{self, AppleSdk};
use super::rpath::fix_linker_rpath;
use super::{require_arch, use_bundled_linker, PlatformResolver, ResolveContext, ToolchainHandle};

const MACOSX_DEPLOYMENT_TARGET: &str = "10.12";

pub struct DarwinResolver;

impl PlatformResolver for DarwinResolver {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        require_arch(target, "darwin")?;

        if ctx.host.is_darwin() {
            return native(ctx);
        }
        if ctx.host.is_linux() {
            return osxcross(target, ctx);
        }
        Err(CrossError::CrossCompilationNotSupported {
            target_os: "darwin".to_string(),
            host_os: ctx.host.os.to_string(),
        })
    }
}

/// Apple's own clang; only the SDK location needs settling.
fn native(ctx: &ResolveContext<'_>) -> CrossResult<ToolchainHandle> {
    let mut handle = ToolchainHandle::passthrough();
    if let Some(sdk) = explicit_sdk(ctx.sdk.macos.as_deref())?
        .or_else(|| detect::find_apple_sdk(AppleSdk::MacOs, &ctx.versions.macos_sdk))
    {
        tracing::debug!("using macOS SDK at {}", sdk.display());
        handle.use_sdk(&sdk);
    }
    Ok(handle)
}

/// A user-given SDK path, which must exist.
pub(crate) fn explicit_sdk(path: Option<&Path>) -> CrossResult<Option<PathBuf>> {
    match path {
        Some(p) if !p.exists() => Err(CrossError::SdkPathNotExist {
            path: p.to_path_buf(),
        }),
        Some(p) => Ok(Some(p.to_path_buf())),
        None => Ok(None),
    }
}

fn osxcross(target: &TargetDescriptor, ctx: &ResolveContext<'_>) -> CrossResult<ToolchainHandle> {
    let (cache_arch, asset_arch) = match ctx.host.arch.as_str() {
        "x86_64" | "amd64" => ("amd64", "x86_64"),
        "aarch64" | "arm64" => ("aarch64", "aarch64"),
        _ => {
            return Err(CrossError::CrossCompilationNotSupported {
                target_os: "darwin".to_string(),
                host_os: ctx.host.download_platform(),
            })
        }
    };

    let sdk = ToolchainVersions::dashed(&ctx.versions.macos_sdk);
    let name = format!("osxcross-{sdk}-{cache_arch}-{OSXCROSS_VERSION}");
    let url = format!(
        "https://github.com/zijiren233/osxcross/releases/download/{OSXCROSS_VERSION}/osxcross-{sdk}-linux-{asset_arch}-gnu-ubuntu-{}.tar.gz",
        ctx.ubuntu_release()
    );
    let root = ctx.ensure_toolchain(&name, &url)?;
    let bin = root.join("bin");

    let arch = target.triple.split('-').next().unwrap_or_default();
    let clang_glob = format!("{arch}-apple-darwin*-clang");
    let clang = fs::find_by_pattern(&bin, &clang_glob).ok_or_else(|| {
        CrossError::CompilerNotFound {
            path: bin.join(&clang_glob),
        }
    })?;
    let tool_prefix = clang
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix("-clang"))
        .unwrap_or(arch)
        .to_string();

    let mut handle = apple_clang_handle(&root, &tool_prefix);
    handle.set_env("OSXCROSS_MP_INC", "1");
    handle.set_env("MACOSX_DEPLOYMENT_TARGET", MACOSX_DEPLOYMENT_TARGET);
    handle.set_env("COMPILER_PATH", bin.display().to_string());
    if ctx.verbose {
        handle.set_env("OCDEBUG", "1");
    }

    if let Some(sdk) = detect::bundled_sdk(&root, Some("MacOSX")) {
        handle.use_sdk(&sdk);
    }

    fix_linker_rpath(
        &mut handle,
        &root,
        &format!("{arch}-apple-darwin*-ld"),
        ctx.host,
        ctx.shell,
    );
    Ok(handle)
}

/// Handle for an osxcross/cctools-port bundle whose tools are `bin/{prefix}-*`.
pub(crate) fn apple_clang_handle(root: &Path, tool_prefix: &str) -> ToolchainHandle {
    let bin = root.join("bin");
    let cc = bin.join(format!("{tool_prefix}-clang"));

    let mut exec_path = vec![bin.clone()];
    let clang_bin = root.join("clang").join("bin");
    if clang_bin.is_dir() {
        exec_path.push(clang_bin);
    }

    let mut handle = ToolchainHandle {
        root_dir: Some(root.to_path_buf()),
        cxx: Some(bin.join(format!("{tool_prefix}-clang++"))),
        ar: Some(bin.join(format!("{tool_prefix}-ar"))),
        linker: Some(cc.clone()),
        cc: Some(cc),
        extra_exec_path_entries: exec_path,
        ..ToolchainHandle::default()
    };
    use_bundled_linker(&mut handle, &bin.join(format!("{tool_prefix}-ld")));
    handle
}
