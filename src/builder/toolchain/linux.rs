//! Linux targets: prebuilt GCC cross toolchains from cross-make.

use std::path::Path;

use crate::core::errors::CrossResult;
use crate::core::host::HostPlatform;
use crate::core::target::{linux_bin_prefix, linux_folder_name, Libc, TargetDescriptor};
use crate::core::versions::DEFAULT_GLIBC_VERSION;
use crate::util::fs;

use super::{require_arch, PlatformResolver, ResolveContext, ToolchainHandle};

pub struct LinuxResolver;

impl PlatformResolver for LinuxResolver {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        let arch = require_arch(target, "linux")?;

        if !ctx.force_cross && is_native(target, ctx.host) {
            tracing::debug!("{} builds with the host compiler", target);
            return Ok(ToolchainHandle::passthrough());
        }

        let libc = target.libc.unwrap_or(Libc::Gnu);
        let prefix = linux_bin_prefix(arch, libc, target.abi);
        let folder = linux_folder_name(
            arch,
            libc,
            target.abi,
            &ctx.versions.glibc,
            DEFAULT_GLIBC_VERSION,
        );

        let name = format!("{folder}-{}", ctx.versions.cross_deps);
        let url = ctx.cross_make_url(&format!("{folder}.tgz"));
        let root = ctx.ensure_toolchain(&name, &url)?;

        Ok(gcc_cross_handle(&root, &prefix, "", target))
    }
}

/// Whether the host compiler can build `target` without a cross toolchain.
///
/// True for the host triple itself, and for musl on a Linux host of the
/// same architecture: rustc ships a self-contained musl CRT.
pub(crate) fn is_native(target: &TargetDescriptor, host: &HostPlatform) -> bool {
    if target.triple == host.triple {
        return true;
    }
    host.is_linux()
        && target.libc == Some(Libc::Musl)
        && target.arch.is_some_and(|a| a.as_str() == host.arch)
}

/// Handle for a cross-make style GCC toolchain rooted at `root`.
///
/// Layout: `bin/{prefix}-gcc`, sysroot at `{prefix}/`, gcc runtime at
/// `lib/gcc/{prefix}/<version>/`. Shared by the Linux, MinGW and FreeBSD
/// resolvers.
pub(crate) fn gcc_cross_handle(
    root: &Path,
    prefix: &str,
    exe: &str,
    target: &TargetDescriptor,
) -> ToolchainHandle {
    let bin = root.join("bin");
    let cc = bin.join(format!("{prefix}-gcc{exe}"));

    let mut handle = ToolchainHandle {
        root_dir: Some(root.to_path_buf()),
        cxx: Some(bin.join(format!("{prefix}-g++{exe}"))),
        ar: Some(bin.join(format!("{prefix}-ar{exe}"))),
        linker: Some(cc.clone()),
        cc: Some(cc),
        extra_exec_path_entries: vec![bin],
        ..ToolchainHandle::default()
    };

    let sysroot = root.join(prefix);
    let target_lib = sysroot.join("lib");
    if target_lib.is_dir() {
        handle.extra_lib_search_paths.push(target_lib);
    }

    // first version directory wins when a bundle ships several
    let gcc_lib = fs::first_subdir(&root.join("lib").join("gcc").join(prefix));
    if let Some(dir) = &gcc_lib {
        handle.extra_lib_search_paths.push(dir.clone());
    }

    if sysroot.is_dir() {
        let mut clang_args = vec![format!("--sysroot={}", sysroot.display())];
        if let Some(include) = gcc_lib.map(|d| d.join("include")).filter(|d| d.is_dir()) {
            clang_args.push(format!("-I{}", include.display()));
        }
        let usr_include = sysroot.join("usr").join("include");
        let include = sysroot.join("include");
        if usr_include.is_dir() {
            clang_args.push(format!("-I{}", usr_include.display()));
        } else if include.is_dir() {
            clang_args.push(format!("-I{}", include.display()));
        }
        handle.set_env(
            format!("BINDGEN_EXTRA_CLANG_ARGS_{}", target.env_lower()),
            clang_args.join(" "),
        );
        handle.sysroot = Some(sysroot);
    }

    handle
}
