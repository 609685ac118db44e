//! Windows targets: MinGW-w64 for `-gnu`, the host toolchain for `-msvc`.

use crate::core::errors::{CrossError, CrossResult};
use crate::core::target::{Arch, Libc, TargetDescriptor};

use super::linux::gcc_cross_handle;
use super::{require_arch, PlatformResolver, ResolveContext, ToolchainHandle};

pub struct WindowsResolver;

impl PlatformResolver for WindowsResolver {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        let arch = require_arch(target, "windows")?;

        if target.libc == Some(Libc::Msvc) {
            if ctx.host.is_windows() {
                return Ok(ToolchainHandle::passthrough());
            }
            return Err(CrossError::CrossCompilationNotSupported {
                target_os: "windows-msvc".to_string(),
                host_os: ctx.host.os.to_string(),
            });
        }

        if !matches!(arch, Arch::I686 | Arch::X86_64) {
            return Err(CrossError::UnsupportedArchitecture {
                arch: arch.as_str().to_string(),
                os: "windows-gnu".to_string(),
            });
        }

        let prefix = format!("{}-w64-mingw32", arch.as_str());
        let folder = format!("{prefix}-cross");
        let name = format!("{folder}-{}", ctx.versions.cross_deps);
        let ext = if ctx.host.is_windows() { "zip" } else { "tgz" };
        let url = ctx.cross_make_url(&format!("{folder}.{ext}"));
        let root = ctx.ensure_toolchain(&name, &url)?;

        let mut handle = gcc_cross_handle(&root, &prefix, ctx.host.exe_suffix(), target);
        handle.set_env("CROSS_COMPILE", format!("{prefix}-"));
        Ok(handle)
    }
}
