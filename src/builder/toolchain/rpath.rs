//! Making a downloaded linker find its own shared libraries.
//!
//! The osxcross and ioscross linkers are dynamically linked against
//! libraries shipped in the bundle's `lib/`. We try to rewrite the linker's
//! rpath in place; if no patching tool is available the directory is added
//! to the library path of the cargo invocation instead.

use std::path::{Path, PathBuf};

use crate::core::host::HostPlatform;
use crate::util::fs;
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::shell::Shell;

use super::ToolchainHandle;

/// How the linker's library lookup was fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpathFix {
    /// The linker binary was rewritten by this tool.
    Patched(&'static str),
    /// The bundle's lib dir goes on LD_LIBRARY_PATH / DYLD_LIBRARY_PATH.
    LibraryPath(PathBuf),
    /// No linker or no `lib/` directory in the bundle.
    NotNeeded,
}

/// Patching tools to try on this host, best first.
fn patch_tools(host: &HostPlatform) -> &'static [&'static str] {
    if host.is_darwin() {
        &["install_name_tool"]
    } else if host.is_linux() {
        &["patchelf", "chrpath"]
    } else {
        &[]
    }
}

fn patch_command(tool: &str, program: &Path, lib: &Path, linker: &Path) -> ProcessBuilder {
    let builder = ProcessBuilder::new(program);
    match tool {
        "patchelf" => builder.arg("--set-rpath").arg(lib).arg(linker),
        "chrpath" => builder.arg("-r").arg(lib).arg(linker),
        _ => builder.arg("-add_rpath").arg(lib).arg(linker),
    }
}

/// Point the linker matching `linker_glob` in `root/bin` at `root/lib`.
pub fn fix_linker_rpath(
    handle: &mut ToolchainHandle,
    root: &Path,
    linker_glob: &str,
    host: &HostPlatform,
    shell: &Shell,
) -> RpathFix {
    let lib = root.join("lib");
    let linker = fs::find_by_pattern(&root.join("bin"), linker_glob);
    let (Some(linker), true) = (linker, lib.is_dir()) else {
        return RpathFix::NotNeeded;
    };

    for &tool in patch_tools(host) {
        let Some(program) = find_executable(tool) else {
            continue;
        };
        match patch_command(tool, &program, &lib, &linker).exec() {
            Ok(out) if out.status.success() => {
                tracing::debug!("patched rpath of {} with {}", linker.display(), tool);
                return RpathFix::Patched(tool);
            }
            Ok(out) => tracing::debug!(
                "{} failed on {}: {}",
                tool,
                linker.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            ),
            Err(e) => tracing::debug!("{} could not run: {}", tool, e),
        }
    }

    let msg = format!(
        "could not patch the rpath of {}; adding {} to the library path instead",
        linker.display(),
        lib.display()
    );
    shell.warn(&msg);
    tracing::warn!("{}", msg);
    handle.library_path.push(lib.clone());
    RpathFix::LibraryPath(lib)
}
