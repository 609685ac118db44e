//! Run wrappers for binaries the host cannot execute directly.
//!
//! Cargo runs `run`/`test`/`bench` binaries through
//! `CARGO_TARGET_<TRIPLE>_RUNNER`. The selector picks at most one wrapper
//! per target. Anything that goes wrong while preparing one (emulator
//! download, missing docker or wine) leaves the target unwrapped with a
//! warning; the build itself then decides whether that was fatal.

use std::path::{Path, PathBuf};

use crate::core::command::CargoCommand;
use crate::core::errors::CrossResult;
use crate::core::target::{Arch, Libc, Os, TargetDescriptor};
use crate::util::fs;
use crate::util::hash::Fingerprint;
use crate::util::process::find_executable;
use crate::util::shell::Status;

use super::toolchain::{ResolveContext, ToolchainHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapperKind {
    #[default]
    None,
    /// The sysroot's own dynamic loader, for same-arch foreign-libc binaries
    NativeDynamicLinker,
    QemuUserMode,
    /// QEMU inside a throwaway container, for Linux binaries on macOS
    QemuInContainer,
    Rosetta,
    Wine,
    /// `runner` from a `[target.<triple>]` config table
    Configured,
}

impl WrapperKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WrapperKind::None => "none",
            WrapperKind::NativeDynamicLinker => "native dynamic linker",
            WrapperKind::QemuUserMode => "qemu",
            WrapperKind::QemuInContainer => "qemu in docker",
            WrapperKind::Rosetta => "rosetta",
            WrapperKind::Wine => "wine",
            WrapperKind::Configured => "configured runner",
        }
    }
}

/// How binaries for one target are executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionWrapper {
    pub kind: WrapperKind,
    /// Words placed before the binary path
    pub command_prefix: Vec<String>,
    /// Directories the wrapper itself needs on PATH
    pub path_additions: Vec<PathBuf>,
}

impl ExecutionWrapper {
    pub fn none() -> Self {
        ExecutionWrapper::default()
    }

    pub fn is_none(&self) -> bool {
        self.kind == WrapperKind::None
    }

    fn new(kind: WrapperKind, command_prefix: Vec<String>) -> Self {
        ExecutionWrapper {
            kind,
            command_prefix,
            path_additions: Vec::new(),
        }
    }

    /// Value for `CARGO_TARGET_<TRIPLE>_RUNNER`.
    pub fn runner(&self) -> Option<String> {
        (!self.is_none() && !self.command_prefix.is_empty())
            .then(|| self.command_prefix.join(" "))
    }
}

type ToolLookup = fn(&str) -> Option<PathBuf>;

/// Chooses the [`ExecutionWrapper`] for a target.
pub struct WrapperSelector<'a> {
    ctx: &'a ResolveContext<'a>,
    configured: Option<&'a str>,
    lookup: ToolLookup,
}

impl<'a> WrapperSelector<'a> {
    pub fn new(ctx: &'a ResolveContext<'a>) -> Self {
        WrapperSelector {
            ctx,
            configured: None,
            lookup: find_executable,
        }
    }

    /// A user-configured runner wins over every automatic choice.
    pub fn configured(mut self, runner: Option<&'a str>) -> Self {
        self.configured = runner.map(str::trim).filter(|r| !r.is_empty());
        self
    }

    /// Replace the PATH lookup used to find docker and wine.
    pub fn tool_lookup(mut self, lookup: ToolLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn select(
        &self,
        command: CargoCommand,
        target: &TargetDescriptor,
        handle: &ToolchainHandle,
    ) -> ExecutionWrapper {
        if !command.executes_binaries() {
            return ExecutionWrapper::none();
        }

        if let Some(runner) = self.configured {
            let words = runner.split_whitespace().map(str::to_string).collect();
            return ExecutionWrapper::new(WrapperKind::Configured, words);
        }

        let wrapper = match self.automatic(target, handle) {
            Ok(wrapper) => wrapper,
            Err(e) => {
                let msg = format!("no runner for {target}: {e}");
                self.ctx.shell.warn(&msg);
                tracing::warn!("{}", msg);
                ExecutionWrapper::none()
            }
        };
        if !wrapper.is_none() {
            self.ctx.shell.status(
                Status::Info,
                format_args!("running {} binaries with {}", target, wrapper.kind.as_str()),
            );
        }
        wrapper
    }

    fn automatic(
        &self,
        target: &TargetDescriptor,
        handle: &ToolchainHandle,
    ) -> CrossResult<ExecutionWrapper> {
        let host = self.ctx.host;
        let Some(arch) = target.arch else {
            return Ok(ExecutionWrapper::none());
        };

        match target.os {
            Os::Darwin => Ok(rosetta(target, arch, host.is_darwin(), &host.arch)),
            Os::Windows if !host.is_windows() && target.libc == Some(Libc::Gnu) => {
                Ok(match (self.lookup)("wine") {
                    Some(_) => ExecutionWrapper::new(WrapperKind::Wine, vec!["wine".to_string()]),
                    None => {
                        self.soft_fail(format!("wine not found, {target} binaries will not run"));
                        ExecutionWrapper::none()
                    }
                })
            }
            Os::Linux => self.linux(target, arch, handle),
            _ => Ok(ExecutionWrapper::none()),
        }
    }

    fn linux(
        &self,
        target: &TargetDescriptor,
        arch: Arch,
        handle: &ToolchainHandle,
    ) -> CrossResult<ExecutionWrapper> {
        let host = self.ctx.host;

        if host.is_linux() && host.can_run_natively(arch) {
            return Ok(native_loader(target, handle).unwrap_or_default());
        }

        let Some(qemu) = arch.emulator_name() else {
            tracing::debug!("no emulator known for {}", arch);
            return Ok(ExecutionWrapper::none());
        };

        if host.is_linux() {
            self.qemu_user(qemu, handle)
        } else if host.is_darwin() {
            self.qemu_in_docker(target, qemu, handle)
        } else {
            Ok(ExecutionWrapper::none())
        }
    }

    fn qemu_user(&self, qemu: &str, handle: &ToolchainHandle) -> CrossResult<ExecutionWrapper> {
        let version = &self.ctx.versions.qemu;
        let url = format!(
            "https://github.com/zijiren233/qemu-user-static/releases/download/{version}/qemu-user-static-{}-musl.tgz",
            self.ctx.host.download_platform()
        );
        let dir = self
            .ctx
            .ensure_toolchain(&format!("qemu-user-static-{version}"), &url)?;

        if !dir.join(qemu).is_file() {
            self.soft_fail(format!("{qemu} is missing from {}", dir.display()));
            return Ok(ExecutionWrapper::none());
        }

        let mut prefix = vec![qemu.to_string()];
        if let Some(sysroot) = handle.sysroot.as_ref().filter(|s| s.join("lib").is_dir()) {
            prefix.push("-L".to_string());
            prefix.push(sysroot.display().to_string());
        }

        let mut wrapper = ExecutionWrapper::new(WrapperKind::QemuUserMode, prefix);
        wrapper.path_additions.push(dir);
        Ok(wrapper)
    }

    fn qemu_in_docker(
        &self,
        target: &TargetDescriptor,
        qemu: &str,
        handle: &ToolchainHandle,
    ) -> CrossResult<ExecutionWrapper> {
        if (self.lookup)("docker").is_none() {
            self.soft_fail("docker not found, Linux binaries will not run on this host");
            return Ok(ExecutionWrapper::none());
        }

        // the emulator runs inside the Linux container, so fetch the Linux build
        let host_arch = &self.ctx.host.arch;
        let version = &self.ctx.versions.qemu;
        let url = format!(
            "https://github.com/zijiren233/qemu-user-static/releases/download/{version}/qemu-user-static-linux-{host_arch}-musl.tgz"
        );
        let dir = self.ctx.ensure_toolchain(
            &format!("qemu-user-static-{version}-linux-{host_arch}"),
            &url,
        )?;
        let qemu_path = dir.join(qemu);
        if !qemu_path.is_file() {
            self.soft_fail(format!("{qemu} is missing from {}", dir.display()));
            return Ok(ExecutionWrapper::none());
        }

        let image = if target.libc == Some(Libc::Musl) {
            "alpine:latest"
        } else {
            "ubuntu:latest"
        };
        let script = DockerScript {
            qemu_path: &qemu_path,
            qemu,
            sysroot: handle.sysroot.as_deref(),
            image,
        };
        let path = script.write(self.ctx.cache.root())?;
        Ok(ExecutionWrapper::new(
            WrapperKind::QemuInContainer,
            vec![path.display().to_string()],
        ))
    }

    fn soft_fail(&self, msg: impl Into<String>) {
        let msg = msg.into();
        self.ctx.shell.warn(&msg);
        tracing::warn!("{}", msg);
    }
}

/// `arch -x86_64` for Intel macOS binaries on Apple Silicon.
fn rosetta(target: &TargetDescriptor, arch: Arch, host_darwin: bool, host_arch: &str) -> ExecutionWrapper {
    if host_darwin
        && host_arch == "aarch64"
        && arch == Arch::X86_64
        && target.triple.contains("-apple-darwin")
    {
        ExecutionWrapper::new(
            WrapperKind::Rosetta,
            vec!["arch".to_string(), "-x86_64".to_string()],
        )
    } else {
        ExecutionWrapper::none()
    }
}

/// Run glibc binaries through the downloaded sysroot's loader.
///
/// Only applies when a cross toolchain with a sysroot was downloaded for a
/// target the host CPU runs natively (e.g. an older glibc on the host arch).
fn native_loader(target: &TargetDescriptor, handle: &ToolchainHandle) -> Option<ExecutionWrapper> {
    if target.libc != Some(Libc::Gnu) {
        return None;
    }
    let lib = handle.sysroot.as_ref()?.join("lib");
    let loader = fs::find_by_pattern(&lib, "ld-linux*.so*")?;
    Some(ExecutionWrapper::new(
        WrapperKind::NativeDynamicLinker,
        vec![
            loader.display().to_string(),
            "--library-path".to_string(),
            lib.display().to_string(),
        ],
    ))
}

/// Shell script that runs one binary under QEMU in a fresh container.
struct DockerScript<'a> {
    qemu_path: &'a Path,
    qemu: &'a str,
    sysroot: Option<&'a Path>,
    image: &'a str,
}

impl DockerScript<'_> {
    fn file_name(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.qemu_path.display().to_string())
            .update_opt(self.sysroot.map(|s| s.display().to_string()).as_deref())
            .update_str(self.image);
        format!("docker-qemu-runner-{}.sh", fp.finish_short())
    }

    fn render(&self) -> String {
        let sysroot = self
            .sysroot
            .map(|s| s.display().to_string())
            .unwrap_or_default();
        format!(
            r#"#!/usr/bin/env bash
set -e

QEMU_PATH="{qemu_path}"
QEMU="{qemu}"
SYSROOT="{sysroot}"
IMAGE="{image}"

if [ $# -lt 1 ]; then
    echo "usage: $0 <binary> [args...]" >&2
    exit 1
fi
BINARY="$1"
shift
NAME=$(basename "$BINARY")

CONTAINER=$(docker create --rm -i "$IMAGE" /bin/sh -c "sleep infinity")
trap 'docker rm -f "$CONTAINER" >/dev/null 2>&1 || true' EXIT
docker start "$CONTAINER" >/dev/null

docker cp "$QEMU_PATH" "$CONTAINER:/usr/bin/$QEMU" >/dev/null
docker exec "$CONTAINER" chmod +x "/usr/bin/$QEMU"
LD_PREFIX=""
if [ -n "$SYSROOT" ] && [ -d "$SYSROOT/lib" ]; then
    docker cp "$SYSROOT" "$CONTAINER:/sysroot" >/dev/null
    LD_PREFIX="/sysroot"
fi
docker cp "$BINARY" "$CONTAINER:/tmp/$NAME" >/dev/null
docker exec "$CONTAINER" chmod +x "/tmp/$NAME"

if [ -n "$LD_PREFIX" ]; then
    docker exec "$CONTAINER" "/usr/bin/$QEMU" -L "$LD_PREFIX" "/tmp/$NAME" "$@"
else
    docker exec "$CONTAINER" "/usr/bin/$QEMU" "/tmp/$NAME" "$@"
fi
"#,
            qemu_path = self.qemu_path.display(),
            qemu = self.qemu,
            image = self.image,
        )
    }

    fn write(&self, dir: &Path) -> CrossResult<PathBuf> {
        let path = dir.join(self.file_name());
        fs::write_string(&path, &self.render())?;
        fs::set_executable(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::resolve_toolchain;
    use crate::core::host::{HostOs, HostPlatform};
    use crate::core::target::TargetRegistry;
    use crate::test_support::{
        darwin_aarch64_host, fixtures, linux_aarch64_host, linux_x86_64_host, FakeFetcher,
        TestEnv,
    };

    const COMMANDS: [CargoCommand; 5] = [
        CargoCommand::Build,
        CargoCommand::Check,
        CargoCommand::Run,
        CargoCommand::Test,
        CargoCommand::Bench,
    ];

    fn found(name: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(name))
    }

    fn missing(_: &str) -> Option<PathBuf> {
        None
    }

    fn sysroot_handle(env: &TestEnv, prefix: &str) -> ToolchainHandle {
        let sysroot = env.root().join(prefix);
        std::fs::create_dir_all(sysroot.join("lib")).unwrap();
        ToolchainHandle {
            sysroot: Some(sysroot),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_and_check_never_wrap() {
        let env = TestEnv::with_fetcher(FakeFetcher::new().layout("qemu", &fixtures::qemu_bundle()));
        let hosts = [
            linux_x86_64_host(),
            darwin_aarch64_host(),
            HostPlatform::new(HostOs::Windows, "x86_64", "x86_64-pc-windows-msvc"),
        ];
        for host in &hosts {
            let ctx = env.ctx(host);
            let selector = WrapperSelector::new(&ctx)
                .configured(Some("my-runner"))
                .tool_lookup(found);
            for triple in TargetRegistry::global().triples() {
                let target = TargetRegistry::global().lookup(triple);
                for command in [CargoCommand::Build, CargoCommand::Check] {
                    let w = selector.select(command, &target, &ToolchainHandle::default());
                    assert!(w.is_none(), "{command} {triple} on {}", host.os);
                    assert_eq!(w.runner(), None);
                }
            }
        }
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_qemu_on_linux_embeds_sysroot() {
        let env = TestEnv::with_fetcher(
            FakeFetcher::new()
                .layout("cross-make", &fixtures::gcc_cross("aarch64-linux-musl"))
                .layout("qemu-user-static", &fixtures::qemu_bundle()),
        );
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("aarch64-unknown-linux-musl");
        let handle = resolve_toolchain(&target, &ctx, None).unwrap();

        let wrapper = WrapperSelector::new(&ctx).select(CargoCommand::Run, &target, &handle);
        assert_eq!(wrapper.kind, WrapperKind::QemuUserMode);

        let sysroot = env
            .cache
            .path_for("aarch64-linux-musl-cross-v0.7.4")
            .join("aarch64-linux-musl");
        assert_eq!(
            wrapper.runner(),
            Some(format!("qemu-aarch64 -L {}", sysroot.display()))
        );
        assert_eq!(
            wrapper.path_additions,
            vec![env.cache.path_for("qemu-user-static-v10.2.0")]
        );
        assert!(env.fetcher.calls()[1].ends_with(
            "/releases/download/v10.2.0/qemu-user-static-linux-x86_64-musl.tgz"
        ));
    }

    #[test]
    fn test_qemu_without_sysroot() {
        let env = TestEnv::with_fetcher(FakeFetcher::new().layout("qemu", &fixtures::qemu_bundle()));
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("riscv64gc-unknown-linux-gnu");

        let w = WrapperSelector::new(&ctx).select(CargoCommand::Test, &target, &ToolchainHandle::default());
        assert_eq!(w.command_prefix, vec!["qemu-riscv64"]);
    }

    #[test]
    fn test_qemu_download_failure_degrades() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("aarch64-unknown-linux-gnu");

        let w = WrapperSelector::new(&ctx).select(CargoCommand::Run, &target, &ToolchainHandle::default());
        assert!(w.is_none());
        assert_eq!(env.fetcher.call_count(), 1);
    }

    #[test]
    fn test_missing_emulator_binary_degrades() {
        let env = TestEnv::with_fetcher(FakeFetcher::new().layout("qemu", &fixtures::qemu_bundle()));
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("s390x-unknown-linux-gnu");

        let w = WrapperSelector::new(&ctx).select(CargoCommand::Run, &target, &ToolchainHandle::default());
        assert!(w.is_none());
    }

    #[test]
    fn test_native_arch_needs_no_emulator() {
        let env = TestEnv::new();
        let host = linux_aarch64_host();
        let ctx = env.ctx(&host);
        let selector = WrapperSelector::new(&ctx);

        for triple in ["armv7-unknown-linux-musleabihf", "aarch64-unknown-linux-musl"] {
            let target = TargetRegistry::global().lookup(triple);
            let w = selector.select(CargoCommand::Run, &target, &ToolchainHandle::default());
            assert!(w.is_none(), "{triple}");
        }
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_native_loader_for_gnu_sysroot() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let handle = sysroot_handle(&env, "i686-linux-gnu");
        let lib = handle.sysroot.clone().unwrap().join("lib");
        std::fs::write(lib.join("ld-linux.so.2"), "").unwrap();

        let target = TargetRegistry::global().lookup("i686-unknown-linux-gnu");
        let w = WrapperSelector::new(&ctx).select(CargoCommand::Run, &target, &handle);
        assert_eq!(w.kind, WrapperKind::NativeDynamicLinker);
        assert_eq!(w.command_prefix[1], "--library-path");
        assert_eq!(w.command_prefix[2], lib.display().to_string());
    }

    #[test]
    fn test_rosetta_on_apple_silicon() {
        let env = TestEnv::new();
        let host = darwin_aarch64_host();
        let ctx = env.ctx(&host);
        let selector = WrapperSelector::new(&ctx);

        let intel = TargetRegistry::global().lookup("x86_64-apple-darwin");
        let w = selector.select(CargoCommand::Run, &intel, &ToolchainHandle::default());
        assert_eq!(w.kind, WrapperKind::Rosetta);
        assert_eq!(w.runner().as_deref(), Some("arch -x86_64"));

        let arm = TargetRegistry::global().lookup("aarch64-apple-darwin");
        assert!(selector
            .select(CargoCommand::Run, &arm, &ToolchainHandle::default())
            .is_none());

        let intel_host = HostPlatform::new(HostOs::Darwin, "x86_64", "x86_64-apple-darwin");
        let ctx = env.ctx(&intel_host);
        assert!(WrapperSelector::new(&ctx)
            .select(CargoCommand::Run, &intel, &ToolchainHandle::default())
            .is_none());
    }

    #[test]
    fn test_wine_for_mingw_targets() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("x86_64-pc-windows-gnu");

        let w = WrapperSelector::new(&ctx)
            .tool_lookup(found)
            .select(CargoCommand::Test, &target, &ToolchainHandle::default());
        assert_eq!(w.kind, WrapperKind::Wine);

        let w = WrapperSelector::new(&ctx)
            .tool_lookup(missing)
            .select(CargoCommand::Test, &target, &ToolchainHandle::default());
        assert!(w.is_none());
    }

    #[test]
    fn test_docker_runner_on_macos() {
        let env = TestEnv::with_fetcher(FakeFetcher::new().layout("qemu", &fixtures::qemu_bundle()));
        let host = darwin_aarch64_host();
        let ctx = env.ctx(&host);
        let handle = sysroot_handle(&env, "x86_64-linux-musl");
        let target = TargetRegistry::global().lookup("x86_64-unknown-linux-musl");

        let w = WrapperSelector::new(&ctx)
            .tool_lookup(found)
            .select(CargoCommand::Run, &target, &handle);
        assert_eq!(w.kind, WrapperKind::QemuInContainer);

        let script = PathBuf::from(&w.command_prefix[0]);
        assert!(script.starts_with(env.cache.root()));
        let body = std::fs::read_to_string(&script).unwrap();
        assert!(body.contains("IMAGE=\"alpine:latest\""));
        assert!(body.contains("QEMU=\"qemu-x86_64\""));
        assert!(body.contains("trap"));
        assert!(fs::is_executable(&script));
        assert!(env.fetcher.calls()[0].ends_with("qemu-user-static-linux-aarch64-musl.tgz"));

        let again = WrapperSelector::new(&ctx)
            .tool_lookup(found)
            .select(CargoCommand::Run, &target, &handle);
        assert_eq!(again.command_prefix, w.command_prefix);
    }

    #[test]
    fn test_docker_script_passes_sysroot_only_when_copied() {
        let script = DockerScript {
            qemu_path: Path::new("/cache/qemu/qemu-aarch64"),
            qemu: "qemu-aarch64",
            sysroot: None,
            image: "alpine:latest",
        }
        .render();
        assert!(script.contains("SYSROOT=\"\""));
        assert!(!script.contains("-L /sysroot"));

        let exec_lines: Vec<&str> = script
            .lines()
            .filter(|l| l.contains("\"/usr/bin/$QEMU\" "))
            .collect();
        assert_eq!(exec_lines.len(), 2);
        assert!(exec_lines[0].contains("-L \"$LD_PREFIX\""));
        assert!(!exec_lines[1].contains("-L"));

        let copy = script.find("LD_PREFIX=\"/sysroot\"").unwrap();
        let guard = script.find("[ -d \"$SYSROOT/lib\" ]").unwrap();
        assert!(guard < copy);
    }

    #[test]
    fn test_docker_missing_degrades() {
        let env = TestEnv::new();
        let host = darwin_aarch64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("aarch64-unknown-linux-gnu");

        let w = WrapperSelector::new(&ctx)
            .tool_lookup(missing)
            .select(CargoCommand::Run, &target, &ToolchainHandle::default());
        assert!(w.is_none());
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_configured_runner_wins() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);
        let target = TargetRegistry::global().lookup("aarch64-unknown-linux-gnu");

        for command in COMMANDS.into_iter().filter(CargoCommand::executes_binaries) {
            let w = WrapperSelector::new(&ctx)
                .configured(Some(" qemu-aarch64 -L /usr/aarch64-linux-gnu "))
                .select(command, &target, &ToolchainHandle::default());
            assert_eq!(w.kind, WrapperKind::Configured);
            assert_eq!(w.runner().as_deref(), Some("qemu-aarch64 -L /usr/aarch64-linux-gnu"));
        }
        assert_eq!(env.fetcher.call_count(), 0);
    }
}
