//! Rust target installation.
//!
//! Before a target is built its standard library must exist. rustup can
//! install prebuilt std for tier 1/2 targets; anything rustc knows about
//! beyond that needs `-Zbuild-std` and the `rust-src` component.

use crate::core::errors::{CrossError, CrossResult};
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// How the standard library for a target will be provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSupport {
    /// Prebuilt std was already installed
    Installed,
    /// Prebuilt std was installed just now
    Added,
    /// No prebuilt std; build it from source
    BuildStd,
}

impl TargetSupport {
    pub fn needs_build_std(&self) -> bool {
        matches!(self, TargetSupport::BuildStd)
    }
}

/// The rustup/rustc queries target installation needs.
pub trait RustupCommands: Send + Sync {
    /// `rustup target list --installed`
    fn installed_targets(&self, toolchain: Option<&str>) -> CrossResult<String>;

    /// `rustup target list`
    fn available_targets(&self, toolchain: Option<&str>) -> CrossResult<String>;

    /// `rustup target add`; `false` when rustup exits non-zero
    fn add_target(&self, target: &str, toolchain: Option<&str>) -> CrossResult<bool>;

    /// `rustc --print=target-list`
    fn rustc_targets(&self, toolchain: Option<&str>) -> CrossResult<String>;

    /// `rustup component add rust-src`; `false` when rustup exits non-zero
    fn add_rust_src(&self, target: &str, toolchain: Option<&str>) -> CrossResult<bool>;
}

/// Runs the real `rustup` and `rustc` from PATH.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRustup;

impl SystemRustup {
    fn rustup(args: &[&str], toolchain: Option<&str>) -> ProcessBuilder {
        let pb = ProcessBuilder::new("rustup").args(args);
        match toolchain {
            Some(tc) => pb.args(["--toolchain", tc]),
            None => pb,
        }
    }

    fn stdout(pb: ProcessBuilder) -> CrossResult<String> {
        let output = pb.exec()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RustupCommands for SystemRustup {
    fn installed_targets(&self, toolchain: Option<&str>) -> CrossResult<String> {
        Self::stdout(Self::rustup(&["target", "list", "--installed"], toolchain))
    }

    fn available_targets(&self, toolchain: Option<&str>) -> CrossResult<String> {
        Self::stdout(Self::rustup(&["target", "list"], toolchain))
    }

    fn add_target(&self, target: &str, toolchain: Option<&str>) -> CrossResult<bool> {
        let status = Self::rustup(&["target", "add", target], toolchain).status()?;
        Ok(status.success())
    }

    fn rustc_targets(&self, toolchain: Option<&str>) -> CrossResult<String> {
        let mut pb = ProcessBuilder::new("rustc");
        if let Some(tc) = toolchain {
            pb = pb.arg(format!("+{tc}"));
        }
        Self::stdout(pb.arg("--print=target-list"))
    }

    fn add_rust_src(&self, target: &str, toolchain: Option<&str>) -> CrossResult<bool> {
        let status = Self::rustup(
            &["component", "add", "rust-src", "--target", target],
            toolchain,
        )
        .status()?;
        Ok(status.success())
    }
}

/// Make sure std for `target` is available, installing it if rustup can.
pub fn ensure_target_installed(
    target: &str,
    toolchain: Option<&str>,
    rustup: &dyn RustupCommands,
    shell: &Shell,
) -> CrossResult<TargetSupport> {
    let installed = rustup.installed_targets(toolchain)?;
    if installed.lines().any(|line| line.trim() == target) {
        tracing::debug!("rust target {} already installed", target);
        return Ok(TargetSupport::Installed);
    }

    // uninstalled entries are listed as `<triple>` and installed ones as `<triple> (installed)`
    let available = rustup.available_targets(toolchain)?;
    if available
        .lines()
        .any(|line| line.split_whitespace().next() == Some(target))
    {
        shell.status(Status::Installed, format_args!("rust target {target}"));
        if !rustup.add_target(target, toolchain)? {
            return Err(CrossError::TargetInstallFailed {
                target: target.to_string(),
            });
        }
        return Ok(TargetSupport::Added);
    }

    let known = rustup.rustc_targets(toolchain)?;
    if known.lines().any(|line| line.trim() == target) {
        shell.status(
            Status::Info,
            format_args!("{target} has no prebuilt std, using build-std"),
        );
        return Ok(TargetSupport::BuildStd);
    }

    Err(CrossError::TargetNotInstallable {
        target: target.to_string(),
    })
}

/// Install the std sources build-std compiles from. Failure only warns.
pub fn ensure_rust_src(
    target: &str,
    toolchain: Option<&str>,
    rustup: &dyn RustupCommands,
    shell: &Shell,
) -> CrossResult<()> {
    tracing::debug!("adding rust-src for {}", target);
    if !rustup.add_rust_src(target, toolchain)? {
        let msg = "failed to add the rust-src component, build-std may not work";
        shell.warn(msg);
        tracing::warn!("{}", msg);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fake::FakeRustup;
    use super::*;
    use crate::util::shell::ColorChoice;

    fn shell() -> Shell {
        Shell::from_flags(true, false, ColorChoice::Never, false)
    }

    #[test]
    fn test_installed_target() {
        let rustup = FakeRustup::with_installed(&["x86_64-unknown-linux-musl"]);
        let support =
            ensure_target_installed("x86_64-unknown-linux-musl", None, &rustup, &shell()).unwrap();
        assert_eq!(support, TargetSupport::Installed);
        assert!(rustup.calls().is_empty());
    }

    #[test]
    fn test_available_target_is_added() {
        let mut rustup = FakeRustup::with_installed(&["x86_64-unknown-linux-gnu"]);
        rustup.available = vec!["aarch64-unknown-linux-musl".to_string()];

        let support = ensure_target_installed(
            "aarch64-unknown-linux-musl",
            Some("nightly"),
            &rustup,
            &shell(),
        )
        .unwrap();
        assert_eq!(support, TargetSupport::Added);
        assert!(!support.needs_build_std());
        assert_eq!(rustup.calls(), vec!["target add aarch64-unknown-linux-musl +nightly"]);
    }

    #[test]
    fn test_prefix_of_another_triple_is_not_available() {
        let mut rustup = FakeRustup::with_installed(&[]);
        rustup.available = vec!["armv7-unknown-linux-gnueabihf".to_string()];
        rustup.rustc = vec!["armv7-unknown-linux-gnueabi".to_string()];

        let support =
            ensure_target_installed("armv7-unknown-linux-gnueabi", None, &rustup, &shell())
                .unwrap();
        assert_eq!(support, TargetSupport::BuildStd);
    }

    #[test]
    fn test_failed_install() {
        let mut rustup = FakeRustup::with_installed(&[]);
        rustup.available = vec!["aarch64-unknown-linux-musl".to_string()];
        rustup.add_succeeds = false;

        let err = ensure_target_installed("aarch64-unknown-linux-musl", None, &rustup, &shell())
            .unwrap_err();
        assert!(matches!(err, CrossError::TargetInstallFailed { .. }));
    }

    #[test]
    fn test_rustc_only_target_uses_build_std() {
        let mut rustup = FakeRustup::with_installed(&[]);
        rustup.rustc = vec![
            "mips-unknown-linux-musl".to_string(),
            "x86_64-unknown-linux-gnu".to_string(),
        ];

        let support =
            ensure_target_installed("mips-unknown-linux-musl", None, &rustup, &shell()).unwrap();
        assert!(support.needs_build_std());
        assert!(rustup.calls().is_empty());
    }

    #[test]
    fn test_unknown_target() {
        let rustup = FakeRustup::with_installed(&[]);
        let err =
            ensure_target_installed("foo-unknown-none", None, &rustup, &shell()).unwrap_err();
        assert!(matches!(err, CrossError::TargetNotInstallable { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_rust_src_failure_only_warns() {
        let rustup = FakeRustup::default();
        ensure_rust_src("mips-unknown-linux-musl", None, &rustup, &shell()).unwrap();
        assert_eq!(rustup.calls(), vec!["component add rust-src mips-unknown-linux-musl"]);
    }
}
