//! Host platform detection.

use std::fmt;
use std::process::Command;

use crate::core::target::Arch;

/// Operating system xforge itself runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    Unknown,
}

impl HostOs {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::Darwin => "darwin",
            HostOs::Windows => "windows",
            HostOs::FreeBsd => "freebsd",
            HostOs::Unknown => "unknown",
        }
    }

    fn current() -> Self {
        if cfg!(target_os = "linux") {
            HostOs::Linux
        } else if cfg!(target_os = "macos") {
            HostOs::Darwin
        } else if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "freebsd") {
            HostOs::FreeBsd
        } else {
            HostOs::Unknown
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The machine running the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    /// Architecture name as used in release asset names (`x86_64`, `aarch64`).
    pub arch: String,
    /// Rust host triple.
    pub triple: String,
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: impl Into<String>, triple: impl Into<String>) -> Self {
        HostPlatform {
            os,
            arch: arch.into(),
            triple: triple.into(),
        }
    }

    /// Detect the current host, asking `rustc -vV` for the exact triple.
    pub fn detect() -> Self {
        let os = HostOs::current();
        let arch = current_arch();

        let triple = Command::new("rustc")
            .arg("-vV")
            .output()
            .ok()
            .and_then(|out| String::from_utf8(out.stdout).ok())
            .and_then(|s| parse_host_triple(&s))
            .unwrap_or_else(|| format!("{}-unknown-{}", arch, os.as_str()));

        tracing::debug!("detected host {} ({})", triple, os);
        HostPlatform::new(os, arch, triple)
    }

    /// Platform component of release asset names, e.g. `linux-x86_64`.
    pub fn download_platform(&self) -> String {
        format!("{}-{}", self.os.as_str(), self.arch)
    }

    /// Whether binaries for `target` run here without emulation.
    pub fn can_run_natively(&self, target: Arch) -> bool {
        match self.arch.as_str() {
            "x86_64" => matches!(target, Arch::X86_64 | Arch::I686 | Arch::I586),
            "aarch64" => matches!(
                target,
                Arch::Aarch64 | Arch::Armv5 | Arch::Armv6 | Arch::Armv7
            ),
            "i686" | "i586" => matches!(target, Arch::I686 | Arch::I586),
            other => other == target.as_str(),
        }
    }

    pub fn is_linux(&self) -> bool {
        self.os == HostOs::Linux
    }

    pub fn is_darwin(&self) -> bool {
        self.os == HostOs::Darwin
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    pub fn path_separator(&self) -> &'static str {
        if self.is_windows() {
            ";"
        } else {
            ":"
        }
    }

    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

fn current_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "arm") {
        "armv7"
    } else if cfg!(target_arch = "x86") {
        "i686"
    } else if cfg!(target_arch = "s390x") {
        "s390x"
    } else if cfg!(target_arch = "riscv64") {
        "riscv64"
    } else if cfg!(target_arch = "loongarch64") {
        "loongarch64"
    } else if cfg!(all(target_arch = "powerpc64", target_endian = "big")) {
        "powerpc64"
    } else if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
        "powerpc64le"
    } else if cfg!(all(target_arch = "mips64", target_endian = "big")) {
        "mips64"
    } else if cfg!(all(target_arch = "mips64", target_endian = "little")) {
        "mips64el"
    } else {
        "unknown"
    }
}

fn parse_host_triple(rustc_verbose: &str) -> Option<String> {
    rustc_verbose
        .lines()
        .find_map(|line| line.strip_prefix("host:"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_table() {
        let x64 = HostPlatform::new(HostOs::Linux, "x86_64", "x86_64-unknown-linux-gnu");
        assert!(x64.can_run_natively(Arch::X86_64));
        assert!(x64.can_run_natively(Arch::I586));
        assert!(!x64.can_run_natively(Arch::Aarch64));

        let arm = HostPlatform::new(HostOs::Darwin, "aarch64", "aarch64-apple-darwin");
        assert!(arm.can_run_natively(Arch::Armv7));
        assert!(!arm.can_run_natively(Arch::X86_64));

        let s390 = HostPlatform::new(HostOs::Linux, "s390x", "s390x-unknown-linux-gnu");
        assert!(s390.can_run_natively(Arch::S390x));
        assert!(!s390.can_run_natively(Arch::Powerpc64));
    }

    #[test]
    fn test_parse_host_triple() {
        let out = "rustc 1.80.0 (abc 2024-07-21)\nbinary: rustc\nhost: aarch64-apple-darwin\nrelease: 1.80.0\n";
        assert_eq!(parse_host_triple(out).as_deref(), Some("aarch64-apple-darwin"));
        assert_eq!(parse_host_triple("binary: rustc\n"), None);
    }

    #[test]
    fn test_download_platform() {
        let host = HostPlatform::new(HostOs::Linux, "aarch64", "aarch64-unknown-linux-gnu");
        assert_eq!(host.download_platform(), "linux-aarch64");
        assert_eq!(host.path_separator(), ":");
    }
}
