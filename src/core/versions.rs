//! Toolchain release versions and their validation.
//!
//! Every version here ends up in a cache directory name, so changing any of
//! them selects a different toolchain instead of reusing a stale one.

use crate::core::errors::{CrossError, CrossResult};
use crate::core::host::HostPlatform;

pub const SUPPORTED_GLIBC_VERSIONS: &[&str] = &[
    "2.28", "2.31", "2.32", "2.33", "2.34", "2.35", "2.36", "2.37", "2.38", "2.39", "2.40", "2.41",
    "2.42",
];
pub const DEFAULT_GLIBC_VERSION: &str = "2.28";

pub const SUPPORTED_IPHONE_SDK_VERSIONS: &[&str] = &[
    "17.0", "17.2", "17.4", "17.5", "18.0", "18.1", "18.2", "18.4", "18.5", "26.0", "26.1", "26.2",
];
pub const DEFAULT_IPHONE_SDK_VERSION: &str = "26.2";

pub const SUPPORTED_MACOS_SDK_VERSIONS: &[&str] = &[
    "14.0", "14.2", "14.4", "14.5", "15.0", "15.1", "15.2", "15.4", "15.5", "26.0", "26.1", "26.2",
];
pub const DEFAULT_MACOS_SDK_VERSION: &str = "26.2";

pub const SUPPORTED_FREEBSD_VERSIONS: &[&str] = &["13", "14", "15"];
pub const DEFAULT_FREEBSD_VERSION: &str = "13";

pub const DEFAULT_CROSS_DEPS_VERSION: &str = "v0.7.4";
pub const DEFAULT_NDK_VERSION: &str = "r27d";
pub const DEFAULT_QEMU_VERSION: &str = "v10.2.0";

/// Release of the osxcross bundles used for Linux -> macOS builds.
pub const OSXCROSS_VERSION: &str = "v0.2.6";
/// Release of the cctools-port bundles used for Linux -> iOS builds.
pub const IOSCROSS_VERSION: &str = "v0.1.9";
/// API level baked into the Android clang wrappers.
pub const ANDROID_API_LEVEL: &str = "24";

/// Version pins for every downloadable toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainVersions {
    pub glibc: String,
    pub macos_sdk: String,
    pub iphone_sdk: String,
    pub freebsd: String,
    pub ndk: String,
    pub qemu: String,
    pub cross_deps: String,
}

impl Default for ToolchainVersions {
    fn default() -> Self {
        ToolchainVersions {
            glibc: DEFAULT_GLIBC_VERSION.to_string(),
            macos_sdk: DEFAULT_MACOS_SDK_VERSION.to_string(),
            iphone_sdk: DEFAULT_IPHONE_SDK_VERSION.to_string(),
            freebsd: DEFAULT_FREEBSD_VERSION.to_string(),
            ndk: DEFAULT_NDK_VERSION.to_string(),
            qemu: DEFAULT_QEMU_VERSION.to_string(),
            cross_deps: DEFAULT_CROSS_DEPS_VERSION.to_string(),
        }
    }
}

impl ToolchainVersions {
    /// Reject versions we have no prebuilt toolchain for.
    ///
    /// SDK versions only matter when the SDK is downloaded, i.e. off macOS.
    pub fn validate(&self, host: &HostPlatform) -> CrossResult<()> {
        check("glibc", &self.glibc, SUPPORTED_GLIBC_VERSIONS)?;
        check("FreeBSD", &self.freebsd, SUPPORTED_FREEBSD_VERSIONS)?;
        if !host.is_darwin() {
            check("macOS SDK", &self.macos_sdk, SUPPORTED_MACOS_SDK_VERSIONS)?;
            check("iPhone SDK", &self.iphone_sdk, SUPPORTED_IPHONE_SDK_VERSIONS)?;
        }
        Ok(())
    }

    pub fn is_default_glibc(&self) -> bool {
        self.glibc == DEFAULT_GLIBC_VERSION
    }

    /// `15.0` -> `15-0`, as used in osxcross/ioscross asset names.
    pub fn dashed(version: &str) -> String {
        version.replace('.', "-")
    }
}

fn check(kind: &'static str, version: &str, supported: &[&str]) -> CrossResult<()> {
    if supported.contains(&version) {
        Ok(())
    } else {
        Err(CrossError::UnsupportedVersion {
            kind,
            version: version.to_string(),
            supported: supported.join(", "),
        })
    }
}
