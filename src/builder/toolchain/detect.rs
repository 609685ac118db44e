//! Host detection used by the Apple and Linux-hosted resolvers.

use std::path::{Path, PathBuf};

use crate::util::fs;
use crate::util::process::capture_stdout;

/// Ubuntu release assumed when `lsb_release` is unavailable.
pub const DEFAULT_UBUNTU_VERSION: &str = "20.04";

/// Apple SDK flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleSdk {
    MacOs,
    IPhoneOs,
    IPhoneSimulator,
}

impl AppleSdk {
    /// Platform directory name (`MacOSX`, `iPhoneOS`, `iPhoneSimulator`).
    pub const fn platform(&self) -> &'static str {
        match self {
            AppleSdk::MacOs => "MacOSX",
            AppleSdk::IPhoneOs => "iPhoneOS",
            AppleSdk::IPhoneSimulator => "iPhoneSimulator",
        }
    }

    /// Name understood by `xcrun --sdk`.
    pub fn xcrun_name(&self, version: &str) -> String {
        let base = match self {
            AppleSdk::MacOs => "macosx",
            AppleSdk::IPhoneOs => "iphoneos",
            AppleSdk::IPhoneSimulator => "iphonesimulator",
        };
        format!("{base}{version}")
    }

    /// `<developer>/Platforms/<P>.platform/Developer/SDKs/<P><version>.sdk`
    fn path_under(&self, developer_dir: &Path, version: &str) -> PathBuf {
        let platform = self.platform();
        developer_dir
            .join("Platforms")
            .join(format!("{platform}.platform"))
            .join("Developer")
            .join("SDKs")
            .join(format!("{platform}{version}.sdk"))
    }
}

/// Locate an installed Apple SDK: xcrun, then xcode-select, then `/Applications/Xcode*.app`.
pub fn find_apple_sdk(sdk: AppleSdk, version: &str) -> Option<PathBuf> {
    let name = sdk.xcrun_name(version);
    if let Some(path) = capture_stdout("xcrun", &["--sdk", &name, "--show-sdk-path"])
        .map(PathBuf::from)
        .filter(|p| p.exists())
    {
        return Some(path);
    }

    if let Some(path) = capture_stdout("xcode-select", &["-p"])
        .map(|dev| sdk.path_under(Path::new(&dev), version))
        .filter(|p| p.exists())
    {
        return Some(path);
    }

    search_xcode_apps(Path::new("/Applications"), sdk, version)
}

/// Search `Xcode*.app` bundles under `apps` in name order.
pub fn search_xcode_apps(apps: &Path, sdk: AppleSdk, version: &str) -> Option<PathBuf> {
    fs::sorted_entries(apps)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("Xcode") && n.ends_with(".app"))
        })
        .map(|app| sdk.path_under(&app.join("Contents").join("Developer"), version))
        .find(|p| p.exists())
}

/// The host's Ubuntu release as reported by `lsb_release -rs`.
pub fn ubuntu_version() -> Option<String> {
    capture_stdout("lsb_release", &["-rs"]).filter(|v| v.contains('.'))
}

/// First SDK directory under a bundle's `SDK/` folder, optionally by name prefix.
///
/// Bundles normally ship one SDK; with several, the first in name order wins.
pub fn bundled_sdk(bundle: &Path, name_prefix: Option<&str>) -> Option<PathBuf> {
    fs::sorted_entries(&bundle.join("SDK")).into_iter().find(|p| {
        p.is_dir()
            && name_prefix.is_none_or(|prefix| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
    })
}
