//! Android targets: clang wrappers from a downloaded NDK.
//!
//! One NDK serves every Android architecture, so the cache entry is keyed
//! by host OS and NDK version only.

use std::path::{Path, PathBuf};

use crate::core::errors::{CrossError, CrossResult};
use crate::core::host::HostPlatform;
use crate::core::target::{Arch, TargetDescriptor};
use crate::core::versions::ANDROID_API_LEVEL;
use crate::util::fs;

use super::{require_arch, PlatformResolver, ResolveContext, ToolchainHandle};

pub struct AndroidResolver;

/// Clang wrapper prefix and NDK ABI name for an architecture.
fn arch_info(arch: Arch) -> Option<(&'static str, &'static str)> {
    match arch {
        Arch::Armv7 => Some(("armv7a-linux-androideabi24", "armeabi-v7a")),
        Arch::Aarch64 => Some(("aarch64-linux-android24", "arm64-v8a")),
        Arch::I686 => Some(("i686-linux-android24", "x86")),
        Arch::X86_64 => Some(("x86_64-linux-android24", "x86_64")),
        Arch::Riscv64 => Some(("riscv64-linux-android35", "riscv64")),
        _ => None,
    }
}

impl PlatformResolver for AndroidResolver {
    fn name(&self) -> &'static str {
        "android"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        let arch = require_arch(target, "android")?;
        let (clang_prefix, abi) =
            arch_info(arch).ok_or_else(|| CrossError::UnsupportedArchitecture {
                arch: arch.as_str().to_string(),
                os: "android".to_string(),
            })?;

        let host_os = ctx.host.os.as_str();
        let ndk = &ctx.versions.ndk;
        let name = format!("android-ndk-{host_os}-{ndk}");
        let url = format!("https://dl.google.com/android/repository/android-ndk-{ndk}-{host_os}.zip");
        let root = ctx.ensure_toolchain(&name, &url)?;

        let prebuilt = find_prebuilt(&root, ctx.host).ok_or_else(|| {
            CrossError::CompilerNotFound {
                path: root.join("toolchains/llvm/prebuilt"),
            }
        })?;
        let bin = prebuilt.join("bin");

        let (script, exe) = if ctx.host.is_windows() {
            (".cmd", ".exe")
        } else {
            ("", "")
        };
        let cc = bin.join(format!("{clang_prefix}-clang{script}"));
        let mut handle = ToolchainHandle {
            root_dir: Some(root.clone()),
            cxx: Some(bin.join(format!("{clang_prefix}-clang++{script}"))),
            ar: Some(bin.join(format!("llvm-ar{exe}"))),
            linker: Some(cc.clone()),
            cc: Some(cc),
            extra_exec_path_entries: vec![bin],
            ..ToolchainHandle::default()
        };

        let wrapper = write_cmake_wrapper(&root, abi)?;
        handle.set_env("CMAKE_TOOLCHAIN_FILE", forward_slashes(&wrapper));
        handle.set_env("ANDROID_NDK_HOME", root.display().to_string());

        if let Some(dir) = find_libclang(&prebuilt, ctx.host) {
            handle.set_env("LIBCLANG_PATH", dir.display().to_string());
        }

        Ok(handle)
    }
}

/// The `toolchains/llvm/prebuilt/<host>` directory for this host.
fn find_prebuilt(root: &Path, host: &HostPlatform) -> Option<PathBuf> {
    let base = root.join("toolchains").join("llvm").join("prebuilt");
    let os = host.os.as_str();

    let mut candidates = vec![format!("{os}-{}", host.arch), format!("{os}-x86_64")];
    if host.is_darwin() {
        candidates.push("darwin".to_string());
    }

    candidates
        .iter()
        .map(|c| base.join(c))
        .find(|p| p.join("bin").is_dir())
        .or_else(|| {
            fs::sorted_entries(&base)
                .into_iter()
                .find(|p| p.join("bin").is_dir())
        })
}

fn find_libclang(prebuilt: &Path, host: &HostPlatform) -> Option<PathBuf> {
    let lib = if host.is_windows() {
        "libclang.dll"
    } else if host.is_darwin() {
        "libclang.dylib"
    } else {
        "libclang.so"
    };
    ["lib", "lib64", "musl/lib"]
        .iter()
        .map(|d| prebuilt.join(d))
        .find(|d| d.join(lib).is_file())
}

/// CMake only accepts forward slashes in toolchain paths.
fn forward_slashes(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// A toolchain file pinning the ABI and platform before the NDK's own one.
fn write_cmake_wrapper(ndk: &Path, abi: &str) -> CrossResult<PathBuf> {
    let cmake_dir = ndk.join("build").join("cmake");
    let wrapper = cmake_dir.join("wrappers").join(format!("android-{abi}.cmake"));
    let contents = format!(
        "set(ANDROID_ABI \"{abi}\")\n\
         set(ANDROID_PLATFORM \"android-{ANDROID_API_LEVEL}\")\n\
         set(ANDROID_NDK \"{}\")\n\
         include(\"{}\")\n",
        forward_slashes(ndk),
        forward_slashes(&cmake_dir.join("android.toolchain.cmake")),
    );

    if std::fs::read_to_string(&wrapper).ok().as_deref() != Some(contents.as_str()) {
        if let Some(parent) = wrapper.parent() {
            fs::ensure_dir(parent)?;
        }
        fs::write_string(&wrapper, &contents)?;
    }
    Ok(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::HostOs;
    use crate::core::target::{Os, TargetRegistry};
    use crate::test_support::{
        darwin_aarch64_host, fixtures, linux_x86_64_host, FakeFetcher, TestEnv,
    };

    fn ndk_env(prebuilt: &str) -> TestEnv {
        TestEnv::with_fetcher(
            FakeFetcher::new().layout("android-ndk", &fixtures::android_ndk("r27d", prebuilt)),
        )
    }

    #[test]
    fn test_aarch64_on_linux() {
        let env = ndk_env("linux-x86_64");
        let host = linux_x86_64_host();
        let target = TargetRegistry::global().lookup("aarch64-linux-android");

        let handle = AndroidResolver.resolve(&target, &env.ctx(&host)).unwrap();
        handle.validate().unwrap();

        let root = env.cache.path_for("android-ndk-linux-r27d");
        let bin = root.join("toolchains/llvm/prebuilt/linux-x86_64/bin");
        assert_eq!(handle.cc, Some(bin.join("aarch64-linux-android24-clang")));
        assert_eq!(handle.cxx, Some(bin.join("aarch64-linux-android24-clang++")));
        assert_eq!(handle.ar, Some(bin.join("llvm-ar")));
        assert_eq!(handle.extra_exec_path_entries, vec![bin.clone()]);
        assert_eq!(
            handle.extra_env["LIBCLANG_PATH"],
            root.join("toolchains/llvm/prebuilt/linux-x86_64/lib")
                .display()
                .to_string()
        );
        assert_eq!(
            env.fetcher.calls(),
            vec!["https://dl.google.com/android/repository/android-ndk-r27d-linux.zip"]
        );

        let wrapper = PathBuf::from(&handle.extra_env["CMAKE_TOOLCHAIN_FILE"]);
        assert!(wrapper.ends_with("build/cmake/wrappers/android-arm64-v8a.cmake"));
        let contents = std::fs::read_to_string(&wrapper).unwrap();
        assert!(contents.contains("set(ANDROID_ABI \"arm64-v8a\")"));
        assert!(contents.contains("set(ANDROID_PLATFORM \"android-24\")"));
        assert!(contents.contains("android.toolchain.cmake\")"));
    }

    #[test]
    fn test_one_ndk_serves_every_arch() {
        let env = ndk_env("linux-x86_64");
        let host = linux_x86_64_host();
        let ctx = env.ctx(&host);

        for triple in ["aarch64-linux-android", "armv7-linux-androideabi", "x86_64-linux-android"] {
            let target = TargetRegistry::global().lookup(triple);
            AndroidResolver.resolve(&target, &ctx).unwrap();
        }
        assert_eq!(env.fetcher.call_count(), 1);

        let armv7 = TargetRegistry::global().lookup("arm-linux-androideabi");
        let handle = AndroidResolver.resolve(&armv7, &ctx).unwrap();
        assert!(handle
            .cc
            .unwrap()
            .ends_with("armv7a-linux-androideabi24-clang"));
    }

    #[test]
    fn test_darwin_host_falls_back_to_x86_64_prebuilt() {
        let env = ndk_env("darwin-x86_64");
        let host = darwin_aarch64_host();
        let target = TargetRegistry::global().lookup("x86_64-linux-android");

        let handle = AndroidResolver.resolve(&target, &env.ctx(&host)).unwrap();
        assert!(handle
            .cc
            .unwrap()
            .ends_with("prebuilt/darwin-x86_64/bin/x86_64-linux-android24-clang"));
        assert!(!handle.extra_env.contains_key("LIBCLANG_PATH"));
        assert!(env.fetcher.calls()[0].ends_with("android-ndk-r27d-darwin.zip"));
    }

    #[test]
    fn test_unknown_prebuilt_name_uses_first_with_bin() {
        let env = ndk_env("linux-custom");
        let host = HostPlatform::new(HostOs::Linux, "aarch64", "aarch64-unknown-linux-gnu");
        let target = TargetRegistry::global().lookup("aarch64-linux-android");

        let handle = AndroidResolver.resolve(&target, &env.ctx(&host)).unwrap();
        assert!(handle.cc.unwrap().to_string_lossy().contains("linux-custom"));
    }

    #[test]
    fn test_unsupported_arch() {
        let env = ndk_env("linux-x86_64");
        let host = linux_x86_64_host();
        let target = TargetDescriptor::new("mips-linux-android", Os::Android, Arch::Mips);

        let err = AndroidResolver.resolve(&target, &env.ctx(&host)).unwrap_err();
        assert!(matches!(err, CrossError::UnsupportedArchitecture { .. }));
        assert_eq!(env.fetcher.call_count(), 0);
    }

    #[test]
    fn test_riscv64_uses_api_35() {
        assert_eq!(
            arch_info(Arch::Riscv64),
            Some(("riscv64-linux-android35", "riscv64"))
        );
        assert_eq!(arch_info(Arch::I686), Some(("i686-linux-android24", "x86")));
    }
}
