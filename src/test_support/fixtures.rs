//! Hosts and toolchain archive layouts used across tests.

use crate::core::host::{HostOs, HostPlatform};

pub fn linux_x86_64_host() -> HostPlatform {
    HostPlatform::new(HostOs::Linux, "x86_64", "x86_64-unknown-linux-gnu")
}

pub fn linux_aarch64_host() -> HostPlatform {
    HostPlatform::new(HostOs::Linux, "aarch64", "aarch64-unknown-linux-gnu")
}

pub fn darwin_aarch64_host() -> HostPlatform {
    HostPlatform::new(HostOs::Darwin, "aarch64", "aarch64-apple-darwin")
}

pub fn windows_x86_64_host() -> HostPlatform {
    HostPlatform::new(HostOs::Windows, "x86_64", "x86_64-pc-windows-msvc")
}

/// A cross-make GCC toolchain for `prefix` (e.g. `aarch64-linux-musl`).
pub fn gcc_cross(prefix: &str) -> Vec<String> {
    gcc_cross_with_suffix(prefix, "")
}

pub fn gcc_cross_with_suffix(prefix: &str, exe: &str) -> Vec<String> {
    vec![
        format!("bin/{prefix}-gcc{exe}"),
        format!("bin/{prefix}-g++{exe}"),
        format!("bin/{prefix}-ar{exe}"),
        format!("{prefix}/lib/libc.a"),
        format!("{prefix}/usr/include/stdio.h"),
        format!("lib/gcc/{prefix}/13.2.0/include/stddef.h"),
    ]
}

/// The QEMU user-mode bundle.
pub fn qemu_bundle() -> Vec<String> {
    ["qemu-aarch64", "qemu-arm", "qemu-riscv64", "qemu-x86_64"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// An osxcross bundle with a darwin24.5 toolchain and one SDK.
pub fn osxcross(arch: &str) -> Vec<String> {
    vec![
        format!("bin/{arch}-apple-darwin24.5-clang"),
        format!("bin/{arch}-apple-darwin24.5-clang++"),
        format!("bin/{arch}-apple-darwin24.5-ar"),
        format!("bin/{arch}-apple-darwin24.5-ld"),
        "lib/libxar.so.1".to_string(),
        "SDK/MacOSX26.2.sdk/".to_string(),
    ]
}

/// An ioscross bundle for `arch_prefix` (`arm64` or `x86_64`).
pub fn ioscross(arch_prefix: &str, sdk: &str) -> Vec<String> {
    vec![
        format!("bin/{arch_prefix}-apple-darwin11-clang"),
        format!("bin/{arch_prefix}-apple-darwin11-clang++"),
        format!("bin/{arch_prefix}-apple-darwin11-ar"),
        format!("bin/{arch_prefix}-apple-darwin11-ld"),
        "lib/libtapi.so".to_string(),
        format!("SDK/{sdk}26.2.sdk/"),
    ]
}

/// An Android NDK zip, wrapped in its usual `android-ndk-<ver>/` directory.
pub fn android_ndk(ndk: &str, prebuilt: &str) -> Vec<String> {
    let base = format!("android-ndk-{ndk}/toolchains/llvm/prebuilt/{prebuilt}");
    vec![
        format!("{base}/bin/aarch64-linux-android24-clang"),
        format!("{base}/bin/aarch64-linux-android24-clang++"),
        format!("{base}/bin/armv7a-linux-androideabi24-clang"),
        format!("{base}/bin/x86_64-linux-android24-clang"),
        format!("{base}/bin/llvm-ar"),
        format!("{base}/lib/libclang.so"),
        format!("android-ndk-{ndk}/build/cmake/android.toolchain.cmake"),
    ]
}
