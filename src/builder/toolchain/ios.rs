//! iOS device and simulator targets.

use crate::core::errors::{CrossError, CrossResult};
use crate::core::target::{Arch, Os, TargetDescriptor};
use crate::core::versions::{ToolchainVersions, IOSCROSS_VERSION};

use super::darwin::{apple_clang_handle, explicit_sdk};
use super::detect::{self, AppleSdk};
use super::rpath::fix_linker_rpath;
use super::{require_arch, PlatformResolver, ResolveContext, ToolchainHandle};

const IOS_DEPLOYMENT_TARGET: &str = "12.0";

pub struct IosResolver;

impl PlatformResolver for IosResolver {
    fn name(&self) -> &'static str {
        "ios"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        let arch = require_arch(target, "ios")?;
        let simulator = target.os == Os::IosSim || arch == Arch::X86_64;

        let mut handle = if ctx.host.is_darwin() {
            native(simulator, ctx)?
        } else if ctx.host.is_linux() {
            ioscross(arch, simulator, ctx)?
        } else {
            return Err(CrossError::CrossCompilationNotSupported {
                target_os: target.os.to_string(),
                host_os: ctx.host.os.to_string(),
            });
        };

        let deployment_var = if simulator {
            "IPHONE_SIMULATOR_DEPLOYMENT_TARGET"
        } else {
            "IPHONEOS_DEPLOYMENT_TARGET"
        };
        handle.set_env(deployment_var, IOS_DEPLOYMENT_TARGET);
        Ok(handle)
    }
}

fn sdk_kind(simulator: bool) -> AppleSdk {
    if simulator {
        AppleSdk::IPhoneSimulator
    } else {
        AppleSdk::IPhoneOs
    }
}

fn native(simulator: bool, ctx: &ResolveContext<'_>) -> CrossResult<ToolchainHandle> {
    let explicit = if simulator {
        ctx.sdk.iphone_simulator.as_deref()
    } else {
        ctx.sdk.iphone.as_deref()
    };

    let mut handle = ToolchainHandle::passthrough();
    if let Some(sdk) = explicit_sdk(explicit)?
        .or_else(|| detect::find_apple_sdk(sdk_kind(simulator), &ctx.versions.iphone_sdk))
    {
        tracing::debug!("using iOS SDK at {}", sdk.display());
        handle.use_sdk(&sdk);
    }
    Ok(handle)
}

fn ioscross(arch: Arch, simulator: bool, ctx: &ResolveContext<'_>) -> CrossResult<ToolchainHandle> {
    let prefix = match arch {
        Arch::Aarch64 => "arm64",
        Arch::X86_64 => "x86_64",
        other => {
            return Err(CrossError::UnsupportedArchitecture {
                arch: other.as_str().to_string(),
                os: "ios".to_string(),
            })
        }
    };

    let sdk = ToolchainVersions::dashed(&ctx.versions.iphone_sdk);
    let flavour = if simulator { "-simulator" } else { "" };
    let name = format!("ios-{prefix}-cross{flavour}-{IOSCROSS_VERSION}-{sdk}");
    let url = format!(
        "https://github.com/zijiren233/cctools-port/releases/download/{IOSCROSS_VERSION}/ioscross-{}{sdk}-{prefix}-{}-gnu-ubuntu-{}.tar.gz",
        sdk_kind(simulator).platform(),
        ctx.host.download_platform(),
        ctx.ubuntu_release()
    );
    let root = ctx.ensure_toolchain(&name, &url)?;

    let tool_prefix = format!("{prefix}-apple-darwin11");
    let mut handle = apple_clang_handle(&root, &tool_prefix);
    // the bundled SDK is only announced through SDKROOT
    handle.sdk_root = detect::bundled_sdk(&root, None);

    fix_linker_rpath(
        &mut handle,
        &root,
        &format!("{tool_prefix}-ld"),
        ctx.host,
        ctx.shell,
    );
    Ok(handle)
}
