//! FreeBSD targets: always cross-compiled with a cross-make GCC toolchain.

use crate::core::errors::{CrossError, CrossResult};
use crate::core::target::{Arch, TargetDescriptor};

use super::linux::gcc_cross_handle;
use super::{require_arch, PlatformResolver, ResolveContext, ToolchainHandle};

const SUPPORTED: &[Arch] = &[
    Arch::X86_64,
    Arch::Aarch64,
    Arch::Powerpc64,
    Arch::Powerpc64le,
    Arch::Riscv64,
];

pub struct FreeBsdResolver;

impl PlatformResolver for FreeBsdResolver {
    fn name(&self) -> &'static str {
        "freebsd"
    }

    fn resolve(
        &self,
        target: &TargetDescriptor,
        ctx: &ResolveContext<'_>,
    ) -> CrossResult<ToolchainHandle> {
        let arch = require_arch(target, "freebsd")?;
        if !SUPPORTED.contains(&arch) {
            return Err(CrossError::UnsupportedArchitecture {
                arch: arch.as_str().to_string(),
                os: "freebsd".to_string(),
            });
        }

        let prefix = format!("{}-unknown-freebsd{}", arch.as_str(), ctx.versions.freebsd);
        let folder = format!("{prefix}-cross");
        let name = format!("{folder}-{}", ctx.versions.cross_deps);
        let url = ctx.cross_make_url(&format!("{folder}.tgz"));
        let root = ctx.ensure_toolchain(&name, &url)?;

        Ok(gcc_cross_handle(&root, &prefix, "", target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{Os, TargetRegistry};
    use crate::test_support::{fixtures, linux_x86_64_host, FakeFetcher, TestEnv};

    #[test]
    fn test_version_is_part_of_prefix() {
        let mut env = TestEnv::with_fetcher(FakeFetcher::new().layout(
            "cross-make",
            &fixtures::gcc_cross("aarch64-unknown-freebsd14"),
        ));
        env.versions.freebsd = "14".to_string();
        let host = linux_x86_64_host();
        let target = TargetRegistry::global().lookup("aarch64-unknown-freebsd");

        let handle = FreeBsdResolver.resolve(&target, &env.ctx(&host)).unwrap();
        assert_eq!(
            handle.root_dir,
            Some(env.cache.path_for("aarch64-unknown-freebsd14-cross-v0.7.4"))
        );
        assert!(handle
            .cc
            .unwrap()
            .ends_with("bin/aarch64-unknown-freebsd14-gcc"));
    }

    #[test]
    fn test_unsupported_arch_fails_before_fetch() {
        let env = TestEnv::new();
        let host = linux_x86_64_host();
        let target = TargetDescriptor::new("mips-unknown-freebsd", Os::FreeBsd, Arch::Mips);

        let err = FreeBsdResolver.resolve(&target, &env.ctx(&host)).unwrap_err();
        assert!(matches!(err, CrossError::UnsupportedArchitecture { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(env.fetcher.call_count(), 0);
    }
}
