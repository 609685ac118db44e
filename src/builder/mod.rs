//! Cross build pipeline for a single target.
//!
//! A target goes through three stages:
//! 1. [`toolchain`] resolves (and if needed downloads) a C toolchain
//! 2. [`runner`] picks how produced binaries are executed
//! 3. [`env`] combines both with the cargo options into the environment and
//!    argument vector for one cargo invocation

pub mod env;
pub mod flags;
pub mod runner;
pub mod toolchain;

pub use env::{synthesize, BuildEnvironment, EnvOptions, SynthesisInput};
pub use flags::{CargoFlag, CargoInvocation, CargoOptions};
pub use runner::{ExecutionWrapper, WrapperKind, WrapperSelector};
pub use toolchain::{
    resolve_toolchain, select_overrides, CompilerOverrides, PlatformResolver, ResolveContext,
    SdkOverrides, ToolchainHandle,
};
