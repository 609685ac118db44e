//! xforge - cross compilation for Rust projects
//!
//! This crate provides the library behind the `xforge` and `cargo-xforge`
//! binaries: target expansion, C toolchain provisioning, runner selection
//! and the environment cargo is invoked with.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test doubles for xforge unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a fetcher that lays out fixture toolchains instead of
/// downloading, plus host fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{CargoCommand, CrossError, CrossResult, HostPlatform, TargetDescriptor, TargetRegistry};
pub use ops::{cross_build, CrossOptions, CrossSession};
pub use util::context::GlobalContext;
