//! Core data structures for xforge.
//!
//! This module contains the foundational types used throughout xforge:
//! - Target descriptors and the static target registry
//! - Host platform detection
//! - Toolchain version pins
//! - The error taxonomy shared by every stage of a cross build

pub mod command;
pub mod errors;
pub mod host;
pub mod target;
pub mod versions;

pub use command::CargoCommand;
pub use errors::{CrossError, CrossResult};
pub use host::{HostOs, HostPlatform};
pub use target::{Abi, Arch, Libc, Os, TargetDescriptor, TargetRegistry};
pub use versions::ToolchainVersions;
