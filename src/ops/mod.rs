//! High-level operations.
//!
//! This module contains the implementation of xforge commands.

pub mod cross_build;
pub mod rustup;

pub use cross_build::{
    cross_build, plan_targets, write_github_output, CargoExecutor, CrossOptions, CrossReport,
    CrossSession, ProcessExecutor, TargetOutcome,
};
pub use rustup::{ensure_rust_src, ensure_target_installed, RustupCommands, SystemRustup, TargetSupport};
