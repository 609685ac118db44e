//! Toolchain sources.
//!
//! Toolchains come from release archives. [`download`] knows how to fetch
//! and unpack them, [`cache`] makes sure each one is fetched only once.

pub mod cache;
pub mod download;

pub use cache::ToolchainCache;
pub use download::{ArchiveFormat, Fetcher, HttpFetcher};
