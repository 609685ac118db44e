//! Error taxonomy for cross builds.
//!
//! Every failure the orchestrator can hit is one [`CrossError`] variant, so
//! the binary can always pick the right exit code: toolchain fetch problems
//! exit with 2, a failing cargo forwards its own status, Ctrl-C exits 130
//! and everything else exits 1.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

pub type CrossResult<T> = Result<T, CrossError>;

/// Exit code for toolchain download and extraction failures.
pub const EXIT_FETCH_FAILED: i32 = 2;
/// Exit code after Ctrl-C (SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;
/// Exit code after SIGTERM.
pub const EXIT_TERMINATED: i32 = 143;

#[derive(Debug, Error, MietteDiagnostic)]
pub enum CrossError {
    // Configuration
    #[error("invalid argument: {0}")]
    #[diagnostic(code(xforge::config::invalid_argument))]
    InvalidArgument(String),

    #[error("missing value for `{flag}`")]
    #[diagnostic(code(xforge::config::missing_value))]
    MissingValue { flag: String },

    #[error("no targets matched {}", patterns.join(", "))]
    #[diagnostic(
        code(xforge::config::no_targets),
        help("run `xforge --show-all-targets` to list supported targets")
    )]
    NoTargets { patterns: Vec<String> },

    #[error("invalid target triple `{target}`: unexpected character `{ch}`")]
    #[diagnostic(code(xforge::config::invalid_triple))]
    InvalidTargetTriple { target: String, ch: char },

    #[error("unsupported {kind} version `{version}`")]
    #[diagnostic(code(xforge::config::unsupported_version))]
    UnsupportedVersion {
        kind: &'static str,
        version: String,
        supported: String,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    #[diagnostic(code(xforge::config::invalid))]
    Config { path: PathBuf, message: String },

    #[error("SDK path does not exist: {}", path.display())]
    #[diagnostic(code(xforge::config::sdk_path))]
    SdkPathNotExist { path: PathBuf },

    // Resolution
    #[error("unsupported architecture `{arch}` for {os}")]
    #[diagnostic(code(xforge::resolve::unsupported_arch))]
    UnsupportedArchitecture { arch: String, os: String },

    #[error("cross compilation to {target_os} is not supported from {host_os}")]
    #[diagnostic(code(xforge::resolve::unsupported_host))]
    CrossCompilationNotSupported { target_os: String, host_os: String },

    #[error("compiler not found or not executable: {}", path.display())]
    #[diagnostic(code(xforge::resolve::compiler_not_found))]
    CompilerNotFound { path: PathBuf },

    #[error("target `{target}` is unknown to both rustup and rustc")]
    #[diagnostic(code(xforge::resolve::unknown_target))]
    TargetNotInstallable { target: String },

    #[error("failed to install rust target `{target}`")]
    #[diagnostic(code(xforge::resolve::target_install))]
    TargetInstallFailed { target: String },

    // Fetch
    #[error("failed to download {url}: {reason}")]
    #[diagnostic(code(xforge::fetch::download))]
    DownloadFailed { url: String, reason: String },

    #[error("failed to extract {}: {reason}", path.display())]
    #[diagnostic(code(xforge::fetch::extract))]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("unsupported archive format: {0}")]
    #[diagnostic(code(xforge::fetch::archive_format))]
    UnsupportedArchiveFormat(String),

    // Execution
    #[error("cargo failed for `{target}`{}", code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    #[diagnostic(code(xforge::build::failed))]
    BuildFailed { target: String, code: Option<i32> },

    #[error("cargo clean failed{}", code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    #[diagnostic(code(xforge::build::clean))]
    CleanFailed { code: Option<i32> },

    #[error("failed to run `{program}`")]
    #[diagnostic(code(xforge::build::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("interrupted")]
    #[diagnostic(code(xforge::interrupted))]
    Interrupted,

    #[error("terminated")]
    #[diagnostic(code(xforge::terminated))]
    Terminated,

    #[error("{context}")]
    #[diagnostic(code(xforge::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CrossError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CrossError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this failure happened while fetching a toolchain.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            CrossError::DownloadFailed { .. }
                | CrossError::ExtractionFailed { .. }
                | CrossError::UnsupportedArchiveFormat(_)
        )
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_fetch_error() => EXIT_FETCH_FAILED,
            CrossError::BuildFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            CrossError::Interrupted => EXIT_INTERRUPTED,
            CrossError::Terminated => EXIT_TERMINATED,
            _ => 1,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            CrossError::NoTargets { .. } => diag
                .with_suggestion(suggestions::LIST_TARGETS)
                .with_suggestion("Quote glob patterns so the shell does not expand them"),

            CrossError::UnsupportedVersion { supported, .. } => {
                diag.with_context(format!("supported versions: {}", supported))
            }

            CrossError::InvalidTargetTriple { .. } => diag.with_context(
                "target triples may only contain a-z, 0-9, `-`, `_` and `.`",
            ),

            CrossError::UnsupportedArchitecture { os, .. } => diag.with_suggestion(format!(
                "Run `xforge --show-all-targets` to see supported {} targets",
                os
            )),

            CrossError::CrossCompilationNotSupported { target_os, .. } => diag
                .with_suggestion(format!("Build {} targets on a supported host", target_os))
                .with_suggestion("Pass `--cc`/`--cxx` to use your own cross compiler"),

            CrossError::CompilerNotFound { .. } => diag
                .with_context("the toolchain cache may be incomplete")
                .with_suggestion(suggestions::CLEAR_CACHE),

            CrossError::TargetNotInstallable { target } => diag.with_suggestion(format!(
                "Check the spelling of `{}` or use a custom target JSON file",
                target
            )),

            CrossError::TargetInstallFailed { target } => diag.with_suggestion(format!(
                "Run `rustup target add {}` manually to see details",
                target
            )),

            CrossError::DownloadFailed { .. } => diag
                .with_suggestion("Check your network connection")
                .with_suggestion("Set `--github-proxy-mirror` or GH_PROXY to use a mirror"),

            CrossError::ExtractionFailed { .. } => {
                diag.with_suggestion("Remove the partial download and retry")
            }

            CrossError::BuildFailed { .. } => {
                diag.with_suggestion(suggestions::VERBOSE)
            }

            CrossError::CleanFailed { .. } => {
                diag.with_suggestion("Drop `--clean-cache` to build on top of existing artifacts")
            }

            CrossError::Spawn { source, .. } | CrossError::Io { source, .. } => {
                diag.with_context(source.to_string())
            }

            _ => diag,
        }
    }
}
