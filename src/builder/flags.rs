//! Typed cargo command line.
//!
//! Flags are collected as [`CargoFlag`] values in the order cargo expects
//! them and only turned into strings by [`CargoInvocation::render`].

use std::path::PathBuf;

use crate::core::command::CargoCommand;

/// Crates built by `-Zbuild-std` when it is requested without a list.
pub const DEFAULT_BUILD_STD_CRATES: &str =
    "std,core,alloc,proc_macro,test,panic_abort,panic_unwind";

/// Cargo-facing options shared by every target of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoOptions {
    pub toolchain: Option<String>,
    pub command: CargoCommand,
    /// `-C <dir>`
    pub cwd: Option<PathBuf>,
    /// `-Z <flag>`, repeatable
    pub unstable: Vec<String>,
    /// `--config <kv>`, repeatable
    pub config: Vec<String>,
    /// `release` (default), `debug` or a custom profile name
    pub profile: String,

    pub features: Option<String>,
    pub no_default_features: bool,
    pub all_features: bool,

    pub package: Option<String>,
    pub workspace: bool,
    pub exclude: Option<String>,
    pub bin: Option<String>,
    pub bins: bool,
    pub lib: bool,
    pub example: Option<String>,
    pub examples: bool,
    pub test: Option<String>,
    pub tests: bool,
    pub bench: Option<String>,
    pub benches: bool,
    pub all_targets: bool,
    pub manifest_path: Option<PathBuf>,

    /// Crate list, or `true` for the default set
    pub build_std: Option<String>,
    pub build_std_features: Option<String>,

    pub verbose: u8,
    pub quiet: bool,
    pub message_format: Option<String>,
    pub color: Option<String>,
    pub build_plan: bool,
    /// `true` renders a bare `--timings`
    pub timings: Option<String>,

    pub ignore_rust_version: bool,
    pub locked: bool,
    pub offline: bool,
    pub frozen: bool,
    pub lockfile_path: Option<PathBuf>,

    pub jobs: Option<String>,
    pub keep_going: bool,
    pub future_incompat_report: bool,
    pub no_embed_metadata: bool,
    pub target_dir: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,

    /// Free-form arguments appended before `--`
    pub extra_args: Vec<String>,
    /// Arguments for the executed binary, after `--`
    pub passthrough: Vec<String>,
}

impl Default for CargoOptions {
    fn default() -> Self {
        CargoOptions {
            toolchain: None,
            command: CargoCommand::Build,
            cwd: None,
            unstable: Vec::new(),
            config: Vec::new(),
            profile: "release".to_string(),
            features: None,
            no_default_features: false,
            all_features: false,
            package: None,
            workspace: false,
            exclude: None,
            bin: None,
            bins: false,
            lib: false,
            example: None,
            examples: false,
            test: None,
            tests: false,
            bench: None,
            benches: false,
            all_targets: false,
            manifest_path: None,
            build_std: None,
            build_std_features: None,
            verbose: 0,
            quiet: false,
            message_format: None,
            color: None,
            build_plan: false,
            timings: None,
            ignore_rust_version: false,
            locked: false,
            offline: false,
            frozen: false,
            lockfile_path: None,
            jobs: None,
            keep_going: false,
            future_incompat_report: false,
            no_embed_metadata: false,
            target_dir: None,
            artifact_dir: None,
            extra_args: Vec::new(),
            passthrough: Vec::new(),
        }
    }
}

/// Expand `true` to the default build-std crate list.
pub fn build_std_crates(value: &str) -> &str {
    if value == "true" {
        DEFAULT_BUILD_STD_CRATES
    } else {
        value
    }
}

/// One element of the cargo command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CargoFlag {
    /// `+nightly`
    Toolchain(String),
    Subcommand(CargoCommand),
    /// A flag without a value, e.g. `--release`
    Switch(&'static str),
    /// A flag followed by a separate value word, e.g. `--target x`
    Valued(&'static str, String),
    /// A flag with an attached value, e.g. `--timings=html`
    Joined(&'static str, String),
    /// `-v`, `-vv`, ...
    Verbosity(u8),
    /// A word passed through untouched
    Raw(String),
    /// `--` followed by arguments for the binary
    Passthrough(Vec<String>),
}

impl CargoFlag {
    fn render_into(&self, out: &mut Vec<String>) {
        match self {
            CargoFlag::Toolchain(t) => out.push(format!("+{t}")),
            CargoFlag::Subcommand(c) => out.push(c.as_str().to_string()),
            CargoFlag::Switch(flag) => out.push((*flag).to_string()),
            CargoFlag::Valued(flag, value) => {
                out.push((*flag).to_string());
                out.push(value.clone());
            }
            CargoFlag::Joined(flag, value) => out.push(format!("{flag}={value}")),
            CargoFlag::Verbosity(level) => out.push(format!("-{}", "v".repeat(*level as usize))),
            CargoFlag::Raw(word) => out.push(word.clone()),
            CargoFlag::Passthrough(args) => {
                out.push("--".to_string());
                out.extend(args.iter().cloned());
            }
        }
    }
}

/// Ordered cargo flags for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CargoInvocation {
    flags: Vec<CargoFlag>,
}

fn path_str(path: &std::path::Path) -> String {
    path.display().to_string()
}

impl CargoInvocation {
    pub fn new() -> Self {
        CargoInvocation::default()
    }

    pub fn push(&mut self, flag: CargoFlag) -> &mut Self {
        self.flags.push(flag);
        self
    }

    fn switch(&mut self, on: bool, flag: &'static str) {
        if on {
            self.flags.push(CargoFlag::Switch(flag));
        }
    }

    fn valued(&mut self, flag: &'static str, value: Option<String>) {
        if let Some(value) = value {
            self.flags.push(CargoFlag::Valued(flag, value));
        }
    }

    fn joined(&mut self, flag: &'static str, value: Option<String>) {
        if let Some(value) = value {
            self.flags.push(CargoFlag::Joined(flag, value));
        }
    }

    pub fn flags(&self) -> &[CargoFlag] {
        &self.flags
    }

    /// Build the invocation for one target.
    ///
    /// `target` is `None` when cargo should use its host default, and
    /// `build_std` is the effective build-std value after automatic
    /// enabling (see the environment synthesizer).
    pub fn from_options(opts: &CargoOptions, target: Option<&str>, build_std: Option<&str>) -> Self {
        let mut inv = CargoInvocation::new();

        if let Some(toolchain) = &opts.toolchain {
            inv.push(CargoFlag::Toolchain(toolchain.clone()));
        }
        inv.push(CargoFlag::Subcommand(opts.command));
        inv.valued("-C", opts.cwd.as_deref().map(path_str));
        for flag in &opts.unstable {
            inv.push(CargoFlag::Valued("-Z", flag.clone()));
        }
        for config in &opts.config {
            inv.push(CargoFlag::Valued("--config", config.clone()));
        }
        inv.valued("--target", target.map(str::to_string));

        match opts.profile.as_str() {
            "release" => inv.switch(true, "--release"),
            "debug" => {}
            other => inv.valued("--profile", Some(other.to_string())),
        }

        inv.valued("--features", opts.features.clone());
        inv.switch(opts.no_default_features, "--no-default-features");
        inv.switch(opts.all_features, "--all-features");

        inv.valued("--package", opts.package.clone());
        inv.switch(opts.workspace, "--workspace");
        inv.valued("--exclude", opts.exclude.clone());
        inv.valued("--bin", opts.bin.clone());
        inv.switch(opts.bins, "--bins");
        inv.switch(opts.lib, "--lib");
        inv.valued("--example", opts.example.clone());
        inv.switch(opts.examples, "--examples");
        inv.valued("--test", opts.test.clone());
        inv.switch(opts.tests, "--tests");
        inv.valued("--bench", opts.bench.clone());
        inv.switch(opts.benches, "--benches");
        inv.switch(opts.all_targets, "--all-targets");
        inv.valued("--manifest-path", opts.manifest_path.as_deref().map(path_str));

        inv.joined("-Zbuild-std", build_std.map(|v| build_std_crates(v).to_string()));
        inv.joined("-Zbuild-std-features", opts.build_std_features.clone());

        if opts.verbose > 0 {
            inv.push(CargoFlag::Verbosity(opts.verbose));
        }
        inv.switch(opts.quiet, "--quiet");
        inv.valued("--message-format", opts.message_format.clone());
        inv.valued("--color", opts.color.clone());
        inv.switch(opts.build_plan, "--build-plan");
        match opts.timings.as_deref() {
            Some("true") => inv.switch(true, "--timings"),
            Some(kind) => inv.joined("--timings", Some(kind.to_string())),
            None => {}
        }

        inv.switch(opts.ignore_rust_version, "--ignore-rust-version");
        inv.switch(opts.locked, "--locked");
        inv.switch(opts.offline, "--offline");
        inv.switch(opts.frozen, "--frozen");
        inv.valued("--lockfile-path", opts.lockfile_path.as_deref().map(path_str));

        inv.valued("--jobs", opts.jobs.clone());
        inv.switch(opts.keep_going, "--keep-going");
        inv.switch(opts.future_incompat_report, "--future-incompat-report");
        inv.switch(opts.no_embed_metadata, "-Zno-embed-metadata");
        inv.valued("--target-dir", opts.target_dir.as_deref().map(path_str));
        inv.valued("--artifact-dir", opts.artifact_dir.as_deref().map(path_str));

        for arg in &opts.extra_args {
            inv.push(CargoFlag::Raw(arg.clone()));
        }

        if !opts.passthrough.is_empty() {
            if opts.command.executes_binaries() {
                inv.push(CargoFlag::Passthrough(opts.passthrough.clone()));
            } else {
                tracing::debug!(
                    "ignoring arguments after `--` for `cargo {}`",
                    opts.command
                );
            }
        }

        inv
    }

    /// The argument vector, without the `cargo` program itself.
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::new();
        for flag in &self.flags {
            flag.render_into(&mut out);
        }
        out
    }
}
