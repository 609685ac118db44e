//! CLI definitions using clap.
//!
//! The surface mirrors cargo's own flags so `xforge build -p foo` reads like
//! `cargo build -p foo`. Most options also read a default from an
//! environment variable, which is how CI workflows configure xforge.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};

use xforge::builder::env::EnvOptions;
use xforge::builder::flags::CargoOptions;
use xforge::builder::toolchain::{CompilerOverrides, SdkOverrides};
use xforge::core::command::CargoCommand;
use xforge::core::errors::{CrossError, CrossResult};
use xforge::core::versions::ToolchainVersions;
use xforge::ops::CrossOptions;
use xforge::util::config::VersionsConfig;
use xforge::util::shell::ColorChoice;
use xforge::util::GlobalContext;

/// Options that take an optional value, with the value used when bare.
const OPTIONAL_VALUE_FLAGS: &[(&str, &str)] = &[
    ("--crt-static", "true"),
    ("--static-crt", "true"),
    ("--build-std", "true"),
    ("--cargo-trim-paths", "true"),
    ("--trim-paths", "true"),
    ("--rustc-bootstrap", "1"),
    ("--timings", "true"),
];

/// xforge - cross compile Rust projects for any target
#[derive(Parser, Debug)]
#[command(name = "xforge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Targets accept globs (`*-linux-musl`), brace lists \
    (`{x86_64,aarch64}-apple-darwin`), regexes (`~^arm`) and `all`.")]
pub struct Cli {
    /// Cargo command to run (build, check, run, test, bench)
    #[arg(value_parser = parse_command, env = "COMMAND")]
    pub command: Option<CargoCommand>,

    /// Rust toolchain, also accepted as a leading `+toolchain`
    #[arg(long, env = "TOOLCHAIN")]
    pub toolchain: Option<String>,

    /// Targets to build; comma or newline separated, repeatable
    #[arg(short = 't', long = "target", visible_alias = "targets", env = "TARGETS")]
    pub targets: Vec<String>,

    /// Print every supported target and exit
    #[arg(long)]
    pub show_all_targets: bool,

    /// Resolve toolchains and print the environment instead of building
    #[arg(long, visible_alias = "dry-run")]
    pub print_env: bool,

    /// Resolve every toolchain concurrently before building
    #[arg(long)]
    pub prefetch: bool,

    /// Do not install missing rust targets with rustup
    #[arg(long)]
    pub skip_target_install: bool,

    /// Download a cross toolchain even when the host compiler would do
    #[arg(long)]
    pub force_cross_toolchain: bool,

    /// Run `cargo clean` before each target
    #[arg(long, env = "CLEAN_CACHE", value_parser = FalseyValueParser::new())]
    pub clean_cache: bool,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    pub generate_completions: Option<clap_complete::Shell>,

    // Profile and features
    /// Build profile (release, debug or a custom profile)
    #[arg(long, env = "PROFILE", default_value = "release")]
    pub profile: String,

    /// Shorthand for `--profile release`
    #[arg(short = 'r', long)]
    pub release: bool,

    /// Space or comma separated features to activate
    #[arg(short = 'F', long, env = "FEATURES")]
    pub features: Option<String>,

    #[arg(long, env = "NO_DEFAULT_FEATURES", value_parser = FalseyValueParser::new())]
    pub no_default_features: bool,

    #[arg(long, env = "ALL_FEATURES", value_parser = FalseyValueParser::new())]
    pub all_features: bool,

    // Toolchain versions
    #[arg(long, env = "GLIBC_VERSION")]
    pub glibc_version: Option<String>,

    #[arg(long, env = "IPHONE_SDK_VERSION")]
    pub iphone_sdk_version: Option<String>,

    #[arg(long, env = "IPHONE_SDK_PATH")]
    pub iphone_sdk_path: Option<PathBuf>,

    #[arg(long, env = "IPHONE_SIMULATOR_SDK_PATH")]
    pub iphone_simulator_sdk_path: Option<PathBuf>,

    #[arg(long, env = "MACOS_SDK_VERSION")]
    pub macos_sdk_version: Option<String>,

    #[arg(long, env = "MACOS_SDK_PATH")]
    pub macos_sdk_path: Option<PathBuf>,

    #[arg(long, env = "FREEBSD_VERSION")]
    pub freebsd_version: Option<String>,

    #[arg(long, env = "NDK_VERSION")]
    pub ndk_version: Option<String>,

    #[arg(long, env = "QEMU_VERSION")]
    pub qemu_version: Option<String>,

    /// Directory holding downloaded toolchains
    #[arg(long, env = "CROSS_COMPILER_DIR")]
    pub cross_compiler_dir: Option<PathBuf>,

    /// Mirror prefixed to github.com download URLs
    #[arg(long, env = "GH_PROXY")]
    pub github_proxy_mirror: Option<String>,

    // Package selection
    #[arg(short = 'p', long, env = "PACKAGE")]
    pub package: Option<String>,

    #[arg(long, env = "BUILD_WORKSPACE", value_parser = FalseyValueParser::new())]
    pub workspace: bool,

    #[arg(long, env = "EXCLUDE")]
    pub exclude: Option<String>,

    #[arg(long, env = "BIN_TARGET")]
    pub bin: Option<String>,

    #[arg(long, env = "BUILD_BINS", value_parser = FalseyValueParser::new())]
    pub bins: bool,

    #[arg(long, env = "BUILD_LIB", value_parser = FalseyValueParser::new())]
    pub lib: bool,

    #[arg(long, env = "EXAMPLE_TARGET")]
    pub example: Option<String>,

    #[arg(long, env = "BUILD_EXAMPLES", value_parser = FalseyValueParser::new())]
    pub examples: bool,

    #[arg(long, env = "TEST_TARGET")]
    pub test: Option<String>,

    #[arg(long, env = "BUILD_TESTS", value_parser = FalseyValueParser::new())]
    pub tests: bool,

    #[arg(long, env = "BENCH_TARGET")]
    pub bench: Option<String>,

    #[arg(long, env = "BUILD_BENCHES", value_parser = FalseyValueParser::new())]
    pub benches: bool,

    #[arg(long, env = "BUILD_ALL_TARGETS", value_parser = FalseyValueParser::new())]
    pub all_targets: bool,

    #[arg(long, env = "MANIFEST_PATH")]
    pub manifest_path: Option<PathBuf>,

    // Compilers
    /// C compiler; skips toolchain download
    #[arg(long, env = "CC")]
    pub cc: Option<PathBuf>,

    /// C++ compiler; skips toolchain download
    #[arg(long, env = "CXX")]
    pub cxx: Option<PathBuf>,

    #[arg(long, env = "AR")]
    pub ar: Option<PathBuf>,

    #[arg(long, env = "LINKER")]
    pub linker: Option<PathBuf>,

    #[arg(long, env = "CFLAGS")]
    pub cflags: Option<String>,

    #[arg(long, env = "CXXFLAGS")]
    pub cxxflags: Option<String>,

    #[arg(long, env = "LDFLAGS")]
    pub ldflags: Option<String>,

    #[arg(long, env = "CXXSTDLIB")]
    pub cxxstdlib: Option<String>,

    /// Extra rustc flags; repeatable
    #[arg(long, action = ArgAction::Append)]
    pub rustflags: Vec<String>,

    #[arg(long, env = "RUSTC_WRAPPER")]
    pub rustc_wrapper: Option<PathBuf>,

    // sccache
    /// Use sccache as the rustc wrapper
    #[arg(long, env = "ENABLE_SCCACHE", value_parser = FalseyValueParser::new())]
    pub enable_sccache: bool,

    #[arg(long, env = "SCCACHE_DIR")]
    pub sccache_dir: Option<PathBuf>,

    #[arg(long, env = "SCCACHE_CACHE_SIZE")]
    pub sccache_cache_size: Option<String>,

    #[arg(long, env = "SCCACHE_IDLE_TIMEOUT")]
    pub sccache_idle_timeout: Option<String>,

    #[arg(long, env = "SCCACHE_LOG")]
    pub sccache_log: Option<String>,

    #[arg(long, env = "SCCACHE_NO_DAEMON", value_parser = FalseyValueParser::new())]
    pub sccache_no_daemon: bool,

    #[arg(long, env = "SCCACHE_DIRECT", value_parser = FalseyValueParser::new())]
    pub sccache_direct: bool,

    // cc crate
    #[arg(long, env = "CRATE_CC_NO_DEFAULTS", value_parser = FalseyValueParser::new())]
    pub cc_no_defaults: bool,

    #[arg(long, env = "CC_SHELL_ESCAPED_FLAGS", value_parser = FalseyValueParser::new())]
    pub cc_shell_escaped_flags: bool,

    #[arg(long, env = "CC_ENABLE_DEBUG_OUTPUT", value_parser = FalseyValueParser::new())]
    pub cc_enable_debug: bool,

    // std and codegen
    /// Link the C runtime statically (`--crt-static[=true|false]`)
    #[arg(long, visible_alias = "static-crt", env = "CRT_STATIC",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub crt_static: Option<String>,

    #[arg(long, env = "PANIC_IMMEDIATE_ABORT", value_parser = FalseyValueParser::new())]
    pub panic_immediate_abort: bool,

    #[arg(long)]
    pub fmt_debug: Option<String>,

    #[arg(long)]
    pub location_detail: Option<String>,

    /// Build std from source (`--build-std[=crates]`)
    #[arg(long, env = "BUILD_STD",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub build_std: Option<String>,

    #[arg(long, env = "BUILD_STD_FEATURES")]
    pub build_std_features: Option<String>,

    #[arg(long, visible_alias = "trim-paths", env = "CARGO_TRIM_PATHS",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub cargo_trim_paths: Option<String>,

    #[arg(long, env = "NO_EMBED_METADATA", value_parser = FalseyValueParser::new())]
    pub no_embed_metadata: bool,

    #[arg(long, env = "RUSTC_BOOTSTRAP",
          num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub rustc_bootstrap: Option<String>,

    #[arg(long, env = "CMAKE_GENERATOR")]
    pub cmake_generator: Option<String>,

    // Output
    /// Use verbose output (-vv very verbose)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long, env = "QUIET", value_parser = FalseyValueParser::new())]
    pub quiet: bool,

    #[arg(long, env = "MESSAGE_FORMAT")]
    pub message_format: Option<String>,

    /// Coloring: auto, always, never
    #[arg(long, env = "COLOR")]
    pub color: Option<String>,

    #[arg(long, env = "BUILD_PLAN", value_parser = FalseyValueParser::new())]
    pub build_plan: bool,

    #[arg(long, env = "TIMINGS",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub timings: Option<String>,

    // Dependencies
    #[arg(long, env = "IGNORE_RUST_VERSION", value_parser = FalseyValueParser::new())]
    pub ignore_rust_version: bool,

    #[arg(long, env = "LOCKED", value_parser = FalseyValueParser::new())]
    pub locked: bool,

    #[arg(long, env = "OFFLINE", value_parser = FalseyValueParser::new())]
    pub offline: bool,

    #[arg(long, env = "FROZEN", value_parser = FalseyValueParser::new())]
    pub frozen: bool,

    #[arg(long, env = "LOCKFILE_PATH")]
    pub lockfile_path: Option<PathBuf>,

    // Build configuration
    #[arg(short = 'j', long, env = "JOBS")]
    pub jobs: Option<String>,

    #[arg(long, env = "KEEP_GOING", value_parser = FalseyValueParser::new())]
    pub keep_going: bool,

    #[arg(long, env = "FUTURE_INCOMPAT_REPORT", value_parser = FalseyValueParser::new())]
    pub future_incompat_report: bool,

    #[arg(long, env = "CARGO_TARGET_DIR")]
    pub target_dir: Option<PathBuf>,

    #[arg(long, env = "ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Cargo `--config` overrides; repeatable
    #[arg(long = "config", action = ArgAction::Append)]
    pub cargo_config: Vec<String>,

    /// Change to DIR before cargo starts
    #[arg(short = 'C', env = "CARGO_CWD")]
    pub cargo_cwd: Option<PathBuf>,

    /// Unstable cargo flags; repeatable
    #[arg(short = 'Z', action = ArgAction::Append)]
    pub unstable: Vec<String>,

    /// Additional arguments appended to the cargo command
    #[arg(long, visible_alias = "args", env = "CARGO_ARGS", allow_hyphen_values = true)]
    pub cargo_args: Option<String>,

    /// Arguments for the executed binary (run, test, bench)
    #[arg(last = true)]
    pub passthrough: Vec<String>,
}

fn parse_command(s: &str) -> Result<CargoCommand, String> {
    s.parse()
}

fn is_command(token: &str) -> bool {
    token.parse::<CargoCommand>().is_ok()
}

/// Rewrite raw arguments into the form clap parses.
///
/// - drops the `xforge` argument cargo inserts for `cargo xforge ...`
/// - turns a leading `+toolchain` into `--toolchain=toolchain`
/// - turns `--build-std crates` style options into `--build-std=crates`,
///   unless the next token is an option or the (first) command
pub fn normalize_args(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut raw = raw.into_iter();
    let mut out: Vec<String> = raw.next().into_iter().collect();
    let mut rest: Vec<String> = raw.collect();

    if rest.first().map(String::as_str) == Some("xforge") {
        rest.remove(0);
    }
    if let Some(toolchain) = rest.first().and_then(|a| a.strip_prefix('+')) {
        let flag = format!("--toolchain={toolchain}");
        rest[0] = flag;
    }

    let mut command_seen = false;
    let mut iter = rest.into_iter().peekable();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            out.push(arg);
            out.extend(iter);
            break;
        }

        if let Some(&(flag, _)) = OPTIONAL_VALUE_FLAGS.iter().find(|(f, _)| *f == arg) {
            let takes_next = iter
                .peek()
                .is_some_and(|next| !next.starts_with('-') && !(!command_seen && is_command(next)));
            if takes_next {
                if let Some(value) = iter.next() {
                    out.push(format!("{flag}={value}"));
                    continue;
                }
            }
            out.push(arg);
            continue;
        }

        if !command_seen && !arg.starts_with('-') && is_command(&arg) {
            command_seen = true;
        }
        out.push(arg);
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn non_empty_path(value: &Option<PathBuf>) -> Option<PathBuf> {
    value.clone().filter(|p| !p.as_os_str().is_empty())
}

impl Cli {
    /// `-v` count, or VERBOSE_LEVEL when no `-v` was given.
    pub fn verbosity(&self, ambient: &BTreeMap<String, String>) -> u8 {
        if self.verbose > 0 {
            return self.verbose;
        }
        match ambient.get("VERBOSE_LEVEL").map(|v| v.trim()) {
            Some("true") => 1,
            Some(level) => level.parse().unwrap_or(0),
            None => 0,
        }
    }

    pub fn color_choice(&self) -> CrossResult<ColorChoice> {
        match &self.color {
            Some(color) => color.parse().map_err(CrossError::InvalidArgument),
            None => Ok(ColorChoice::Auto),
        }
    }

    pub fn is_json(&self) -> bool {
        self.message_format
            .as_deref()
            .is_some_and(|f| f.starts_with("json"))
    }

    fn versions(&self, ctx: &GlobalContext) -> ToolchainVersions {
        let mut versions = ToolchainVersions::default();
        ctx.config().versions.apply_to(&mut versions);
        VersionsConfig {
            glibc: non_empty(&self.glibc_version),
            macos_sdk: non_empty(&self.macos_sdk_version),
            iphone_sdk: non_empty(&self.iphone_sdk_version),
            freebsd: non_empty(&self.freebsd_version),
            ndk: non_empty(&self.ndk_version),
            qemu: non_empty(&self.qemu_version),
            cross_deps: None,
        }
        .apply_to(&mut versions);
        versions
    }

    fn cargo_options(&self, ambient: &BTreeMap<String, String>) -> CargoOptions {
        let profile = if self.release {
            "release".to_string()
        } else {
            self.profile.clone()
        };

        let extra_args = self
            .cargo_args
            .as_deref()
            .map(|a| a.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let passthrough = if self.passthrough.is_empty() {
            ambient
                .get("CARGO_PASSTHROUGH_ARGS")
                .map(|raw| {
                    let raw = raw.trim();
                    raw.strip_prefix("--")
                        .unwrap_or(raw)
                        .split_whitespace()
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            self.passthrough.clone()
        };

        CargoOptions {
            toolchain: non_empty(&self.toolchain),
            command: self.command.unwrap_or_default(),
            cwd: self.cargo_cwd.clone(),
            unstable: self.unstable.clone(),
            config: self.cargo_config.clone(),
            profile,
            features: non_empty(&self.features),
            no_default_features: self.no_default_features,
            all_features: self.all_features,
            package: non_empty(&self.package),
            workspace: self.workspace,
            exclude: non_empty(&self.exclude),
            bin: non_empty(&self.bin),
            bins: self.bins,
            lib: self.lib,
            example: non_empty(&self.example),
            examples: self.examples,
            test: non_empty(&self.test),
            tests: self.tests,
            bench: non_empty(&self.bench),
            benches: self.benches,
            all_targets: self.all_targets,
            manifest_path: self.manifest_path.clone(),
            build_std: non_empty(&self.build_std),
            build_std_features: non_empty(&self.build_std_features),
            verbose: self.verbosity(ambient),
            quiet: self.quiet,
            message_format: non_empty(&self.message_format),
            color: non_empty(&self.color),
            build_plan: self.build_plan,
            timings: non_empty(&self.timings),
            ignore_rust_version: self.ignore_rust_version,
            locked: self.locked,
            offline: self.offline,
            frozen: self.frozen,
            lockfile_path: self.lockfile_path.clone(),
            jobs: non_empty(&self.jobs),
            keep_going: self.keep_going,
            future_incompat_report: self.future_incompat_report,
            no_embed_metadata: self.no_embed_metadata,
            target_dir: non_empty_path(&self.target_dir),
            artifact_dir: self.artifact_dir.clone(),
            extra_args,
            passthrough,
        }
    }

    fn env_options(&self, ambient: &BTreeMap<String, String>) -> EnvOptions {
        let crt_static = non_empty(&self.crt_static).map(|v| !matches!(v.as_str(), "false" | "0"));

        EnvOptions {
            rustflags: self.rustflags.clone(),
            additional_rustflags: ambient
                .get("ADDITIONAL_RUSTFLAGS")
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
            crt_static,
            panic_immediate_abort: self.panic_immediate_abort,
            fmt_debug: non_empty(&self.fmt_debug),
            location_detail: non_empty(&self.location_detail),
            cflags: non_empty(&self.cflags),
            cxxflags: non_empty(&self.cxxflags),
            ldflags: non_empty(&self.ldflags),
            cxxstdlib: non_empty(&self.cxxstdlib),
            enable_sccache: self.enable_sccache,
            rustc_wrapper: non_empty_path(&self.rustc_wrapper),
            sccache_dir: self.sccache_dir.clone(),
            sccache_cache_size: non_empty(&self.sccache_cache_size),
            sccache_idle_timeout: non_empty(&self.sccache_idle_timeout),
            sccache_log: non_empty(&self.sccache_log),
            sccache_no_daemon: self.sccache_no_daemon,
            sccache_direct: self.sccache_direct,
            cc_no_defaults: self.cc_no_defaults,
            cc_shell_escaped_flags: self.cc_shell_escaped_flags,
            cc_enable_debug: self.cc_enable_debug,
            cargo_trim_paths: non_empty(&self.cargo_trim_paths),
            rustc_bootstrap: non_empty(&self.rustc_bootstrap),
            cmake_generator: non_empty(&self.cmake_generator),
        }
    }

    /// Merge flags, environment and config into the options of a run.
    pub fn cross_options(
        &self,
        ctx: &GlobalContext,
        ambient: &BTreeMap<String, String>,
    ) -> CrossOptions {
        CrossOptions {
            targets: self.targets.clone(),
            cargo: self.cargo_options(ambient),
            env: self.env_options(ambient),
            compilers: CompilerOverrides {
                cc: non_empty_path(&self.cc),
                cxx: non_empty_path(&self.cxx),
                ar: non_empty_path(&self.ar),
                linker: non_empty_path(&self.linker),
                rustflags: Vec::new(),
            },
            sdk: SdkOverrides {
                macos: self.macos_sdk_path.clone(),
                iphone: self.iphone_sdk_path.clone(),
                iphone_simulator: self.iphone_simulator_sdk_path.clone(),
            },
            versions: self.versions(ctx),
            cache_dir: ctx.toolchain_dir(self.cross_compiler_dir.as_deref()),
            force_cross: self.force_cross_toolchain,
            skip_target_install: self.skip_target_install,
            print_env: self.print_env,
            clean_cache: self.clean_cache,
            prefetch: self.prefetch,
        }
    }
}
