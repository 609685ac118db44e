//! Environment synthesis for one cargo invocation.
//!
//! [`synthesize`] is a pure function of its inputs: the calling process's
//! environment arrives as a snapshot map and nothing global is mutated, so
//! environments for several targets can be built side by side.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::host::HostPlatform;
use crate::core::target::TargetDescriptor;
use crate::util::process::ProcessBuilder;

use super::flags::{CargoInvocation, CargoOptions};
use super::runner::ExecutionWrapper;
use super::toolchain::ToolchainHandle;

/// Variables forwarded from the caller to the cc crate when set.
const CC_PASSTHROUGH_VARS: &[&str] = &["CC_FORCE_DISABLE", "CC_KNOWN_WRAPPER_CUSTOM"];

/// Environment-level options shared by every target of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOptions {
    /// `--rustflags`, in the order given
    pub rustflags: Vec<String>,
    /// `ADDITIONAL_RUSTFLAGS`, appended after everything else
    pub additional_rustflags: Option<String>,
    pub crt_static: Option<bool>,
    pub panic_immediate_abort: bool,
    pub fmt_debug: Option<String>,
    pub location_detail: Option<String>,

    pub cflags: Option<String>,
    pub cxxflags: Option<String>,
    pub ldflags: Option<String>,
    pub cxxstdlib: Option<String>,

    pub enable_sccache: bool,
    pub rustc_wrapper: Option<PathBuf>,
    pub sccache_dir: Option<PathBuf>,
    pub sccache_cache_size: Option<String>,
    pub sccache_idle_timeout: Option<String>,
    pub sccache_log: Option<String>,
    pub sccache_no_daemon: bool,
    pub sccache_direct: bool,

    pub cc_no_defaults: bool,
    pub cc_shell_escaped_flags: bool,
    pub cc_enable_debug: bool,

    pub cargo_trim_paths: Option<String>,
    pub rustc_bootstrap: Option<String>,
    pub cmake_generator: Option<String>,
}

/// Everything needed to spawn cargo for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub program: String,
    pub argument_vector: Vec<String>,
    /// Variables set on top of the inherited environment
    pub env_vars: BTreeMap<String, String>,
    /// Inherited variables removed before spawning
    pub removed_vars: Vec<String>,
    pub working_directory: PathBuf,
}

impl BuildEnvironment {
    pub fn to_process(&self) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.program)
            .args(&self.argument_vector)
            .envs(&self.env_vars)
            .cwd(&self.working_directory);
        for key in &self.removed_vars {
            pb = pb.env_remove(key);
        }
        pb
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.argument_vector.iter().cloned());
        parts.join(" ")
    }

    /// `KEY=value` lines in key order, for `--print-env`.
    pub fn env_lines(&self) -> Vec<String> {
        self.env_vars
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }
}

/// Inputs to [`synthesize`].
pub struct SynthesisInput<'a> {
    pub target: &'a TargetDescriptor,
    /// Whether `--target` is passed to cargo at all
    pub explicit_target: bool,
    pub host: &'a HostPlatform,
    pub handle: &'a ToolchainHandle,
    pub wrapper: &'a ExecutionWrapper,
    pub cargo: &'a CargoOptions,
    pub options: &'a EnvOptions,
    /// The target has no prebuilt std and must use build-std
    pub needs_build_std: bool,
    /// Snapshot of the calling process's environment
    pub ambient: &'a BTreeMap<String, String>,
    pub cwd: &'a Path,
}

impl SynthesisInput<'_> {
    fn ambient(&self, key: &str) -> Option<&str> {
        self.ambient
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Build-std value in effect, if any.
///
/// An explicit `false` disables it; a target without prebuilt std and
/// `panic=immediate-abort` both turn it on.
pub fn effective_build_std(
    cargo: &CargoOptions,
    options: &EnvOptions,
    needs_build_std: bool,
) -> Option<String> {
    match cargo.build_std.as_deref() {
        Some("false") => None,
        Some(value) => Some(value.to_string()),
        None if needs_build_std || options.panic_immediate_abort => Some("true".to_string()),
        None => None,
    }
}

fn append(flags: &mut String, more: &str) {
    let more = more.trim();
    if more.is_empty() {
        return;
    }
    if !flags.is_empty() {
        flags.push(' ');
    }
    flags.push_str(more);
}

/// RUSTFLAGS for one target, later flags overriding earlier ones.
pub fn compose_rustflags(
    existing: Option<&str>,
    handle: &ToolchainHandle,
    options: &EnvOptions,
) -> String {
    let mut flags = existing.unwrap_or_default().trim().to_string();

    for dir in &handle.extra_lib_search_paths {
        append(&mut flags, &format!("-L {}", dir.display()));
    }
    for flag in &handle.rustflags {
        append(&mut flags, flag);
    }

    match options.crt_static {
        Some(true) => append(&mut flags, "-C target-feature=+crt-static"),
        Some(false) => append(&mut flags, "-C target-feature=-crt-static"),
        None => {}
    }
    if options.panic_immediate_abort {
        append(&mut flags, "-Zunstable-options -Cpanic=immediate-abort");
    }
    if let Some(v) = &options.fmt_debug {
        append(&mut flags, &format!("-Zfmt-debug={v}"));
    }
    if let Some(v) = &options.location_detail {
        append(&mut flags, &format!("-Zlocation-detail={v}"));
    }

    for flag in &options.rustflags {
        append(&mut flags, flag);
    }
    if let Some(extra) = &options.additional_rustflags {
        append(&mut flags, extra);
    }
    flags
}

fn join_paths<'p>(paths: impl IntoIterator<Item = &'p PathBuf>, sep: &str) -> String {
    paths
        .into_iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

fn prepend(entries: String, existing: Option<&str>, sep: &str) -> String {
    match existing {
        Some(rest) => format!("{entries}{sep}{rest}"),
        None => entries,
    }
}

/// Assemble the environment and argument vector for one target.
pub fn synthesize(input: &SynthesisInput<'_>) -> BuildEnvironment {
    let handle = input.handle;
    let options = input.options;
    let host = input.host;
    let lower = input.target.env_lower();
    let upper = input.target.env_upper();
    let sep = host.path_separator();

    let mut env = BTreeMap::new();
    let mut set = |key: String, value: String| {
        env.insert(key, value);
    };
    // per-target variables the caller already set keep their value
    let scoped = |key: String, resolved: &Path| -> (String, String) {
        let value = match input.ambient(&key) {
            Some(preset) => preset.to_string(),
            None => resolved.display().to_string(),
        };
        (key, value)
    };

    // compilers: the cc crate reads the per-target spelling, build scripts the plain one
    for (tool, path) in [("CC", &handle.cc), ("CXX", &handle.cxx), ("AR", &handle.ar)] {
        if let Some(path) = path {
            let (key, value) = scoped(format!("{tool}_{lower}"), path);
            set(key, value);
            set(tool.to_string(), path.display().to_string());
        }
    }
    if let Some(linker) = &handle.linker {
        let (key, value) = scoped(format!("CARGO_TARGET_{upper}_LINKER"), linker);
        set(key, value);
    }
    if let Some(runner) = input.wrapper.runner() {
        set(format!("CARGO_TARGET_{upper}_RUNNER"), runner);
    }

    let exec_path: Vec<&PathBuf> = handle
        .extra_exec_path_entries
        .iter()
        .chain(&input.wrapper.path_additions)
        .collect();
    if !exec_path.is_empty() {
        set(
            "PATH".to_string(),
            prepend(join_paths(exec_path, sep), input.ambient("PATH"), sep),
        );
    }

    if let Some(sdk) = &handle.sdk_root {
        set("SDKROOT".to_string(), sdk.display().to_string());
    }

    if !handle.library_path.is_empty() {
        let var = if host.is_darwin() {
            "DYLD_LIBRARY_PATH"
        } else {
            "LD_LIBRARY_PATH"
        };
        set(
            var.to_string(),
            prepend(join_paths(&handle.library_path, sep), input.ambient(var), sep),
        );
    }

    // toolchain flags, then user flags appended to them
    for (var, from_handle, from_user) in [
        ("CFLAGS", &handle.cflags, &options.cflags),
        ("CXXFLAGS", &handle.cxxflags, &options.cxxflags),
        ("LDFLAGS", &handle.ldflags, &options.ldflags),
    ] {
        let mut value = from_handle.join(" ");
        if let Some(user) = from_user {
            append(&mut value, user);
        }
        if !value.is_empty() {
            set(format!("{var}_{lower}"), value.clone());
            set(var.to_string(), value);
        }
    }
    if let Some(stdlib) = &options.cxxstdlib {
        set(format!("CXXSTDLIB_{lower}"), stdlib.clone());
        set("CXXSTDLIB".to_string(), stdlib.clone());
    }

    for (key, value) in &handle.extra_env {
        set(key.clone(), value.clone());
    }

    if input.explicit_target && input.target.triple == host.triple {
        set("CARGO_UNSTABLE_HOST_CONFIG".to_string(), "true".to_string());
        set(
            "CARGO_UNSTABLE_TARGET_APPLIES_TO_HOST".to_string(),
            "true".to_string(),
        );
        set("CARGO_TARGET_APPLIES_TO_HOST".to_string(), "false".to_string());
    }

    let rustflags = compose_rustflags(input.ambient("RUSTFLAGS"), handle, options);
    if !rustflags.is_empty() {
        set("RUSTFLAGS".to_string(), rustflags);
    }

    if options.enable_sccache {
        set("RUSTC_WRAPPER".to_string(), "sccache".to_string());
    } else if let Some(wrapper) = &options.rustc_wrapper {
        set("RUSTC_WRAPPER".to_string(), wrapper.display().to_string());
    }

    for (key, value) in input.ambient {
        if key.starts_with("SCCACHE_") && !value.is_empty() {
            set(key.clone(), value.clone());
        }
    }
    if let Some(dir) = &options.sccache_dir {
        set("SCCACHE_DIR".to_string(), dir.display().to_string());
    }
    for (key, value) in [
        ("SCCACHE_CACHE_SIZE", &options.sccache_cache_size),
        ("SCCACHE_IDLE_TIMEOUT", &options.sccache_idle_timeout),
        ("SCCACHE_LOG", &options.sccache_log),
    ] {
        if let Some(value) = value {
            set(key.to_string(), value.clone());
        }
    }
    if options.sccache_no_daemon {
        set("SCCACHE_NO_DAEMON".to_string(), "1".to_string());
    }
    if options.sccache_direct {
        set("SCCACHE_DIRECT".to_string(), "true".to_string());
    }

    if options.cc_no_defaults {
        set("CRATE_CC_NO_DEFAULTS".to_string(), "1".to_string());
    }
    if options.cc_shell_escaped_flags {
        set("CC_SHELL_ESCAPED_FLAGS".to_string(), "1".to_string());
    }
    if options.cc_enable_debug || input.cargo.verbose > 0 {
        set("CC_ENABLE_DEBUG_OUTPUT".to_string(), "1".to_string());
    }
    for &key in CC_PASSTHROUGH_VARS {
        if let Some(value) = input.ambient(key) {
            set(key.to_string(), value.to_string());
        }
    }

    for (key, value) in [
        ("CARGO_TRIM_PATHS", &options.cargo_trim_paths),
        ("RUSTC_BOOTSTRAP", &options.rustc_bootstrap),
        ("CMAKE_GENERATOR", &options.cmake_generator),
    ] {
        if let Some(value) = value {
            set(key.to_string(), value.clone());
        }
    }

    let mut removed_vars = Vec::new();
    if input
        .ambient
        .get("CARGO_TARGET_DIR")
        .is_some_and(|v| v.is_empty())
    {
        removed_vars.push("CARGO_TARGET_DIR".to_string());
    }

    let build_std = effective_build_std(input.cargo, options, input.needs_build_std);
    let target = input.explicit_target.then_some(input.target.triple.as_str());
    let argument_vector =
        CargoInvocation::from_options(input.cargo, target, build_std.as_deref()).render();

    BuildEnvironment {
        program: "cargo".to_string(),
        argument_vector,
        env_vars: env,
        removed_vars,
        working_directory: input.cwd.to_path_buf(),
    }
}
