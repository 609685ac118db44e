//! Implementation of a cross build over a list of targets.
//!
//! Targets run one after another in the sorted order produced by target
//! expansion. The first failing target stops the run. With `prefetch`,
//! every toolchain is resolved on a rayon pool before the first build so
//! downloads overlap; the builds themselves stay sequential.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::builder::env::{effective_build_std, synthesize, BuildEnvironment, EnvOptions, SynthesisInput};
use crate::builder::flags::CargoOptions;
use crate::builder::runner::{WrapperKind, WrapperSelector};
use crate::builder::toolchain::{
    resolve_toolchain, select_overrides, CompilerOverrides, ResolveContext, SdkOverrides,
    ToolchainHandle,
};
use crate::core::errors::{CrossError, CrossResult};
use crate::core::host::HostPlatform;
use crate::core::target::{TargetDescriptor, TargetRegistry};
use crate::core::versions::ToolchainVersions;
use crate::ops::rustup::{ensure_rust_src, ensure_target_installed, RustupCommands};
use crate::sources::cache::ToolchainCache;
use crate::sources::download::Fetcher;
use crate::util::config::Config;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{format_duration, Shell, Status};

/// Options for a cross build.
#[derive(Debug, Clone)]
pub struct CrossOptions {
    /// Target tokens (triples, globs, `~regex`, `all`); empty builds for the host
    pub targets: Vec<String>,
    pub cargo: CargoOptions,
    pub env: EnvOptions,
    /// `--cc`, `--cxx`, `--ar`, `--linker`
    pub compilers: CompilerOverrides,
    pub sdk: SdkOverrides,
    pub versions: ToolchainVersions,
    pub cache_dir: PathBuf,

    /// Download a cross toolchain even where the host compiler would do
    pub force_cross: bool,
    /// Do not consult rustup before building
    pub skip_target_install: bool,
    /// Resolve and print the environment instead of running cargo
    pub print_env: bool,
    /// `cargo clean` before each target
    pub clean_cache: bool,
    /// Resolve all toolchains concurrently before building
    pub prefetch: bool,
}

impl Default for CrossOptions {
    fn default() -> Self {
        CrossOptions {
            targets: Vec::new(),
            cargo: CargoOptions::default(),
            env: EnvOptions::default(),
            compilers: CompilerOverrides::default(),
            sdk: SdkOverrides::default(),
            versions: ToolchainVersions::default(),
            cache_dir: std::env::temp_dir().join(crate::util::context::TEMP_CACHE_DIR_NAME),
            force_cross: false,
            skip_target_install: false,
            print_env: false,
            clean_cache: false,
            prefetch: false,
        }
    }
}

/// Spawns cargo for a synthesized environment.
pub trait CargoExecutor: Sync {
    /// Run the build; a non-zero exit is [`CrossError::BuildFailed`].
    fn run(&self, target: &str, env: &BuildEnvironment) -> CrossResult<()>;

    /// `cargo clean` in the build's working directory; a non-zero exit is
    /// [`CrossError::CleanFailed`].
    fn clean(&self, env: &BuildEnvironment) -> CrossResult<()>;
}

/// Runs the real cargo with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl CargoExecutor for ProcessExecutor {
    fn run(&self, target: &str, env: &BuildEnvironment) -> CrossResult<()> {
        let status = env.to_process().status_tracked()?;
        if status.success() {
            Ok(())
        } else {
            Err(CrossError::BuildFailed {
                target: target.to_string(),
                code: status.code(),
            })
        }
    }

    fn clean(&self, env: &BuildEnvironment) -> CrossResult<()> {
        let mut pb = ProcessBuilder::new(&env.program);
        // keep the `+toolchain` selector so the same cargo cleans
        if let Some(toolchain) = env.argument_vector.first().filter(|a| a.starts_with('+')) {
            pb = pb.arg(toolchain);
        }
        let status = pb
            .arg("clean")
            .cwd(&env.working_directory)
            .status_tracked()?;
        if status.success() {
            Ok(())
        } else {
            tracing::debug!("cargo clean exited with {}", status);
            Err(CrossError::CleanFailed {
                code: status.code(),
            })
        }
    }
}

/// Everything a cross build needs from the outside world.
pub struct CrossSession<'a> {
    pub host: HostPlatform,
    pub shell: Arc<Shell>,
    pub fetcher: &'a dyn Fetcher,
    pub rustup: &'a dyn RustupCommands,
    pub executor: &'a dyn CargoExecutor,
    pub config: &'a Config,
    /// Snapshot of the process environment
    pub ambient: BTreeMap<String, String>,
    pub cwd: PathBuf,
}

/// Result for one finished target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub triple: String,
    pub wrapper: WrapperKind,
    pub environment: BuildEnvironment,
    pub elapsed: Duration,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct CrossReport {
    pub targets: Vec<TargetOutcome>,
    pub elapsed: Duration,
}

impl CrossReport {
    pub fn triples(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.triple.as_str()).collect()
    }
}

/// Expand target tokens, or fall back to the host triple.
///
/// The boolean says whether `--target` is passed to cargo.
pub fn plan_targets(
    tokens: &[String],
    host: &HostPlatform,
) -> CrossResult<(Vec<TargetDescriptor>, bool)> {
    let registry = TargetRegistry::global();
    if tokens.iter().all(|t| t.trim().is_empty()) {
        return Ok((vec![registry.lookup(&host.triple)], false));
    }
    Ok((registry.expand(tokens)?, true))
}

/// Build every requested target, stopping at the first failure.
pub fn cross_build(opts: &CrossOptions, session: &CrossSession<'_>) -> CrossResult<CrossReport> {
    opts.versions.validate(&session.host)?;
    let (targets, explicit_target) = plan_targets(&opts.targets, &session.host)?;

    let cache = ToolchainCache::new(&opts.cache_dir);
    let mut ctx = ResolveContext::new(
        &session.host,
        &cache,
        session.fetcher,
        &opts.versions,
        &session.shell,
    );
    ctx.sdk = opts.sdk.clone();
    ctx.verbose = opts.cargo.verbose > 0;
    ctx.force_cross = opts.force_cross;

    let driver = Driver {
        opts,
        session,
        ctx: &ctx,
        explicit_target,
    };

    let mut prefetched: Vec<Option<CrossResult<ToolchainHandle>>> =
        if opts.prefetch && targets.len() > 1 {
            session.shell.status(
                Status::Resolving,
                format_args!("{} toolchains", targets.len()),
            );
            targets
                .par_iter()
                .map(|t| Some(driver.resolve(t)))
                .collect()
        } else {
            targets.iter().map(|_| None).collect()
        };

    let start = Instant::now();
    let total = targets.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, target) in targets.iter().enumerate() {
        let handle = prefetched[i].take();
        let outcome = driver.run_target(target, i + 1, total, handle).inspect_err(|e| {
            session.shell.error(format_args!(
                "{} failed for {}: {}",
                opts.cargo.command, target, e
            ));
        })?;
        outcomes.push(outcome);
    }

    let report = CrossReport {
        targets: outcomes,
        elapsed: start.elapsed(),
    };

    if !opts.print_env {
        session.shell.status(
            Status::Finished,
            format_args!(
                "{} for {} target{} in {}",
                opts.cargo.command,
                total,
                if total == 1 { "" } else { "s" },
                format_duration(report.elapsed)
            ),
        );
    }

    if let Some(path) = session.ambient.get("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        if let Err(e) = write_github_output(Path::new(path), &report.triples()) {
            session.shell.warn(format_args!("could not write GITHUB_OUTPUT: {e}"));
        }
    }

    Ok(report)
}

struct Driver<'a> {
    opts: &'a CrossOptions,
    session: &'a CrossSession<'a>,
    ctx: &'a ResolveContext<'a>,
    explicit_target: bool,
}

impl Driver<'_> {
    /// Toolchain for one target, honouring user overrides.
    fn resolve(&self, target: &TargetDescriptor) -> CrossResult<ToolchainHandle> {
        if !self.explicit_target {
            return Ok(ToolchainHandle::passthrough());
        }

        let overrides = select_overrides(
            target,
            &self.session.ambient,
            &self.opts.compilers,
            self.session.config.target_override(&target.triple),
        );
        resolve_toolchain(target, self.ctx, overrides.as_ref())
    }

    /// A runner the user already chose, from the environment or config.
    fn configured_runner(&self, target: &TargetDescriptor) -> Option<&str> {
        let key = format!("CARGO_TARGET_{}_RUNNER", target.env_upper());
        self.session
            .ambient
            .get(&key)
            .map(String::as_str)
            .filter(|r| !r.trim().is_empty())
            .or_else(|| {
                self.session
                    .config
                    .target_override(&target.triple)
                    .and_then(|o| o.runner.as_deref())
            })
    }

    fn run_target(
        &self,
        target: &TargetDescriptor,
        index: usize,
        total: usize,
        prefetched: Option<CrossResult<ToolchainHandle>>,
    ) -> CrossResult<TargetOutcome> {
        let opts = self.opts;
        let session = self.session;
        let toolchain = opts.cargo.toolchain.as_deref();
        let start = Instant::now();

        session.shell.status(
            Status::Resolving,
            format_args!("[{index}/{total}] {target}"),
        );

        let install = self.explicit_target && !opts.skip_target_install;
        let needs_build_std = if install {
            ensure_target_installed(&target.triple, toolchain, session.rustup, &session.shell)?
                .needs_build_std()
        } else {
            false
        };

        let handle = match prefetched {
            Some(result) => result?,
            None => self.resolve(target)?,
        };

        let wrapper = WrapperSelector::new(self.ctx)
            .configured(self.configured_runner(target))
            .select(opts.cargo.command, target, &handle);

        let environment = synthesize(&SynthesisInput {
            target,
            explicit_target: self.explicit_target,
            host: &session.host,
            handle: &handle,
            wrapper: &wrapper,
            cargo: &opts.cargo,
            options: &opts.env,
            needs_build_std,
            ambient: &session.ambient,
            cwd: &session.cwd,
        });
        tracing::debug!("{}: {}", target, environment.command_line());

        if install && effective_build_std(&opts.cargo, &opts.env, needs_build_std).is_some() {
            ensure_rust_src(&target.triple, toolchain, session.rustup, &session.shell)?;
        }

        if opts.print_env {
            print_environment(target, &environment);
        } else {
            if opts.clean_cache {
                session.shell.status(Status::Info, "cleaning build artifacts");
                session.executor.clean(&environment)?;
            }
            for line in environment.env_lines() {
                session.shell.verbose(line);
            }
            session.shell.status(
                Status::Building,
                format_args!("{target} ({})", opts.cargo.command),
            );
            session.shell.verbose(environment.command_line());
            session.executor.run(&target.triple, &environment)?;
            session.shell.status(
                Status::Finished,
                format_args!("{} {} in {}", opts.cargo.command, target, format_duration(start.elapsed())),
            );
        }

        Ok(TargetOutcome {
            triple: target.triple.clone(),
            wrapper: wrapper.kind,
            environment,
            elapsed: start.elapsed(),
        })
    }
}

fn print_environment(target: &TargetDescriptor, env: &BuildEnvironment) {
    println!("# {target}");
    for key in &env.removed_vars {
        println!("unset {key}");
    }
    for line in env.env_lines() {
        println!("{line}");
    }
    println!("{}", env.command_line());
    println!();
}

/// Append `targets=<json array>` for GitHub Actions.
pub fn write_github_output(path: &Path, triples: &[&str]) -> CrossResult<()> {
    let json = serde_json::to_string(triples)
        .map_err(|e| CrossError::InvalidArgument(format!("cannot encode targets: {e}")))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CrossError::io(format!("failed to open {}", path.display()), e))?;
    writeln!(file, "targets={json}")
        .map_err(|e| CrossError::io(format!("failed to write {}", path.display()), e))
}
