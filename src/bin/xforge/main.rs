//! xforge CLI - cross compile Rust projects for any target

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use xforge::core::{CrossError, HostPlatform, TargetRegistry};
use xforge::ops::{cross_build, CrossSession, ProcessExecutor, SystemRustup};
use xforge::sources::HttpFetcher;
use xforge::util::diagnostic;
use xforge::util::process::install_interrupt_handler;
use xforge::util::{GlobalContext, Shell};

mod cli;

use cli::{normalize_args, Cli};

fn main() {
    let color = io::stderr().is_terminal();
    if let Err(e) = run() {
        match e.downcast_ref::<CrossError>() {
            Some(err) => {
                diagnostic::emit(&err.to_diagnostic(), color);
                std::process::exit(err.exit_code());
            }
            None => {
                eprintln!("error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run() -> Result<()> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args())) {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                // Usage errors share the exit code of every other configuration error
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    let ambient: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    let verbose = cli.verbosity(&ambient);

    let filter = match std::env::var("XFORGE_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ if verbose > 0 => EnvFilter::new("xforge=debug"),
        _ => EnvFilter::new("xforge=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();

    if let Some(shell) = cli.generate_completions {
        let name = std::env::args()
            .next()
            .and_then(|argv0| {
                std::path::Path::new(&argv0)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "xforge".to_string());
        clap_complete::generate(shell, &mut Cli::command(), name, &mut io::stdout());
        return Ok(());
    }

    if cli.show_all_targets {
        for triple in TargetRegistry::global().triples() {
            println!("{triple}");
        }
        return Ok(());
    }

    let color = cli.color_choice()?;
    let shell = Arc::new(Shell::from_flags(cli.quiet, verbose > 0, color, cli.is_json()));

    if let Err(e) = install_interrupt_handler() {
        shell.warn(format!("could not install Ctrl-C handler: {e}"));
    }

    let ctx = GlobalContext::new()?;
    let opts = cli.cross_options(&ctx, &ambient);

    let proxy = cli
        .github_proxy_mirror
        .as_deref()
        .or(ctx.config().network.github_proxy.as_deref());
    let fetcher = HttpFetcher::new(Arc::clone(&shell))
        .with_github_proxy(proxy)?
        .offline(cli.offline || ctx.config().network.offline);

    let rustup = SystemRustup;
    let executor = ProcessExecutor;
    let session = CrossSession {
        host: HostPlatform::detect(),
        shell: Arc::clone(&shell),
        fetcher: &fetcher,
        rustup: &rustup,
        executor: &executor,
        config: ctx.config(),
        ambient,
        cwd: ctx.cwd().to_path_buf(),
    };

    tracing::debug!(
        targets = ?opts.targets,
        cache = %opts.cache_dir.display(),
        color = color.as_str(),
        "starting cross build"
    );
    cross_build(&opts, &session)?;
    Ok(())
}

