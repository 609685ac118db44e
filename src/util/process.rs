//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use crate::core::errors::{CrossError, CrossResult};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_remove: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (k, v) in vars {
            self.env.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn env_remove(mut self, key: impl AsRef<str>) -> Self {
        self.env_remove.push(key.as_ref().to_string());
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for key in &self.env_remove {
            cmd.env_remove(key);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> CrossError {
        CrossError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    /// Run to completion, capturing stdout and stderr.
    pub fn exec(&self) -> CrossResult<Output> {
        self.build_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))
    }

    /// Run with inherited stdio.
    pub fn status(&self) -> CrossResult<ExitStatus> {
        self.build_command()
            .status()
            .map_err(|e| self.spawn_error(e))
    }

    /// Run with inherited stdio, killing the child if xforge is interrupted.
    ///
    /// Only one tracked child runs at a time; the interrupt handler installed
    /// by [`install_interrupt_handler`] kills it.
    pub fn status_tracked(&self) -> CrossResult<ExitStatus> {
        if was_interrupted() {
            return Err(interruption());
        }

        let child = self
            .build_command()
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        set_running(Some(child));

        loop {
            let polled = {
                let mut guard = RUNNING.lock().unwrap_or_else(|e| e.into_inner());
                match guard.as_mut() {
                    Some(child) => child.try_wait(),
                    None => return Err(interruption()),
                }
            };
            match polled {
                Ok(Some(status)) => {
                    set_running(None);
                    if was_interrupted() {
                        return Err(interruption());
                    }
                    return Ok(status);
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                Err(e) => {
                    set_running(None);
                    return Err(self.spawn_error(e));
                }
            }
        }
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

static RUNNING: LazyLock<Mutex<Option<Child>>> = LazyLock::new(|| Mutex::new(None));
static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static TERMINATED: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

fn set_running(child: Option<Child>) {
    let mut guard = RUNNING.lock().unwrap_or_else(|e| e.into_inner());
    *guard = child;
}

/// Install a Ctrl-C / SIGTERM handler that kills the tracked child process.
pub fn install_interrupt_handler() -> CrossResult<()> {
    ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
        let mut guard = RUNNING.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    })
    .map_err(|e| CrossError::InvalidArgument(format!("failed to set signal handler: {e}")))?;

    // registered after ctrlc so it chains to ctrlc's handler
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&TERMINATED))
        .map_err(|e| CrossError::InvalidArgument(format!("failed to set signal handler: {e}")))?;
    Ok(())
}

pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// The error for the signal that stopped the build.
pub fn interruption() -> CrossError {
    interruption_from(TERMINATED.load(Ordering::SeqCst))
}

fn interruption_from(terminated: bool) -> CrossError {
    if terminated {
        CrossError::Terminated
    } else {
        CrossError::Interrupted
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Run a program and return its trimmed stdout if it exits successfully.
pub fn capture_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = ProcessBuilder::new(program).args(args).exec().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
