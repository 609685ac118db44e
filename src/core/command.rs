//! Cargo subcommands xforge can drive.

use std::fmt;
use std::str::FromStr;

/// The cargo subcommand run for each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CargoCommand {
    #[default]
    Build,
    Check,
    Run,
    Test,
    Bench,
}

impl CargoCommand {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CargoCommand::Build => "build",
            CargoCommand::Check => "check",
            CargoCommand::Run => "run",
            CargoCommand::Test => "test",
            CargoCommand::Bench => "bench",
        }
    }

    /// Whether the produced binaries are executed on the host.
    pub const fn executes_binaries(&self) -> bool {
        matches!(
            self,
            CargoCommand::Run | CargoCommand::Test | CargoCommand::Bench
        )
    }
}

impl fmt::Display for CargoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CargoCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" | "b" => Ok(CargoCommand::Build),
            "check" | "c" => Ok(CargoCommand::Check),
            "run" | "r" => Ok(CargoCommand::Run),
            "test" | "t" => Ok(CargoCommand::Test),
            "bench" => Ok(CargoCommand::Bench),
            _ => Err(format!(
                "invalid command '{}'; expected 'build', 'check', 'run', 'test' or 'bench'",
                s
            )),
        }
    }
}
