use anyhow::Result;
use clap::Parser;
use jeka_runner_core::Verbosity;

use crate::commands::run_command;

/// Runs KBean methods on the project of the current directory.
///
/// Arguments are interpreted by the engine, not by clap: `-option[=value]`,
/// `-Dkey=value`, `@dependency`, `bean:` scopes, `field=value` assignments
/// and method names.
#[derive(Parser, Debug)]
#[command(name = "jeka")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Override the log filter")]
pub struct Jeka {
    /// Options, KBean actions and dependencies, in any order
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<String>,
}

impl Jeka {
    /// Execute the command line
    pub fn execute(self) -> Result<()> {
        run_command(&self.args)
    }

    /// Verbosity requested by `-v`/`-vv`, read before the full parse so that
    /// parsing itself can log.
    pub fn verbosity(&self) -> Verbosity {
        if self.has_flag(&["-vv", "-debug"]) {
            Verbosity::Debug
        } else if self.has_flag(&["-v", "-verbose"]) {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// True when failures must be reported with their whole context chain.
    pub fn wants_stacktrace(&self) -> bool {
        self.has_flag(&["-st", "-stacktrace", "-vv", "-debug"])
    }

    fn has_flag(&self, names: &[&str]) -> bool {
        self.args.iter().any(|arg| names.contains(&arg.as_str()))
    }
}
