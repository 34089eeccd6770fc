//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// hostprov - fetch host configuration and (re)launch its service stack
#[derive(Parser, Debug)]
#[command(name = "hostprov")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch one artifact from a source spec
    Fetch(commands::fetch::FetchArgs),

    /// Provision the host: fetch artifacts, build and start the stack
    Deploy(commands::deploy::DeployArgs),

    /// Watch a file and signal a container to reload when it changes
    Watch(commands::watch::WatchArgs),

    /// Fetch a shell script and run it with the given arguments
    RunScript(commands::run_script::RunScriptArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code on success.
    pub fn execute(self) -> Result<u8> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Fetch(args) => commands::fetch::execute(args, &self.color).map(|_| 0),
            Commands::Deploy(args) => commands::deploy::execute(args, &self.color).map(|_| 0),
            Commands::Watch(args) => commands::watch::execute(args, &self.color).map(|_| 0),
            Commands::RunScript(args) => commands::run_script::execute(args),
            Commands::Completions(args) => commands::completions::execute(args).map(|_| 0),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
