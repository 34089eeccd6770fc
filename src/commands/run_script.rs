//! # Run-Script Command Implementation
//!
//! Fetches a shell script through the Source Resolver and runs it as
//! `sh <script> ARGS...`. The script lives in a scratch directory that is
//! removed on every exit path; its exit status becomes ours.

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};
use std::process::Command;

use hostprov::resolver::{Fetcher, SourceResolver};
use hostprov::source::SourceSpec;

use super::CredentialArgs;

/// Fetch a shell script and run it with the given arguments
#[derive(Args, Debug)]
pub struct RunScriptArgs {
    /// URL or `repo#branch:path` spec of the script
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Arguments passed to the script
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Execute the `run-script` command, returning the script's exit status.
pub fn execute(args: RunScriptArgs) -> Result<u8> {
    let spec = SourceSpec::parse(&args.source)?;
    let scratch = tempfile::Builder::new()
        .prefix("hostprov-script-")
        .tempdir()
        .context("failed to create scratch directory")?;
    let script = scratch.path().join(spec.file_name()?);

    let resolver = SourceResolver::new(args.credentials.credentials())?;
    resolver.fetch(&spec, &script)?;
    make_executable(&script)?;

    info!("Running {} with {} argument(s)", spec, args.args.len());
    let status = Command::new("sh")
        .arg(&script)
        .args(&args.args)
        .status()
        .context("failed to run sh")?;
    debug!("Script finished with {}", status);

    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1))
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .with_context(|| format!("failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
