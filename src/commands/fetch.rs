//! # Fetch Command Implementation
//!
//! Runs the Source Resolver once: `hostprov fetch <SOURCE>` materializes an
//! artifact from a plain or authenticated HTTPS URL, or a single file from a
//! Git remote (`repo.git#branch:path`).
//!
//! With `--dest` the file lands exactly there; otherwise the filename is
//! inferred from the spec and the file is written into `--output-dir`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use hostprov::output::{OutputConfig, Status};
use hostprov::resolver::{Fetcher, SourceResolver};
use hostprov::source::SourceSpec;

use super::CredentialArgs;

/// Fetch one artifact from a source spec
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// URL or `repo#branch:path` spec
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Exact destination path
    #[arg(long, value_name = "PATH", conflicts_with = "output_dir")]
    pub dest: Option<PathBuf>,

    /// Directory for the inferred filename
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Execute the `fetch` command.
pub fn execute(args: FetchArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let spec = SourceSpec::parse(&args.source)?;
    let dest = match &args.dest {
        Some(dest) => dest.clone(),
        None => args.output_dir.join(spec.file_name()?),
    };

    let resolver = SourceResolver::new(args.credentials.credentials())?;
    let result = resolver.fetch(&spec, &dest)?;

    println!(
        "{}",
        out.status(
            Status::Ok,
            &format!("Fetched {} ({} bytes)", result.path.display(), result.bytes)
        )
    );
    Ok(())
}
