//! # Watch Command Implementation
//!
//! Runs the Change Watcher until Ctrl+C: a change to `--file` (including an
//! atomic replace) sends `--signal` to `--container` through the control
//! endpoint, at most once per debounce window.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hostprov::defaults;
use hostprov::output::{OutputConfig, Status};
use hostprov::watcher::{self, HttpSignalSender, WatchTarget};

/// Watch a file and signal a container to reload when it changes
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// File to watch
    #[arg(long, value_name = "PATH", env = "WATCH_FILE")]
    pub file: PathBuf,

    /// Container to signal
    #[arg(long, value_name = "ID", env = "WATCH_CONTAINER")]
    pub container: String,

    /// Container-management API base URL
    #[arg(long, value_name = "URL", env = "CONTROL_ENDPOINT", default_value = defaults::CONTROL_ENDPOINT)]
    pub endpoint: String,

    /// Signal to deliver
    #[arg(long, value_name = "NAME", default_value = defaults::RELOAD_SIGNAL)]
    pub signal: String,

    /// Debounce window in milliseconds
    #[arg(long, value_name = "MS", default_value_t = defaults::DEBOUNCE_MS)]
    pub debounce_ms: u64,
}

/// Execute the `watch` command.
pub fn execute(args: WatchArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let target = WatchTarget::new(&args.file, &args.container)?;
    let sender = HttpSignalSender::new(&args.endpoint, &args.signal)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl+C handler")?;

    println!(
        "{}",
        out.status(
            Status::Watch,
            &format!(
                "Watching {}; {} goes to {} (Ctrl+C to stop)",
                target.file.display(),
                args.signal,
                target.container
            )
        )
    );

    let attempts = watcher::watch(
        &target,
        &sender,
        Duration::from_millis(args.debounce_ms),
        running,
    )?;
    println!(
        "{}",
        out.status(Status::Ok, &format!("Stopped after {} signal(s)", attempts))
    );
    Ok(())
}
