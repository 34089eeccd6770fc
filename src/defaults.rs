//! Default values for hostprov configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// Attempts per direct download (first try included).
pub const FETCH_ATTEMPTS: u32 = 3;

/// Fixed delay between download attempts.
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Per-request timeout for direct downloads.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Compose invocation used for validate/build/up.
pub const COMPOSE_COMMAND: &str = "docker compose";

/// Service whose presence makes the address placeholders mandatory.
pub const DEPENDENT_SERVICE: &str = "coturn";

/// Window absorbing bursts of change events.
pub const DEBOUNCE_MS: u64 = 500;

/// Container-management endpoint used by the watcher.
pub const CONTROL_ENDPOINT: &str = "http://127.0.0.1:2375";

/// Signal delivered on configuration change.
pub const RELOAD_SIGNAL: &str = "SIGHUP";

/// Returns the default root for deployment working directories.
///
/// Uses the platform-appropriate data directory:
/// - Linux: `~/.local/share/hostprov` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/hostprov`
/// - Windows: `{FOLDERID_RoamingAppData}\hostprov`
///
/// Falls back to `.hostprov` in the current directory if the platform data
/// directory cannot be determined.
///
/// This can be overridden by the `--deploy-dir` CLI flag or the `DEPLOY_DIR`
/// environment variable.
pub fn default_deploy_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hostprov"))
        .unwrap_or_else(|| PathBuf::from(".hostprov"))
}
