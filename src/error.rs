//! # Error Handling
//!
//! This module defines the centralized error type for `hostprov`. It uses the
//! `thiserror` library to create an `Error` enum covering every failure mode
//! of the source resolver, the provisioning orchestrator and the change
//! watcher.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries enough context (URL,
//!   path, tool, compose stage) to tell the operator what failed, and most
//!   carry an optional `hint` about how to fix it.
//!
//! - **`ErrorClass`**: The coarse failure taxonomy (precondition, transport,
//!   validation, conflict, external tool). Every variant belongs to exactly
//!   one class.
//!
//! - **`Error::exit_code`**: Maps a variant to the stable process exit code
//!   documented in [`crate::exit_codes`].
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! URLs stored in errors are always redacted before they are stored, so
//! printing an error never leaks `user:pass@` credentials.

use std::fmt;

use thiserror::Error;

use crate::exit_codes;

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// The compose stage that an external tool failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeStage {
    Validate,
    Build,
    Up,
}

impl fmt::Display for ComposeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComposeStage::Validate => "config",
            ComposeStage::Build => "build",
            ComposeStage::Up => "up",
        };
        f.write_str(name)
    }
}

/// Coarse failure taxonomy shared by all variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required variable, tool or profile input is absent.
    Precondition,
    /// A fetch failed, timed out or returned an empty body.
    Transport,
    /// A retrieved artifact or the manifest failed a structural check.
    Validation,
    /// Existing state collides with desired state and was not resolved.
    Conflict,
    /// The orchestrated build/start tool reported failure.
    ExternalTool,
    /// Anything else (I/O, configuration file parsing).
    Other,
}

/// Main error type for hostprov operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required variable was not supplied.
    #[error("Missing required variable: {name}{}", hint_suffix(hint))]
    MissingVariable { name: String, hint: Option<String> },

    /// A supplied value is present but unusable.
    #[error("Invalid value for {name}: {message}")]
    InvalidInput { name: String, message: String },

    /// A required executable is not on `PATH`.
    #[error("Required tool not found: {tool} - {message}")]
    MissingTool { tool: String, message: String },

    /// An active profile needs inputs that were not supplied.
    #[error("Profile '{profile}' requires {}{}", missing.join(", "), hint_suffix(hint))]
    MissingProfileInput {
        profile: String,
        missing: Vec<String>,
        hint: Option<String>,
    },

    /// A source spec could not be classified.
    #[error("Invalid source '{spec}': {message}")]
    InvalidSource { spec: String, message: String },

    /// A download failed at the transport or HTTP level.
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    /// A download succeeded but produced zero bytes.
    #[error("Download produced an empty file: {url}")]
    EmptyDownload { url: String },

    /// The remote refused the credentials (or their absence).
    #[error("Authentication rejected by {url}: {message}{}", hint_suffix(hint))]
    AuthRejected {
        url: String,
        message: String,
        hint: Option<String>,
    },

    /// A git command failed.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// The requested path is absent or empty at the requested ref.
    #[error("File '{path}' not found (or empty) in {url}@{branch}")]
    MissingRepoFile {
        url: String,
        branch: String,
        path: String,
    },

    /// A fetched artifact does not have the expected shape.
    #[error("Invalid artifact {path}: expected {expected}")]
    InvalidArtifact { path: String, expected: String },

    /// The external compose tool reported a failure.
    #[error("docker compose {stage} failed: {message}")]
    Compose { stage: ComposeStage, message: String },

    /// The container runtime could not list or remove containers.
    #[error("docker {action} failed: {message}")]
    Runtime { action: String, message: String },

    /// The operator declined removing conflicting containers.
    #[error("Aborted: conflicting containers were not removed: {}", containers.join(", "))]
    Declined { containers: Vec<String> },

    /// The change watcher could not be started.
    #[error("Watcher error: {message}")]
    Watch { message: String },

    /// The deploy file could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint_suffix(hint))]
    ConfigParse {
        message: String,
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A filesystem notification error, wrapped from `notify::Error`.
    #[error("Filesystem notification error: {0}")]
    Notify(#[from] notify::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// The failure class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MissingVariable { .. }
            | Error::InvalidInput { .. }
            | Error::MissingTool { .. }
            | Error::MissingProfileInput { .. }
            | Error::InvalidSource { .. } => ErrorClass::Precondition,
            Error::Download { .. }
            | Error::EmptyDownload { .. }
            | Error::AuthRejected { .. }
            | Error::GitCommand { .. }
            | Error::MissingRepoFile { .. }
            | Error::Http(_) => ErrorClass::Transport,
            Error::InvalidArtifact { .. } => ErrorClass::Validation,
            Error::Compose {
                stage: ComposeStage::Validate,
                ..
            } => ErrorClass::Validation,
            Error::Compose { .. } | Error::Runtime { .. } => ErrorClass::ExternalTool,
            Error::Declined { .. } => ErrorClass::Conflict,
            Error::Watch { .. }
            | Error::ConfigParse { .. }
            | Error::Io(_)
            | Error::Yaml(_)
            | Error::Notify(_)
            | Error::UrlParse(_) => ErrorClass::Other,
        }
    }

    /// The stable process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingVariable { .. } | Error::InvalidInput { .. } => {
                exit_codes::MISSING_VARIABLE
            }
            Error::MissingTool { .. } => exit_codes::MISSING_TOOL,
            Error::MissingProfileInput { .. } => exit_codes::MISSING_PROFILE_INPUT,
            Error::InvalidSource { .. } => exit_codes::INVALID_SOURCE,
            Error::Download { .. }
            | Error::EmptyDownload { .. }
            | Error::GitCommand { .. }
            | Error::Http(_) => exit_codes::DOWNLOAD_FAILED,
            Error::AuthRejected { .. } => exit_codes::AUTH_REJECTED,
            Error::MissingRepoFile { .. } => exit_codes::MISSING_REPO_FILE,
            Error::InvalidArtifact { .. } => exit_codes::INVALID_ARTIFACT,
            Error::Compose { stage, .. } => match stage {
                ComposeStage::Validate => exit_codes::MANIFEST_INVALID,
                ComposeStage::Build => exit_codes::BUILD_FAILED,
                ComposeStage::Up => exit_codes::START_FAILED,
            },
            Error::Runtime { .. } => exit_codes::RUNTIME_FAILED,
            Error::Declined { .. } => exit_codes::DECLINED,
            Error::Watch { .. } | Error::Notify(_) => exit_codes::WATCH_FAILED,
            Error::ConfigParse { .. } | Error::Io(_) | Error::Yaml(_) | Error::UrlParse(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
