//! # hostprov
//!
//! Bootstraps a host: fetches configuration artifacts from plain HTTPS,
//! authenticated HTTPS and single-file sparse Git checkouts, materializes them
//! under a per-project directory, derives a `.env` file and drives the
//! compose tool to build and (re)launch the service stack. A companion
//! watcher signals a container to reload when its configuration file changes.
//!
//! ## Quick Example
//!
//! ```
//! use hostprov::source::SourceSpec;
//! use hostprov::profiles::ProfileSet;
//!
//! let spec = SourceSpec::parse("git@git.example.com:ops/stack.git#main:compose/prod.yml").unwrap();
//! assert!(spec.is_git());
//! assert_eq!(spec.file_name().unwrap(), "prod.yml");
//!
//! let profiles = ProfileSet::parse("stunnel-mtls, ddns-go");
//! assert!(profiles.contains("ddns-go"));
//! assert!(!profiles.contains("stunnel"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Source specs (`source`)**: one string describes where an artifact
//!   lives; a `#branch:path` suffix on a Git remote selects a single file.
//! - **Source Resolver (`resolver`, `http`, `git`)**: materializes a spec at a
//!   local path with retries, credential selection and non-empty checks.
//! - **Profiles (`profiles`)**: a declarative table of which inputs and
//!   artifacts each optional feature needs.
//! - **Provisioning Orchestrator (`orchestrator`)**: the linear stage machine
//!   from input validation to `up`, with container-name reconciliation.
//! - **Change Watcher (`watcher`)**: parent-directory watching with a
//!   debounced reload signal.

pub mod artifact;
pub mod compose;
pub mod config;
pub mod defaults;
pub mod envfile;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod http;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod profiles;
pub mod resolver;
pub mod source;
pub mod suggestions;
pub mod tools;
pub mod watcher;

pub use error::{Error, Result};
