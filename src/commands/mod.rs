//! # CLI Command Implementations
//!
//! One module per subcommand. Each holds a `clap` `Args` struct and an
//! `execute` function that wires the arguments into the `hostprov` library.
//! Credential flags are shared through [`CredentialArgs`].

use std::path::PathBuf;

use clap::Args;

use hostprov::resolver::Credentials;

pub mod completions;
pub mod deploy;
pub mod fetch;
pub mod run_script;
pub mod watch;

/// Credentials presented to remote sources.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Bearer token for HTTPS sources
    #[arg(long, value_name = "TOKEN", env = "HOSTPROV_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Raw header for HTTPS sources ("Name: value"); wins over --token
    #[arg(
        long,
        value_name = "HEADER",
        env = "HOSTPROV_AUTH_HEADER",
        hide_env_values = true
    )]
    pub auth_header: Option<String>,

    /// Private key for SSH Git remotes
    #[arg(long, value_name = "FILE", env = "HOSTPROV_SSH_KEY")]
    pub ssh_key: Option<PathBuf>,
}

impl CredentialArgs {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            token: self.token.clone(),
            auth_header: self.auth_header.clone(),
            ssh_key: self.ssh_key.clone(),
        }
    }
}
