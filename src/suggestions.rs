//! # Error Suggestions
//!
//! Helper functions for generating "hint:" text attached to errors. Errors
//! should tell the operator what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! return Err(Error::AuthRejected {
//!     url,
//!     message,
//!     hint: Some(suggestions::http_auth_hint(false)),
//! });
//! ```

use crate::source::GitTransport;

/// Hint for an HTTP 401/403.
pub fn http_auth_hint(sent_credentials: bool) -> String {
    if sent_credentials {
        "the supplied credentials were refused; check HOSTPROV_AUTH_HEADER / HOSTPROV_TOKEN \
         (the header takes precedence over the token)"
            .to_string()
    } else {
        "the source requires credentials; set HOSTPROV_TOKEN or HOSTPROV_AUTH_HEADER".to_string()
    }
}

/// Hint for a rejected Git fetch.
pub fn git_auth_hint(transport: GitTransport, sent_credentials: bool) -> String {
    match (transport, sent_credentials) {
        (GitTransport::Ssh, true) => {
            "the SSH key in HOSTPROV_SSH_KEY was refused; check it is a deploy key for this \
             repository"
                .to_string()
        }
        (GitTransport::Ssh, false) => {
            "no SSH key was given; load one into ssh-agent or set HOSTPROV_SSH_KEY".to_string()
        }
        (_, true) => "the supplied token or header was refused for this repository".to_string(),
        (_, false) => {
            "anonymous fetch was rejected (private repository?); set HOSTPROV_TOKEN or \
             HOSTPROV_AUTH_HEADER"
                .to_string()
        }
    }
}

/// Hint for a missing CLI input that also has an environment fallback.
pub fn missing_variable(flag: &str, env: &str) -> String {
    format!("pass --{} or set {}", flag, env)
}

/// Hint for profile-dependent inputs.
pub fn missing_profile_input(profile: &str) -> String {
    format!(
        "disable the '{}' profile or supply the listed sources",
        profile
    )
}

/// Hint for address placeholders required by a dependent service.
pub fn missing_addresses(service: &str) -> String {
    format!(
        "the manifest declares '{}', which needs both EXTERNAL_DOMAIN and INTERNAL_DOMAIN",
        service
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_auth_hint_mentions_env_vars() {
        assert!(http_auth_hint(false).contains("HOSTPROV_TOKEN"));
        assert!(http_auth_hint(true).contains("precedence"));
    }

    #[test]
    fn test_git_auth_hint_variants() {
        assert!(git_auth_hint(GitTransport::Ssh, false).contains("ssh-agent"));
        assert!(git_auth_hint(GitTransport::Ssh, true).contains("HOSTPROV_SSH_KEY"));
        assert!(git_auth_hint(GitTransport::Https, false).contains("private repository"));
        assert!(git_auth_hint(GitTransport::Https, true).contains("refused"));
    }

    #[test]
    fn test_missing_variable_hint() {
        assert_eq!(
            missing_variable("compose-src", "COMPOSE_SRC"),
            "pass --compose-src or set COMPOSE_SRC"
        );
    }
}
