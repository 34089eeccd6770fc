//! # Profiles
//!
//! A profile is an optional feature flag (`stunnel-mtls`, `stunnel-https`,
//! `ddns-go`) that gates which artifacts must be fetched and which inputs
//! become mandatory.
//!
//! The requirements live in one declarative table, [`RULES`], evaluated once
//! up front by the orchestrator. Membership is an exact-token test on the
//! normalized list `,a,b,c,`, so `stunnel` never matches `stunnel-mtls`.

use std::fmt;

/// An input that a profile may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    StunnelCa,
    StunnelCert,
    StunnelKey,
    DdnsGoConfig,
}

impl Input {
    /// Environment variable carrying the source spec.
    pub fn env_name(self) -> &'static str {
        match self {
            Input::StunnelCa => "STUNNEL_CAFILE_SRC",
            Input::StunnelCert => "STUNNEL_CERT_SRC",
            Input::StunnelKey => "STUNNEL_KEY_SRC",
            Input::DdnsGoConfig => "DDNS_GO_CONFIG_SRC",
        }
    }
}

/// How a fetched artifact is checked and post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Must contain a PEM certificate.
    Certificate,
    /// Must contain a PEM private key; permissions are tightened.
    PrivateKey,
    /// Text with address placeholders substituted.
    Template,
}

/// One artifact a profile fetches.
#[derive(Debug)]
pub struct ArtifactRule {
    pub input: Input,
    /// Destination relative to the deployment directory.
    pub dest: &'static str,
    pub kind: ArtifactKind,
}

/// Requirements of a single profile.
#[derive(Debug)]
pub struct ProfileRule {
    pub profile: &'static str,
    pub artifacts: &'static [ArtifactRule],
    /// A profile that takes precedence when both are active.
    pub superseded_by: Option<&'static str>,
}

impl ProfileRule {
    pub fn required_inputs(&self) -> impl Iterator<Item = Input> + '_ {
        self.artifacts.iter().map(|artifact| artifact.input)
    }
}

pub const STUNNEL_MTLS: &str = "stunnel-mtls";
pub const STUNNEL_HTTPS: &str = "stunnel-https";
pub const DDNS_GO: &str = "ddns-go";

/// Profile token → required inputs + artifacts to fetch.
pub static RULES: &[ProfileRule] = &[
    ProfileRule {
        profile: STUNNEL_MTLS,
        artifacts: &[
            ArtifactRule {
                input: Input::StunnelCa,
                dest: "stunnel/ca.pem",
                kind: ArtifactKind::Certificate,
            },
            ArtifactRule {
                input: Input::StunnelCert,
                dest: "stunnel/cert.pem",
                kind: ArtifactKind::Certificate,
            },
            ArtifactRule {
                input: Input::StunnelKey,
                dest: "stunnel/key.pem",
                kind: ArtifactKind::PrivateKey,
            },
        ],
        superseded_by: None,
    },
    ProfileRule {
        profile: STUNNEL_HTTPS,
        artifacts: &[
            ArtifactRule {
                input: Input::StunnelCert,
                dest: "stunnel/cert.pem",
                kind: ArtifactKind::Certificate,
            },
            ArtifactRule {
                input: Input::StunnelKey,
                dest: "stunnel/key.pem",
                kind: ArtifactKind::PrivateKey,
            },
        ],
        superseded_by: Some(STUNNEL_MTLS),
    },
    ProfileRule {
        profile: DDNS_GO,
        artifacts: &[ArtifactRule {
            input: Input::DdnsGoConfig,
            dest: "ddns-go/config.yaml",
            kind: ArtifactKind::Template,
        }],
        superseded_by: None,
    },
];

/// Normalize a comma-separated list to `,a,b,c,`.
pub fn normalize(list: &str) -> String {
    let tokens: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    format!(",{},", tokens.join(","))
}

/// The set of active profile tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileSet {
    normalized: String,
}

impl ProfileSet {
    pub fn parse(list: &str) -> Self {
        Self {
            normalized: normalize(list),
        }
    }

    /// Exact-token membership.
    pub fn contains(&self, token: &str) -> bool {
        let token = token.trim();
        !token.is_empty() && self.normalized.contains(&format!(",{},", token))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.normalized.split(',').filter(|token| !token.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().next().is_none()
    }

    /// Rules that apply to this set, with superseded profiles dropped.
    pub fn active_rules(&self) -> Vec<&'static ProfileRule> {
        RULES
            .iter()
            .filter(|rule| self.contains(rule.profile))
            .filter(|rule| !rule.superseded_by.is_some_and(|winner| self.contains(winner)))
            .collect()
    }
}

impl fmt::Display for ProfileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.tokens().collect();
        if tokens.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&tokens.join(","))
        }
    }
}
