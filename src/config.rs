//! # Deploy File
//!
//! An optional YAML file that records a host's deployment inputs so they do
//! not have to be repeated on every invocation:
//!
//! ```yaml
//! project_name: node35
//! profiles: [stunnel-mtls, ddns-go]
//! external_domain: turn.example.com
//! internal_domain: 10.0.0.5
//! sources:
//!   config: https://cfg.example.com/node35/app.yaml
//!   compose: git@git.example.com:ops/stack.git#main:docker-compose.yml
//!   stunnel_ca: https://pki.example.com/ca.pem
//! ```
//!
//! Every field is optional. Command-line flags and environment variables
//! override file values field by field. Unknown keys are rejected so a typo
//! does not silently drop an input.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source specs by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesSection {
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub compose: Option<String>,
    #[serde(default)]
    pub env_template: Option<String>,
    #[serde(default)]
    pub stunnel_ca: Option<String>,
    #[serde(default)]
    pub stunnel_cert: Option<String>,
    #[serde(default)]
    pub stunnel_key: Option<String>,
    #[serde(default)]
    pub ddns_go: Option<String>,
}

/// Profiles may be written as a YAML list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileList {
    List(Vec<String>),
    Joined(String),
}

impl ProfileList {
    /// Comma-joined form accepted by [`crate::profiles::ProfileSet::parse`].
    pub fn joined(&self) -> String {
        match self {
            ProfileList::List(items) => items.join(","),
            ProfileList::Joined(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployFile {
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub profiles: Option<ProfileList>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub external_domain: Option<String>,
    #[serde(default)]
    pub internal_domain: Option<String>,
    #[serde(default)]
    pub dependent_service: Option<String>,
    #[serde(default)]
    pub compose_command: Option<String>,
}

/// Parse a deploy file from YAML text. An empty document yields defaults.
pub fn parse(yaml_content: &str) -> Result<DeployFile> {
    if yaml_content.trim().is_empty() {
        return Ok(DeployFile::default());
    }
    serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some(
            "known keys: sources, profiles, project_name, external_domain, internal_domain, \
             dependent_service, compose_command"
                .to_string(),
        ),
    })
}

/// Parse a deploy file from a path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DeployFile> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// First value that is present and non-blank.
pub fn pick(overrides: Option<&str>, file: Option<&str>) -> Option<String> {
    [overrides, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
