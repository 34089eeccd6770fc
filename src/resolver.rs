//! # Source Resolver
//!
//! This module provides the `SourceResolver`, a single entry point that
//! retrieves any [`SourceSpec`] to a destination path, regardless of whether
//! it travels over plain HTTPS, authenticated HTTPS or a Git sparse fetch.
//!
//! ## Design
//!
//! As with repository management elsewhere, the resolver is built around
//! trait seams:
//!
//! - **`HttpOperations`**: direct downloads (see [`crate::http`]).
//! - **`GitOperations`**: single-file sparse fetches (see [`crate::git`]).
//! - **`Fetcher`**: what the orchestrator depends on. `SourceResolver` is the
//!   default implementation; tests substitute a fake.
//!
//! Whatever the transport, the resolver guarantees the result is a non-empty
//! file: a zero-byte download is removed and reported as a failure.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};

use crate::error::{Error, Result};
use crate::git::{GitAuth, GitCli, GitOperations};
use crate::http::{HttpOperations, ReqwestHttp};
use crate::source::SourceSpec;

/// A header sent verbatim with authenticated requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl AuthHeader {
    /// Parse a full header line (`Name: value`). A value without a header name
    /// is sent as `Authorization`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (name, value) = match raw.split_once(':') {
            Some((name, value))
                if !name.trim().is_empty() && !name.trim().contains(char::is_whitespace) =>
            {
                (name.trim().to_string(), value.trim().to_string())
            }
            _ => (AUTHORIZATION.as_str().to_string(), raw.to_string()),
        };

        let invalid = |message: &str| Error::InvalidInput {
            name: "HOSTPROV_AUTH_HEADER".to_string(),
            message: message.to_string(),
        };
        if value.is_empty() {
            return Err(invalid("header value is empty"));
        }
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid("invalid header name"))?;
        HeaderValue::from_str(&value).map_err(|_| invalid("invalid header value"))?;

        Ok(Self { name, value })
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(token: &str) -> Self {
        Self {
            name: AUTHORIZATION.as_str().to_string(),
            value: format!("Bearer {}", token.trim()),
        }
    }
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"***")
            .finish()
    }
}

/// Credential inputs shared by every fetch.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Convenience bearer token.
    pub token: Option<String>,
    /// Full override header; takes precedence over `token`.
    pub auth_header: Option<String>,
    /// Private key used for SSH Git remotes.
    pub ssh_key: Option<PathBuf>,
}

impl Credentials {
    /// The header to send with HTTP(S) requests, if any.
    pub fn header(&self) -> Result<Option<AuthHeader>> {
        if let Some(raw) = self.auth_header.as_deref().filter(|h| !h.trim().is_empty()) {
            return AuthHeader::parse(raw).map(Some);
        }
        Ok(self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(AuthHeader::bearer))
    }
}

/// A successfully retrieved, non-empty artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Anything that can materialize a source spec at a path.
pub trait Fetcher {
    fn fetch(&self, spec: &SourceSpec, dest: &Path) -> Result<FetchResult>;
}

/// The default [`Fetcher`], dispatching on the spec's transport.
pub struct SourceResolver {
    http_ops: Box<dyn HttpOperations>,
    git_ops: Box<dyn GitOperations>,
    credentials: Credentials,
}

impl SourceResolver {
    /// Creates a resolver backed by `reqwest` and the system `git`.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            http_ops: Box::new(ReqwestHttp::new()?),
            git_ops: Box::new(GitCli),
            credentials,
        })
    }

    /// Creates a resolver with custom transport implementations.
    pub fn with_operations(
        http_ops: Box<dyn HttpOperations>,
        git_ops: Box<dyn GitOperations>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http_ops,
            git_ops,
            credentials,
        }
    }

    /// Parse and fetch `spec` to `dest`.
    pub fn fetch_str(&self, spec: &str, dest: &Path) -> Result<FetchResult> {
        let spec = SourceSpec::parse(spec)?;
        self.fetch(&spec, dest)
    }

    /// Parse and fetch `spec` into `dir`, inferring the filename.
    pub fn fetch_into_dir(&self, spec: &str, dir: &Path) -> Result<FetchResult> {
        let spec = SourceSpec::parse(spec)?;
        let dest = dir.join(spec.file_name()?);
        self.fetch(&spec, &dest)
    }
}

impl Fetcher for SourceResolver {
    fn fetch(&self, spec: &SourceSpec, dest: &Path) -> Result<FetchResult> {
        let header = self.credentials.header()?;

        match spec {
            SourceSpec::Direct { url } => {
                self.http_ops.download(url, header.as_ref(), dest)?;
            }
            SourceSpec::GitSingleFile { repo, branch, path } => {
                let auth = GitAuth {
                    ssh_key: self.credentials.ssh_key.as_deref(),
                    header: header.as_ref(),
                };
                self.git_ops.fetch_file(repo, branch, path, &auth, dest)?;
            }
        }

        let result = ensure_non_empty(spec, dest)?;
        info!("Fetched {} -> {} ({} bytes)", spec, dest.display(), result.bytes);
        Ok(result)
    }
}

fn ensure_non_empty(spec: &SourceSpec, dest: &Path) -> Result<FetchResult> {
    let bytes = fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
    if bytes == 0 {
        let _ = fs::remove_file(dest);
        return Err(Error::EmptyDownload {
            url: spec.display_url(),
        });
    }
    Ok(FetchResult {
        path: dest.to_path_buf(),
        bytes,
    })
}
