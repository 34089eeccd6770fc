//! Direct HTTP(S) downloads.
//!
//! The default implementation uses a blocking `reqwest` client. Transport
//! errors and HTTP 5xx responses are retried a bounded number of times with a
//! fixed delay; everything else fails fast. The body is staged in a sibling
//! temporary file and renamed onto the destination, so a failed download
//! never leaves a partial artifact behind.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::defaults;
use crate::error::{Error, Result};
use crate::resolver::AuthHeader;
use crate::source::redact_url;
use crate::suggestions;

/// Trait for HTTP downloads - allows mocking in tests
pub trait HttpOperations: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    fn download(&self, url: &str, header: Option<&AuthHeader>, dest: &Path) -> Result<u64>;
}

/// Retry policy for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: defaults::FETCH_ATTEMPTS,
            delay: defaults::FETCH_RETRY_DELAY,
        }
    }
}

/// Blocking `reqwest` implementation of [`HttpOperations`].
pub struct ReqwestHttp {
    client: Client,
    retry: RetryPolicy,
}

impl ReqwestHttp {
    pub fn new() -> Result<Self> {
        Self::with_retry(RetryPolicy::default())
    }

    pub fn with_retry(retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(defaults::FETCH_TIMEOUT)
            .user_agent(concat!("hostprov/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, retry })
    }

    fn get_once(&self, url: &str, header: Option<&AuthHeader>) -> Attempt {
        let mut request = self.client.get(url);
        if let Some(header) = header {
            request = request.header(header.name.as_str(), header.value.as_str());
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.without_url().to_string()),
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Attempt::Fatal(Error::AuthRejected {
                url: redact_url(url),
                message: format!("HTTP {}", status),
                hint: Some(suggestions::http_auth_hint(header.is_some())),
            });
        }
        if status.is_server_error() {
            return Attempt::Retry(format!("HTTP {}", status));
        }
        if !status.is_success() {
            return Attempt::Fatal(Error::Download {
                url: redact_url(url),
                message: format!("HTTP {}", status),
            });
        }

        match response.bytes() {
            Ok(body) => Attempt::Done(body.to_vec()),
            Err(e) => Attempt::Retry(e.without_url().to_string()),
        }
    }
}

enum Attempt {
    Done(Vec<u8>),
    Retry(String),
    Fatal(Error),
}

impl HttpOperations for ReqwestHttp {
    fn download(&self, url: &str, header: Option<&AuthHeader>, dest: &Path) -> Result<u64> {
        let shown = redact_url(url);
        info!("Downloading {}", shown);

        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.get_once(url, header) {
                Attempt::Done(body) => {
                    if body.is_empty() {
                        return Err(Error::EmptyDownload { url: shown });
                    }
                    write_atomically(dest, &body)?;
                    debug!("Wrote {} bytes to {}", body.len(), dest.display());
                    return Ok(body.len() as u64);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retry(message) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, attempts, shown, message
                    );
                    last_error = message;
                    if attempt < attempts {
                        thread::sleep(self.retry.delay);
                    }
                }
            }
        }

        Err(Error::Download {
            url: shown,
            message: format!("{} (after {} attempts)", last_error, attempts),
        })
    }
}

/// Mode of a freshly downloaded artifact. Keys are tightened afterwards.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

fn write_atomically(dest: &Path, body: &[u8]) -> Result<()> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(body)?;
    staged.flush()?;
    // Staged files are created 0600; match what a git checkout copy gets.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(ARTIFACT_MODE))?;
    }
    staged.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
