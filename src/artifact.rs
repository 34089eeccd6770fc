//! Structural checks and post-processing for fetched artifacts.
//!
//! Certificates must carry a PEM certificate block and keys a PEM private key
//! block (plain, typed such as `RSA`/`EC`/`OPENSSH`, or `ENCRYPTED`). A
//! mismatch is fatal. Keys are chmod'ed to `0600` right after they land; a
//! failed chmod is only logged.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::error::{Error, Result};
use crate::profiles::ArtifactKind;

/// Token replaced with the externally reachable address.
pub const EXTERNAL_PLACEHOLDER: &str = "__EXTERNAL_DOMAIN__";
/// Token replaced with the internally reachable address.
pub const INTERNAL_PLACEHOLDER: &str = "__INTERNAL_DOMAIN__";

fn certificate_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"-----BEGIN (?:TRUSTED |X509 )?CERTIFICATE-----")
            .expect("certificate pattern is valid")
    })
}

fn private_key_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"-----BEGIN (?:[A-Z0-9]+ )?PRIVATE KEY-----")
            .expect("private key pattern is valid")
    })
}

/// Check and post-process an artifact according to its kind.
pub fn finalize(kind: ArtifactKind, path: &Path, addresses: &Addresses) -> Result<()> {
    match kind {
        ArtifactKind::Certificate => validate_certificate(path),
        ArtifactKind::PrivateKey => {
            validate_private_key(path)?;
            restrict_permissions(path);
            Ok(())
        }
        ArtifactKind::Template => substitute_placeholders(path, addresses).map(|_| ()),
    }
}

pub fn validate_certificate(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).unwrap_or_default();
    if certificate_marker().is_match(&content) {
        Ok(())
    } else {
        Err(Error::InvalidArtifact {
            path: path.display().to_string(),
            expected: "a PEM certificate (-----BEGIN CERTIFICATE-----)".to_string(),
        })
    }
}

pub fn validate_private_key(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).unwrap_or_default();
    if private_key_marker().is_match(&content) {
        Ok(())
    } else {
        Err(Error::InvalidArtifact {
            path: path.display().to_string(),
            expected: "a PEM private key (-----BEGIN ... PRIVATE KEY-----)".to_string(),
        })
    }
}

/// Best-effort `chmod 600`.
pub fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            warn!("Could not restrict permissions on {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    debug!("Skipping permission change on {}", path.display());
}

/// External/internal reachable addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addresses {
    pub external: Option<String>,
    pub internal: Option<String>,
}

impl Addresses {
    pub fn new(external: Option<String>, internal: Option<String>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            external: non_empty(external),
            internal: non_empty(internal),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.external.is_some() && self.internal.is_some()
    }
}

/// Replace the placeholder tokens that have a value. Returns whether the file
/// changed.
pub fn substitute_placeholders(path: &Path, addresses: &Addresses) -> Result<bool> {
    let content = fs::read_to_string(path)?;
    let mut updated = content.clone();
    if let Some(external) = &addresses.external {
        updated = updated.replace(EXTERNAL_PLACEHOLDER, external);
    }
    if let Some(internal) = &addresses.internal {
        updated = updated.replace(INTERNAL_PLACEHOLDER, internal);
    }
    if updated == content {
        return Ok(false);
    }
    fs::write(path, updated)?;
    debug!("Substituted address placeholders in {}", path.display());
    Ok(true)
}
