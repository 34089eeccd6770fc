//! # Compose Manifest Analysis
//!
//! Reads just enough of a compose manifest to reconcile local state: the
//! service names under `services:` and their `container_name:` values.
//!
//! The manifest is parsed with `serde_yaml`. When it does not parse (for
//! example an unquoted `${VAR}` in a flow mapping that only the compose tool
//! understands), a line scanner over `container_name:` declarations and
//! service keys is used instead, so conflict detection still works; the
//! compose `config` stage reports the real syntax problem later.

use std::path::Path;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde_yaml::Value;

use crate::error::Result;

/// Container names declared in a manifest, deduplicated, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerNameSet {
    names: Vec<String>,
}

impl ContainerNameSet {
    fn insert(&mut self, name: &str) {
        let name = clean_scalar(name);
        if !name.is_empty() && !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Declared names that already exist, by exact match.
    pub fn conflicts<S: AsRef<str>>(&self, existing: &[S]) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| existing.iter().any(|e| e.as_ref() == name.as_str()))
            .cloned()
            .collect()
    }
}

/// The parts of a compose manifest the orchestrator cares about.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    services: Vec<String>,
    container_names: ContainerNameSet,
}

impl Manifest {
    pub fn parse(content: &str) -> Self {
        match serde_yaml::from_str::<Value>(content) {
            Ok(doc) => Self::from_document(&doc),
            Err(e) => {
                debug!("Manifest is not plain YAML ({}); scanning lines", e);
                Self::scan_lines(content)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    fn from_document(doc: &Value) -> Self {
        let mut manifest = Manifest::default();
        let Some(services) = doc.get("services").and_then(Value::as_mapping) else {
            return manifest;
        };
        for (name, body) in services {
            if let Some(name) = name.as_str() {
                manifest.services.push(name.to_string());
            }
            if let Some(container) = body.get("container_name").and_then(Value::as_str) {
                manifest.container_names.insert(container);
            }
        }
        manifest
    }

    fn scan_lines(content: &str) -> Self {
        static SERVICE_KEY: OnceLock<Regex> = OnceLock::new();
        let service_key = SERVICE_KEY.get_or_init(|| {
            Regex::new(r"^(\s+)([A-Za-z0-9][A-Za-z0-9._-]*):\s*(#.*)?$")
                .expect("service key pattern is valid")
        });

        let mut manifest = Manifest::default();
        let mut in_services = false;
        let mut service_indent: Option<usize> = None;

        for line in content.lines() {
            let trimmed = line.trim_start();
            if let Some(value) = trimmed.strip_prefix("container_name:") {
                manifest.container_names.insert(value);
                continue;
            }
            if !line.starts_with(char::is_whitespace) && !trimmed.is_empty() {
                in_services = trimmed.starts_with("services:");
                service_indent = None;
                continue;
            }
            if !in_services {
                continue;
            }
            if let Some(caps) = service_key.captures(line) {
                let indent = caps[1].len();
                if service_indent.map_or(true, |expected| expected == indent) {
                    service_indent = Some(indent);
                    manifest.services.push(caps[2].to_string());
                }
            }
        }
        manifest
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn container_names(&self) -> &ContainerNameSet {
        &self.container_names
    }

    /// Whether a service or container with this name is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.services.iter().any(|s| s == name) || self.container_names.contains(name)
    }
}

/// Strip whitespace, a trailing comment and surrounding quotes.
fn clean_scalar(raw: &str) -> &str {
    let value = raw.trim();
    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let inner = &value[1..];
        return match inner.find(quote) {
            Some(end) => inner[..end].trim(),
            None => inner.trim(),
        };
    }
    match value.split_once(" #") {
        Some((before, _)) => before.trim(),
        None => value,
    }
}
