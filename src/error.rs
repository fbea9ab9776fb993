//! Error types
//!
//! Configuration errors are fatal and stop the process before scanning starts.
//! Scan errors are scoped to a single resource kind and collected into the
//! scan report so the remaining kinds still get processed.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the filter document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read filter config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse filter config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported resource type(s) found in filter config: {}", kinds.join(", "))]
    UnsupportedKind { kinds: Vec<String> },

    #[error("invalid pattern `{pattern}` for {kind}")]
    InvalidPattern {
        kind: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Signals that a predicate had nothing to evaluate.
///
/// These are not failures: the combine policy uses them to tell
/// "no criteria configured" apart from "criteria did not match".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("no id criteria configured")]
    NoIdCriteria,
    #[error("no tag criteria configured")]
    NoTagCriteria,
}

/// Errors from the resource descriptor registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown resource type: {0}")]
    UnknownKind(String),

    #[error("resource type {0} is defined more than once")]
    DuplicateKind(String),

    #[error("failed to parse embedded resource definitions")]
    Parse(#[source] serde_json::Error),
}

/// Per-kind failures during a scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// The descriptor's response path does not fit the live response shape
    #[error("{kind}: response path {path:?} does not resolve at `{segment}`")]
    PathResolution {
        kind: String,
        path: Vec<String>,
        segment: String,
    },

    #[error("{kind}: listed item has no usable `{field}` field")]
    MissingField { kind: String, field: String },

    #[error("{kind}: listing timed out after {attempts} attempt(s)")]
    Timeout { kind: String, attempts: u32 },

    #[error("{kind}: API call failed")]
    Api {
        kind: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ScanError {
    /// Resource kind the error belongs to
    pub fn kind(&self) -> &str {
        match self {
            ScanError::PathResolution { kind, .. }
            | ScanError::MissingField { kind, .. }
            | ScanError::Timeout { kind, .. }
            | ScanError::Api { kind, .. } => kind,
        }
    }

    /// True when the registry and the live API disagree on response shape
    pub fn is_registry_defect(&self) -> bool {
        matches!(
            self,
            ScanError::PathResolution { .. } | ScanError::MissingField { .. }
        )
    }
}
