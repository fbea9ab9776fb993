//! Configuration Management
//!
//! Handles persistent settings for awsweep. Command line flags win over the
//! settings file, which wins over built-in defaults.

use crate::scan::ScanOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Filter document used when neither flag nor settings name one
pub const DEFAULT_FILTER_FILE: &str = "filter.yml";

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Filter document path
    #[serde(default)]
    pub filter: Option<PathBuf>,
    /// Directory of recorded API responses
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awsweep").join("config.json"))
    }

    /// Load settings from disk
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parse settings, falling back to defaults on malformed content
    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed settings: {}", e);
            Self::default()
        })
    }

    /// Get effective filter path (CLI > settings > default)
    pub fn effective_filter(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.filter.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILTER_FILE))
    }

    /// Get effective fixture directory (CLI > settings)
    pub fn effective_fixtures(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.fixtures.clone())
    }

    /// Get effective scan limits (CLI > settings > default)
    pub fn effective_scan_options(
        &self,
        concurrency: Option<usize>,
        timeout_secs: Option<u64>,
        max_attempts: Option<u32>,
    ) -> ScanOptions {
        let defaults = ScanOptions::default();

        ScanOptions::new()
            .with_concurrency(
                concurrency
                    .or(self.concurrency)
                    .unwrap_or(defaults.concurrency),
            )
            .with_timeout(
                timeout_secs
                    .or(self.timeout_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
            )
            .with_max_attempts(
                max_attempts
                    .or(self.max_attempts)
                    .unwrap_or(defaults.max_attempts),
            )
    }
}
