//! Resource filter
//!
//! The filter is an operator-authored YAML document selecting resources per
//! resource type:
//!
//! ```yaml
//! aws_instance:
//!   Tags:
//!     Name: ^ci-
//! aws_iam_role:
//!   Ids: ["^test-"]
//!   Created:
//!     After: 2024-01-01T00:00:00Z
//! aws_security_group: {}   # select every security group
//! ```
//!
//! - [`FilterConfig`] - the document as written
//! - [`Filter`] - the validated document with every pattern compiled
//! - [`validate`] - checks resource types against the registry

mod matcher;
mod validate;

pub use matcher::{CompiledEntry, Filter};
pub use validate::validate;

use crate::error::ConfigError;
use crate::fs::FileSource;
use crate::resource::Registry;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Creation-time window, both bounds exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatedRange {
    #[serde(rename = "After", default)]
    pub after: Option<DateTime<Utc>>,
    #[serde(rename = "Before", default)]
    pub before: Option<DateTime<Utc>>,
}

/// Selection criteria for one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindFilterEntry {
    /// Regexes matched against the resource id
    #[serde(rename = "Ids", default)]
    pub ids: Vec<String>,
    /// Tag key (exact) to value regex
    #[serde(rename = "Tags", default)]
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "Created", default)]
    pub created: Option<CreatedRange>,
}

/// Filter document: resource type to its criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    entries: BTreeMap<String, KindFilterEntry>,
}

impl FilterConfig {
    /// Parse a filter document. Unknown fields are rejected.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        // `aws_vpc:` with nothing under it parses as null and means "everything"
        let raw: BTreeMap<String, Option<KindFilterEntry>> = serde_yaml::from_str(content)?;
        let entries = raw
            .into_iter()
            .map(|(kind, entry)| (kind, entry.unwrap_or_default()))
            .collect();

        Ok(Self { entries })
    }

    /// Read and parse a filter document through `fs`
    pub fn read(fs: &dyn FileSource, path: &Path) -> Result<Self, ConfigError> {
        let content = fs.read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resource types named in the document, sorted
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, kind: &str) -> Option<&KindFilterEntry> {
        self.entries.get(kind)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &KindFilterEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, kind: impl Into<String>, entry: KindFilterEntry) {
        self.entries.insert(kind.into(), entry);
    }

    pub fn with_entry(mut self, kind: impl Into<String>, entry: KindFilterEntry) -> Self {
        self.insert(kind, entry);
        self
    }
}

impl KindFilterEntry {
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_created(mut self, created: CreatedRange) -> Self {
        self.created = Some(created);
        self
    }
}

/// Read, validate and compile the filter document at `path`.
///
/// Every failure here is operator misconfiguration and happens before any
/// resource is listed.
pub fn load(fs: &dyn FileSource, path: &Path, registry: &Registry) -> Result<Filter, ConfigError> {
    let config = FilterConfig::read(fs, path)?;
    validate(&config, registry)?;
    let filter = Filter::new(config)?;

    tracing::info!(
        "Loaded filter {:?} with {} resource type(s)",
        path,
        filter.config().len()
    );

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;
    use chrono::TimeZone;

    #[test]
    fn test_parse_filter_document() {
        let yaml = r#"
aws_iam_role:
  Ids: ["^foo.*"]
aws_security_group:
aws_instance:
  Tags:
    foo: bar
    bla: blub
aws_vpc:
  Ids:
    - "^foo.*"
  Tags:
    foo: bar
  Created:
    After: 2020-01-01T00:00:00Z
"#;
        let config = FilterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.len(), 4);
        assert_eq!(
            config.kinds().collect::<Vec<_>>(),
            vec!["aws_iam_role", "aws_instance", "aws_security_group", "aws_vpc"]
        );
        assert_eq!(config.entry("aws_iam_role").unwrap().ids, vec!["^foo.*"]);
        assert_eq!(
            config.entry("aws_security_group"),
            Some(&KindFilterEntry::default())
        );
        assert_eq!(config.entry("aws_instance").unwrap().tags.len(), 2);

        let created = config.entry("aws_vpc").unwrap().created.unwrap();
        assert_eq!(
            created.after,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(created.before, None);
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let yaml = "aws_vpc:\n  Id: \"^foo\"\n";
        assert!(FilterConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_empty_document() {
        let config = FilterConfig::from_yaml("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let err = FilterConfig::read(&MemFs::new(), Path::new("filter.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_read_malformed_file() {
        let fs = MemFs::new().with_file("filter.yml", "aws_vpc: [unclosed");
        let err = FilterConfig::read(&fs, Path::new("filter.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_validates_and_compiles() {
        let registry = Registry::load().unwrap();

        let fs = MemFs::new()
            .with_file("ok.yml", "aws_vpc:\n  Ids: [\"^vpc-\"]\n")
            .with_file("unsupported.yml", "aws_vpc: {}\nnot_supported_type: {}\n")
            .with_file("bad_regex.yml", "aws_vpc:\n  Ids: [\"(unclosed\"]\n");

        let filter = load(&fs, Path::new("ok.yml"), &registry).unwrap();
        assert!(filter.entry("aws_vpc").is_some());

        let err = load(&fs, Path::new("unsupported.yml"), &registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedKind { .. }));

        let err = load(&fs, Path::new("bad_regex.yml"), &registry).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
