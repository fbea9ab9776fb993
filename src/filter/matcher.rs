//! Match engine
//!
//! Pure decision logic over [`NormalizedResource`]. Knows nothing about how a
//! resource type is listed or how its response is shaped.

use super::{CreatedRange, FilterConfig, KindFilterEntry};
use crate::error::{ConfigError, CriteriaError};
use crate::resource::{NormalizedResource, Tags};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;

/// Criteria for one resource type with all patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledEntry {
    ids: Vec<Regex>,
    tags: Vec<(String, Regex)>,
    created: Option<CreatedRange>,
}

impl CompiledEntry {
    fn compile(kind: &str, entry: &KindFilterEntry) -> Result<Self, ConfigError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                kind: kind.to_string(),
                pattern: pattern.to_string(),
                source,
            })
        };

        let ids = entry
            .ids
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let tags = entry
            .tags
            .iter()
            .map(|(key, p)| compile(p).map(|re| (key.clone(), re)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ids,
            tags,
            created: entry.created,
        })
    }

    /// True if any id pattern matches
    pub fn matches_id(&self, id: &str) -> Result<bool, CriteriaError> {
        if self.ids.is_empty() {
            return Err(CriteriaError::NoIdCriteria);
        }

        Ok(self.ids.iter().any(|re| re.is_match(id)))
    }

    /// True if any configured tag key is present with a value matching its
    /// pattern. Keys compare exactly; only values are regexes.
    pub fn matches_tags(&self, tags: &Tags) -> Result<bool, CriteriaError> {
        if self.tags.is_empty() {
            return Err(CriteriaError::NoTagCriteria);
        }

        Ok(self.tags.iter().any(|(key, re)| {
            tags.get(key)
                .map(|value| re.is_match(value))
                .unwrap_or(false)
        }))
    }

    /// True if `created_at` lies strictly inside the configured window.
    /// Without a window every resource passes; with one, an unknown
    /// creation time never does.
    pub fn matches_created(&self, created_at: Option<DateTime<Utc>>) -> bool {
        let Some(range) = self.created else {
            return true;
        };

        let Some(created_at) = created_at else {
            return false;
        };

        let after = range.after.map(|t| created_at > t).unwrap_or(true);
        let before = range.before.map(|t| created_at < t).unwrap_or(true);

        after && before
    }

    /// Entry present with neither id nor tag criteria
    pub fn selects_all(&self) -> bool {
        self.ids.is_empty() && self.tags.is_empty()
    }
}

/// Validated filter, ready for matching
#[derive(Debug, Clone)]
pub struct Filter {
    config: FilterConfig,
    entries: BTreeMap<String, CompiledEntry>,
}

impl Filter {
    /// Compile every pattern in `config`
    pub fn new(config: FilterConfig) -> Result<Self, ConfigError> {
        let entries = config
            .entries()
            .map(|(kind, entry)| CompiledEntry::compile(kind, entry).map(|c| (kind.to_string(), c)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { config, entries })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn entry(&self, kind: &str) -> Option<&CompiledEntry> {
        self.entries.get(kind)
    }

    /// True if the filter names `kind` at all
    pub fn includes(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Decide whether `resource` is selected.
    ///
    /// Id and tag criteria are OR-ed: a resource matching either one is
    /// selected. An entry with neither selects every resource of its type.
    /// The creation window, when set, must hold in addition.
    pub fn matches(&self, resource: &NormalizedResource) -> bool {
        let Some(entry) = self.entries.get(&resource.kind) else {
            return false;
        };

        let by_id = entry.matches_id(&resource.id);
        // an untagged resource still reports whether tag criteria exist
        let by_tags = entry.matches_tags(&resource.tags);

        let selected = match (by_id, by_tags) {
            (Err(_), Err(_)) => true,
            (by_id, by_tags) => by_id.unwrap_or(false) || by_tags.unwrap_or(false),
        };

        selected && entry.matches_created(resource.created_at)
    }
}
