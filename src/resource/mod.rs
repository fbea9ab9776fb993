//! Resource abstraction layer
//!
//! This module turns differently shaped AWS listing responses into one
//! uniform record, [`NormalizedResource`], that the filter can match on.
//!
//! # Architecture
//!
//! - [`registry`] - Loads resource descriptors from embedded JSON
//! - [`fetcher`] - Calls the listing operation with pagination, timeouts and retries
//! - [`normalize`] - Walks the response path and projects items into records
//! - [`selector`] - Per-type projection variants (secondary tag lookups, id derivation)
//!
//! # Example
//!
//! ```ignore
//! use awsweep::resource::{list_matching, Registry};
//!
//! async fn list_vpcs(api: &dyn CloudApi, filter: &Filter) -> Result<Vec<NormalizedResource>, ScanError> {
//!     let registry = Registry::load()?;
//!     let def = registry.lookup("aws_vpc")?;
//!     list_matching(api, def, filter, &ScanOptions::default()).await
//! }
//! ```

pub mod fetcher;
pub mod normalize;
pub mod registry;
pub mod selector;

pub use fetcher::{fetch_pages, list_matching, ApiCaller};
pub use registry::{Pagination, Registry, ResourceDef, TagConvention};
pub use selector::SelectorKind;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Tag key to tag value
pub type Tags = BTreeMap<String, String>;

/// A listed resource in the uniform shape the filter works on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResource {
    /// Terraform resource type
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub tags: Tags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Remaining fields of the listed item
    pub attributes: Map<String, Value>,
}

impl NormalizedResource {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            tags: Tags::new(),
            created_at: None,
            attributes: Map::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }
}
