//! Resource Registry - Load resource descriptors from JSON
//!
//! Every supported resource type is described by data in the embedded
//! `resources/*.json` files: which API call lists it, where the items sit in
//! the response, which field identifies an item for deletion, and how its tags
//! are represented. The registry keeps the table order so scans and reports
//! are reproducible.

use super::selector::SelectorKind;
use crate::error::RegistryError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/compute.json"),
    include_str!("../resources/network.json"),
    include_str!("../resources/iam.json"),
    include_str!("../resources/storage.json"),
];

/// Placeholder in listing parameters replaced by [`Registry::bind`]
pub const ACCOUNT_ID_PLACEHOLDER: &str = "${account_id}";

/// How a resource type carries its tags in the listing response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum TagConvention {
    /// No tag data at list time
    #[default]
    None,
    /// `[{"Key": "k", "Value": "v"}, ...]`
    KeyValueList {
        field: String,
        #[serde(default = "default_key_field")]
        key_field: String,
        #[serde(default = "default_value_field")]
        value_field: String,
    },
    /// `{"k": "v", ...}`
    Map { field: String },
}

fn default_key_field() -> String {
    "Key".to_string()
}

fn default_value_field() -> String {
    "Value".to_string()
}

/// Continuation token handling for paginated listing calls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    /// Request parameter carrying the token
    pub input_token: String,
    /// Response field carrying the next token
    pub output_token: String,
}

/// Resource descriptor from JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceDef {
    /// Terraform resource type, e.g. `aws_instance`
    pub kind: String,
    pub service: String,
    pub operation: String,
    #[serde(default)]
    pub params: Value,
    /// Field names leading from the response root to the item list
    pub response_path: Vec<String>,
    /// Item field used as the resource id
    pub deletion_key: String,
    #[serde(default)]
    pub tags: TagConvention,
    #[serde(default)]
    pub created_field: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub selector: SelectorKind,
}

impl ResourceDef {
    /// Listing parameters as a JSON object
    pub fn request_params(&self) -> Value {
        if self.params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            self.params.clone()
        }
    }

    /// True if the listing parameters still contain the account placeholder
    pub fn needs_account_id(&self) -> bool {
        contains_placeholder(&self.params)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Deserialize)]
struct ResourceFile {
    resources: Vec<ResourceDef>,
}

/// Table of every supported resource type
#[derive(Debug, Clone)]
pub struct Registry {
    resources: Vec<ResourceDef>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build the registry from the embedded definitions
    pub fn load() -> Result<Self, RegistryError> {
        let mut resources = Vec::new();
        for content in RESOURCE_FILES {
            let file: ResourceFile = serde_json::from_str(content).map_err(RegistryError::Parse)?;
            resources.extend(file.resources);
        }

        Self::from_defs(resources)
    }

    /// Build a registry from explicit definitions, rejecting duplicate kinds
    pub fn from_defs(resources: Vec<ResourceDef>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(resources.len());
        for (i, def) in resources.iter().enumerate() {
            if index.insert(def.kind.clone(), i).is_some() {
                return Err(RegistryError::DuplicateKind(def.kind.clone()));
            }
        }

        Ok(Self { resources, index })
    }

    /// Replace the account id placeholder in every listing parameter set
    pub fn bind(mut self, account_id: &str) -> Self {
        for def in &mut self.resources {
            substitute_placeholder(&mut def.params, account_id);
        }
        self
    }

    /// True if any of `kinds` is listed with account-scoped parameters
    pub fn needs_account_id<'a>(&self, kinds: impl IntoIterator<Item = &'a str>) -> bool {
        kinds
            .into_iter()
            .filter_map(|kind| self.lookup(kind).ok())
            .any(ResourceDef::needs_account_id)
    }

    /// All descriptors in table order
    pub fn list_all_kinds(&self) -> &[ResourceDef] {
        &self.resources
    }

    /// Get a descriptor by resource type
    pub fn lookup(&self, kind: &str) -> Result<&ResourceDef, RegistryError> {
        self.index
            .get(kind)
            .map(|&i| &self.resources[i])
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.index.contains_key(kind)
    }

    /// All resource types in table order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|d| d.kind.as_str())
    }
}

fn contains_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(ACCOUNT_ID_PLACEHOLDER),
        Value::Array(items) => items.iter().any(contains_placeholder),
        Value::Object(map) => map.values().any(contains_placeholder),
        _ => false,
    }
}

fn substitute_placeholder(value: &mut Value, account_id: &str) {
    match value {
        Value::String(s) if s.contains(ACCOUNT_ID_PLACEHOLDER) => {
            *s = s.replace(ACCOUNT_ID_PLACEHOLDER, account_id);
        }
        Value::Array(items) => {
            for item in items {
                substitute_placeholder(item, account_id);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_placeholder(item, account_id);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = Registry::load().unwrap();
        assert!(
            !registry.list_all_kinds().is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_kinds_are_unique_and_lookup_round_trips() {
        let registry = Registry::load().unwrap();

        let mut seen = HashSet::new();
        for def in registry.list_all_kinds() {
            assert!(seen.insert(def.kind.clone()), "duplicate kind {}", def.kind);
            assert_eq!(registry.lookup(&def.kind).unwrap(), def);
        }
    }

    #[test]
    fn test_order_is_stable() {
        let first: Vec<String> = Registry::load().unwrap().kinds().map(String::from).collect();
        let second: Vec<String> = Registry::load().unwrap().kinds().map(String::from).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_instance_descriptor() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_instance").unwrap();

        assert_eq!(def.service, "ec2");
        assert_eq!(def.operation, "DescribeInstances");
        assert_eq!(def.response_path, vec!["Reservations", "Instances"]);
        assert_eq!(def.deletion_key, "InstanceId");
        assert!(matches!(def.tags, TagConvention::KeyValueList { .. }));
    }

    #[test]
    fn test_lookup_unknown_kind() {
        let registry = Registry::load().unwrap();
        assert!(matches!(
            registry.lookup("not_supported_type"),
            Err(RegistryError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let def: ResourceDef = serde_json::from_value(json!({
            "kind": "aws_vpc",
            "service": "ec2",
            "operation": "DescribeVpcs",
            "response_path": ["Vpcs"],
            "deletion_key": "VpcId"
        }))
        .unwrap();

        let result = Registry::from_defs(vec![def.clone(), def]);
        assert!(matches!(result, Err(RegistryError::DuplicateKind(k)) if k == "aws_vpc"));
    }

    #[test]
    fn test_bind_substitutes_account_id() {
        let registry = Registry::load().unwrap();
        assert!(registry.needs_account_id(["aws_ami"]));
        assert!(!registry.needs_account_id(["aws_vpc"]));

        let registry = registry.bind("123456789012");
        let def = registry.lookup("aws_ebs_snapshot").unwrap();
        assert!(!def.needs_account_id());
        assert_eq!(
            def.params["Filters"][0]["Values"][0],
            json!("123456789012")
        );
    }

    #[test]
    fn test_request_params_defaults_to_object() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_vpc").unwrap();
        assert!(def.request_params().is_object());
    }
}
