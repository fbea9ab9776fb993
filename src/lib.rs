//! awsweep
//!
//! Finds AWS resources eligible for deletion. A YAML filter names resource
//! types by their Terraform type and selects resources by id pattern, tag
//! pattern and creation time. A data-driven registry knows how to list each
//! type and where its items live in the response, so one matching algorithm
//! covers every type.
//!
//! - [`aws`] - API binding consumed by the scanner
//! - [`resource`] - Registry, listing and normalization
//! - [`filter`] - Filter document, validation and matching
//! - [`scan`] - Concurrent scan over all filtered resource types

pub mod aws;
pub mod config;
pub mod error;
pub mod filter;
pub mod fs;
pub mod resource;
pub mod scan;

pub use error::{ConfigError, CriteriaError, RegistryError, ScanError};
pub use filter::{Filter, FilterConfig, KindFilterEntry};
pub use resource::{NormalizedResource, Registry, ResourceDef};
pub use scan::{ScanOptions, ScanReport, Scanner};
