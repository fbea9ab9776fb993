//! Scanner
//!
//! Runs the listing and selection of every resource type named in the filter.
//! Types are processed concurrently up to a fixed limit and are independent of
//! each other: a failure in one type is recorded and the rest carry on.

use crate::aws::CloudApi;
use crate::error::ScanError;
use crate::filter::Filter;
use crate::resource::{list_matching, NormalizedResource, Registry, ResourceDef};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// Limits applied while scanning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Resource types listed at the same time
    pub concurrency: usize,
    /// Bound on a single API call
    pub timeout: Duration,
    /// Attempts per API call when it times out
    pub max_attempts: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Outcome of a scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Selected resources, grouped by type in registry order
    pub matches: Vec<NormalizedResource>,
    /// Types that could not be listed
    pub failures: Vec<ScanError>,
    /// Types that were listed successfully
    pub scanned: Vec<String>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Matches of one resource type
    pub fn matches_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a NormalizedResource> {
        self.matches.iter().filter(move |r| r.kind == kind)
    }
}

/// Scans an account for resources selected by a filter
pub struct Scanner {
    api: Arc<dyn CloudApi>,
    registry: Arc<Registry>,
    filter: Arc<Filter>,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(
        api: Arc<dyn CloudApi>,
        registry: Arc<Registry>,
        filter: Arc<Filter>,
        options: ScanOptions,
    ) -> Self {
        Self {
            api,
            registry,
            filter,
            options,
        }
    }

    /// Descriptors of the types the filter names, in registry order.
    /// Types absent from the filter can never match and are not listed.
    pub fn kinds_to_scan(&self) -> Vec<&ResourceDef> {
        self.registry
            .list_all_kinds()
            .iter()
            .filter(|def| self.filter.includes(&def.kind))
            .collect()
    }

    pub async fn run(&self) -> ScanReport {
        let defs = self.kinds_to_scan();
        tracing::info!(
            "Scanning {} resource type(s) with concurrency {}",
            defs.len(),
            self.options.concurrency
        );

        let results: Vec<(&ResourceDef, Result<Vec<NormalizedResource>, ScanError>)> =
            stream::iter(defs)
                .map(|def| async move {
                    let result =
                        list_matching(self.api.as_ref(), def, &self.filter, &self.options).await;
                    (def, result)
                })
                .buffered(self.options.concurrency.max(1))
                .collect()
                .await;

        let mut report = ScanReport::default();
        for (def, result) in results {
            match result {
                Ok(matches) => {
                    tracing::info!("{}: {} match(es)", def.kind, matches.len());
                    report.scanned.push(def.kind.clone());
                    report.matches.extend(matches);
                }
                Err(err) => {
                    if err.is_registry_defect() {
                        tracing::error!("Registry does not fit the API response: {}", err);
                    } else {
                        tracing::warn!("Skipping {}: {}", def.kind, err);
                    }
                    report.failures.push(err);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::StaticApi;
    use crate::filter::{FilterConfig, KindFilterEntry};
    use serde_json::json;

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_attempts, 3);
    }

    #[test]
    fn test_builder_pattern() {
        let options = ScanOptions::new()
            .with_concurrency(8)
            .with_timeout(Duration::from_secs(5))
            .with_max_attempts(1);

        assert_eq!(options.concurrency, 8);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.max_attempts, 1);
    }

    #[test]
    fn test_kinds_to_scan_follow_registry_order() {
        let registry = Arc::new(Registry::load().unwrap());
        let config = FilterConfig::default()
            .with_entry("aws_vpc", KindFilterEntry::default())
            .with_entry("aws_instance", KindFilterEntry::default());
        let scanner = Scanner::new(
            Arc::new(StaticApi::new()),
            registry.clone(),
            Arc::new(Filter::new(config).unwrap()),
            ScanOptions::default(),
        );

        let kinds: Vec<&str> = scanner.kinds_to_scan().iter().map(|d| d.kind.as_str()).collect();
        let expected: Vec<&str> = registry
            .kinds()
            .filter(|k| *k == "aws_vpc" || *k == "aws_instance")
            .collect();
        assert_eq!(kinds, expected);
    }

    #[tokio::test]
    async fn test_run_isolates_failures() {
        let api = StaticApi::new()
            .respond("ec2", "DescribeVpcs", json!({"Vpcs": [{"VpcId": "vpc-1"}]}))
            .fail("ec2", "DescribeSubnets", "Throttling");
        let config = FilterConfig::default()
            .with_entry("aws_vpc", KindFilterEntry::default())
            .with_entry("aws_subnet", KindFilterEntry::default());
        let scanner = Scanner::new(
            Arc::new(api),
            Arc::new(Registry::load().unwrap()),
            Arc::new(Filter::new(config).unwrap()),
            ScanOptions::default(),
        );

        let report = scanner.run().await;

        assert!(!report.is_complete());
        assert_eq!(report.scanned, vec!["aws_vpc".to_string()]);
        assert_eq!(report.matches_of("aws_vpc").count(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind(), "aws_subnet");
    }
}
