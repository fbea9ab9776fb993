//! Canned API responses
//!
//! [`StaticApi`] answers calls from responses registered up front. A response
//! can be restricted to calls whose parameters contain given values, which is
//! how paginated listings and per-item tag lookups are replayed. The most
//! specific matching response wins.
//!
//! Recorded responses can be loaded from a directory of
//! `<service>.<Operation>.json` files, which lets the binary run against a
//! captured account without credentials.

use super::client::CloudApi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Delayed(Duration, Value),
    Error(String),
}

#[derive(Debug, Clone)]
struct Canned {
    service: String,
    operation: String,
    when: Map<String, Value>,
    reply: Reply,
}

impl Canned {
    fn accepts(&self, service: &str, operation: &str, params: &Value) -> bool {
        self.service == service
            && self.operation == operation
            && self
                .when
                .iter()
                .all(|(key, expected)| params.get(key) == Some(expected))
    }
}

/// A call received by [`StaticApi`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub operation: String,
    pub params: Value,
}

/// In-memory [`CloudApi`]
#[derive(Debug, Clone, Default)]
pub struct StaticApi {
    responses: Vec<Canned>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl StaticApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `service:operation` call with `response`
    pub fn respond(self, service: &str, operation: &str, response: Value) -> Self {
        self.push(service, operation, Value::Null, Reply::Json(response))
    }

    /// Answer calls whose parameters contain every field of `when`
    pub fn respond_when(self, service: &str, operation: &str, when: Value, response: Value) -> Self {
        self.push(service, operation, when, Reply::Json(response))
    }

    /// Answer after `delay`
    pub fn respond_after(
        self,
        service: &str,
        operation: &str,
        delay: Duration,
        response: Value,
    ) -> Self {
        self.push(service, operation, Value::Null, Reply::Delayed(delay, response))
    }

    /// Fail every `service:operation` call
    pub fn fail(self, service: &str, operation: &str, message: &str) -> Self {
        self.push(
            service,
            operation,
            Value::Null,
            Reply::Error(message.to_string()),
        )
    }

    fn push(mut self, service: &str, operation: &str, when: Value, reply: Reply) -> Self {
        let when = match when {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        self.responses.push(Canned {
            service: service.to_string(),
            operation: operation.to_string(),
            when,
            reply,
        });
        self
    }

    /// Load recorded `<service>.<Operation>.json` responses from `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut api = Self::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read fixture directory {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((service, operation)) = stem.split_once('.') else {
                tracing::warn!("Skipping fixture with unexpected name: {:?}", path);
                continue;
            };

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read fixture {:?}", path))?;
            let response: Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse fixture {:?}", path))?;

            tracing::debug!("Loaded fixture {}:{}", service, operation);
            api = api.respond(service, operation, response);
        }

        Ok(api)
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls received for `service:operation`
    pub fn call_count(&self, service: &str, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.service == service && c.operation == operation)
            .count()
    }

    fn record(&self, service: &str, operation: &str, params: &Value) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                service: service.to_string(),
                operation: operation.to_string(),
                params: params.clone(),
            });
        }
    }
}

#[async_trait]
impl CloudApi for StaticApi {
    async fn invoke(&self, service: &str, operation: &str, params: &Value) -> Result<Value> {
        tracing::debug!("invoke: service={}, operation={}", service, operation);
        self.record(service, operation, params);

        // most specific wins, first registered breaks ties
        let canned = self
            .responses
            .iter()
            .filter(|c| c.accepts(service, operation, params))
            .fold(None::<&Canned>, |best, c| match best {
                Some(b) if b.when.len() >= c.when.len() => Some(b),
                _ => Some(c),
            });

        let Some(canned) = canned else {
            return Err(anyhow::anyhow!(
                "No response registered for {}:{}",
                service,
                operation
            ));
        };

        match &canned.reply {
            Reply::Json(value) => Ok(value.clone()),
            Reply::Delayed(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            Reply::Error(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_most_specific_response_wins() {
        let api = StaticApi::new()
            .respond("ec2", "DescribeVpcs", json!({"page": 1}))
            .respond_when(
                "ec2",
                "DescribeVpcs",
                json!({"NextToken": "t2"}),
                json!({"page": 2}),
            );

        let first = api.invoke("ec2", "DescribeVpcs", &json!({})).await.unwrap();
        let second = api
            .invoke("ec2", "DescribeVpcs", &json!({"NextToken": "t2"}))
            .await
            .unwrap();

        assert_eq!(first["page"], 1);
        assert_eq!(second["page"], 2);
        assert_eq!(api.call_count("ec2", "DescribeVpcs"), 2);
    }

    #[tokio::test]
    async fn test_unregistered_call_fails() {
        let api = StaticApi::new();
        assert!(api.invoke("s3", "ListBuckets", &json!({})).await.is_err());
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_returns_error() {
        let api = StaticApi::new().fail("iam", "ListRoles", "AccessDenied");
        let err = api.invoke("iam", "ListRoles", &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "AccessDenied");
    }

    #[tokio::test]
    async fn test_from_dir() {
        let dir = std::env::temp_dir().join(format!("awsweep-fixtures-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("s3.ListBuckets.json"), r#"{"Buckets": [{"Name": "b"}]}"#)
            .unwrap();
        std::fs::write(dir.join("README.txt"), "not a fixture").unwrap();

        let api = StaticApi::from_dir(&dir).unwrap();
        let response = api.invoke("s3", "ListBuckets", &json!({})).await.unwrap();
        assert_eq!(response["Buckets"][0]["Name"], "b");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
