//! AWS client abstraction

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// A remote API that answers `service:operation` calls with JSON
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Perform a single API call
    async fn invoke(&self, service: &str, operation: &str, params: &Value) -> Result<Value>;
}

/// Account id of the credentials behind `api`
pub async fn account_id(api: &dyn CloudApi) -> Result<String> {
    let identity = api
        .invoke("sts", "GetCallerIdentity", &json!({}))
        .await
        .context("Failed to get caller identity")?;

    identity
        .get("Account")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .context("Caller identity has no Account field")
}
