//! Resource Fetcher
//!
//! Lists resources of one type through the [`CloudApi`], following
//! continuation tokens, and hands the pages to the type's selector.

use super::registry::ResourceDef;
use super::NormalizedResource;
use crate::aws::CloudApi;
use crate::error::ScanError;
use crate::filter::Filter;
use crate::scan::ScanOptions;
use serde_json::Value;
use std::time::Duration;

/// Makes API calls on behalf of one resource type.
///
/// Each call is bounded by a timeout. Timeouts are retried up to the attempt
/// budget; API errors are not.
pub struct ApiCaller<'a> {
    api: &'a dyn CloudApi,
    kind: &'a str,
    timeout: Duration,
    max_attempts: u32,
}

impl<'a> ApiCaller<'a> {
    pub fn new(api: &'a dyn CloudApi, kind: &'a str, options: &ScanOptions) -> Self {
        Self {
            api,
            kind,
            timeout: options.timeout,
            max_attempts: options.max_attempts.max(1),
        }
    }

    pub fn kind(&self) -> &str {
        self.kind
    }

    pub async fn call(&self, service: &str, operation: &str, params: &Value) -> Result<Value, ScanError> {
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, self.api.invoke(service, operation, params)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(source)) => {
                    return Err(ScanError::Api {
                        kind: self.kind.to_string(),
                        source,
                    })
                }
                Err(_) => {
                    tracing::warn!(
                        "{}: {}:{} timed out (attempt {}/{})",
                        self.kind,
                        service,
                        operation,
                        attempt,
                        self.max_attempts
                    );
                }
            }
        }

        Err(ScanError::Timeout {
            kind: self.kind.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Fetch every page of the listing for `def`, in order
pub async fn fetch_pages(caller: &ApiCaller<'_>, def: &ResourceDef) -> Result<Vec<Value>, ScanError> {
    let mut pages = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut params = def.request_params();

        if let (Some(pagination), Some(token), Value::Object(map)) =
            (&def.pagination, &page_token, &mut params)
        {
            map.insert(pagination.input_token.clone(), Value::String(token.clone()));
        }

        let response = caller.call(&def.service, &def.operation, &params).await?;

        let next_token = def.pagination.as_ref().and_then(|p| {
            response
                .get(&p.output_token)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        });
        pages.push(response);

        match next_token {
            // a repeated token would loop forever
            Some(token) if page_token.as_deref() != Some(token.as_str()) => {
                page_token = Some(token);
            }
            _ => break,
        }
    }

    tracing::debug!("{}: fetched {} page(s)", def.kind, pages.len());
    Ok(pages)
}

/// List resources of `def.kind` and keep those selected by `filter`
pub async fn list_matching(
    api: &dyn CloudApi,
    def: &ResourceDef,
    filter: &Filter,
    options: &ScanOptions,
) -> Result<Vec<NormalizedResource>, ScanError> {
    let caller = ApiCaller::new(api, &def.kind, options);
    let pages = fetch_pages(&caller, def).await?;
    def.selector.select(&caller, def, &pages, filter).await
}
