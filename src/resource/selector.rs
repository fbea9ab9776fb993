//! Resource selectors
//!
//! A selector turns the listing pages of one resource type into the resources
//! the filter selects. Most types use [`SelectorKind::Generic`]. The others
//! need a second call per item to learn its tags, or derive the id, but they
//! all finish with the same [`Filter::matches`] decision.

use super::fetcher::ApiCaller;
use super::normalize::{parse_timestamp, project, resolve_path, tags_from_list};
use super::registry::ResourceDef;
use super::NormalizedResource;
use crate::error::ScanError;
use crate::filter::Filter;
use serde::Deserialize;
use serde_json::{json, Value};

const ROUTE53_ZONE_PREFIX: &str = "/hostedzone/";

/// Projection variant of a resource type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Everything the listing response has is enough
    #[default]
    Generic,
    /// Tags via `iam:ListUserTags`
    IamUser,
    /// Tags via `iam:ListPolicyTags`
    IamPolicy,
    /// AWS managed and pending-deletion keys skipped; tags via `kms:ListResourceTags`
    KmsKey,
    /// Tags via `efs:DescribeTags`
    EfsFileSystem,
    /// Id without the `/hostedzone/` prefix; tags via `route53:ListTagsForResource`
    Route53Zone,
}

impl SelectorKind {
    /// Normalize every item in `pages` and keep the ones `filter` selects.
    /// Items keep the order of the response.
    pub async fn select(
        self,
        caller: &ApiCaller<'_>,
        def: &ResourceDef,
        pages: &[Value],
        filter: &Filter,
    ) -> Result<Vec<NormalizedResource>, ScanError> {
        let mut selected = Vec::new();

        for page in pages {
            for item in resolve_path(def, page)? {
                let resource = project(def, item)?;
                let Some(resource) = self.complete(caller, resource).await? else {
                    continue;
                };

                if filter.matches(&resource) {
                    selected.push(resource);
                }
            }
        }

        Ok(selected)
    }

    /// Fill in what the listing did not provide. `None` drops the item.
    async fn complete(
        self,
        caller: &ApiCaller<'_>,
        mut resource: NormalizedResource,
    ) -> Result<Option<NormalizedResource>, ScanError> {
        match self {
            SelectorKind::Generic => {}
            SelectorKind::IamUser => {
                let response = caller
                    .call("iam", "ListUserTags", &json!({ "UserName": resource.id }))
                    .await?;
                resource.tags = tags_from_list(response.get("Tags"), "Key", "Value");
            }
            SelectorKind::IamPolicy => {
                let response = caller
                    .call("iam", "ListPolicyTags", &json!({ "PolicyArn": resource.id }))
                    .await?;
                resource.tags = tags_from_list(response.get("Tags"), "Key", "Value");
            }
            SelectorKind::KmsKey => {
                let response = caller
                    .call("kms", "DescribeKey", &json!({ "KeyId": resource.id }))
                    .await?;
                let metadata = response.get("KeyMetadata").ok_or_else(|| ScanError::MissingField {
                    kind: caller.kind().to_string(),
                    field: "KeyMetadata".to_string(),
                })?;

                let field = |name: &str| metadata.get(name).and_then(|v| v.as_str());
                if field("KeyManager") == Some("AWS") || field("KeyState") == Some("PendingDeletion") {
                    tracing::debug!("{}: skipping key {}", caller.kind(), resource.id);
                    return Ok(None);
                }
                resource.created_at = metadata.get("CreationDate").and_then(parse_timestamp);

                let response = caller
                    .call("kms", "ListResourceTags", &json!({ "KeyId": resource.id }))
                    .await?;
                resource.tags = tags_from_list(response.get("Tags"), "TagKey", "TagValue");
            }
            SelectorKind::EfsFileSystem => {
                let response = caller
                    .call("efs", "DescribeTags", &json!({ "FileSystemId": resource.id }))
                    .await?;
                resource.tags = tags_from_list(response.get("Tags"), "Key", "Value");
            }
            SelectorKind::Route53Zone => {
                if let Some(id) = resource.id.strip_prefix(ROUTE53_ZONE_PREFIX) {
                    resource.id = id.to_string();
                }
                let response = caller
                    .call(
                        "route53",
                        "ListTagsForResource",
                        &json!({ "ResourceType": "hostedzone", "ResourceId": resource.id }),
                    )
                    .await?;
                resource.tags = tags_from_list(
                    response.get("ResourceTagSet").and_then(|s| s.get("Tags")),
                    "Key",
                    "Value",
                );
            }
        }

        Ok(Some(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::StaticApi;
    use crate::filter::{FilterConfig, KindFilterEntry};
    use crate::resource::Registry;
    use crate::scan::ScanOptions;

    fn filter(kind: &str, entry: KindFilterEntry) -> Filter {
        Filter::new(FilterConfig::default().with_entry(kind, entry)).unwrap()
    }

    #[tokio::test]
    async fn test_generic_selects_in_response_order() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_security_group").unwrap();
        let api = StaticApi::new();
        let caller = ApiCaller::new(&api, &def.kind, &ScanOptions::default());
        let pages = vec![json!({
            "SecurityGroups": [
                {"GroupId": "sg-3", "Tags": [{"Key": "env", "Value": "ci"}]},
                {"GroupId": "sg-1", "Tags": [{"Key": "env", "Value": "prod"}]},
                {"GroupId": "sg-2", "Tags": [{"Key": "env", "Value": "ci"}]}
            ]
        })];

        let f = filter(&def.kind, KindFilterEntry::default().with_tag("env", "^ci$"));
        let selected = def.selector.select(&caller, def, &pages, &f).await.unwrap();

        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["sg-3", "sg-2"]);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_iam_user_fetches_tags() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_iam_user").unwrap();
        let api = StaticApi::new()
            .respond_when(
                "iam",
                "ListUserTags",
                json!({"UserName": "alice"}),
                json!({"Tags": [{"Key": "temporary", "Value": "yes"}]}),
            )
            .respond_when(
                "iam",
                "ListUserTags",
                json!({"UserName": "bob"}),
                json!({"Tags": []}),
            );
        let caller = ApiCaller::new(&api, &def.kind, &ScanOptions::default());
        let pages = vec![json!({"Users": [{"UserName": "alice"}, {"UserName": "bob"}]})];

        let f = filter(&def.kind, KindFilterEntry::default().with_tag("temporary", "yes"));
        let selected = def.selector.select(&caller, def, &pages, &f).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "alice");
        assert_eq!(api.call_count("iam", "ListUserTags"), 2);
    }

    #[tokio::test]
    async fn test_kms_key_skips_managed_and_pending_keys() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_kms_key").unwrap();
        let api = StaticApi::new()
            .respond_when(
                "kms",
                "DescribeKey",
                json!({"KeyId": "managed"}),
                json!({"KeyMetadata": {"KeyManager": "AWS", "KeyState": "Enabled"}}),
            )
            .respond_when(
                "kms",
                "DescribeKey",
                json!({"KeyId": "pending"}),
                json!({"KeyMetadata": {"KeyManager": "CUSTOMER", "KeyState": "PendingDeletion"}}),
            )
            .respond_when(
                "kms",
                "DescribeKey",
                json!({"KeyId": "mine"}),
                json!({"KeyMetadata": {
                    "KeyManager": "CUSTOMER",
                    "KeyState": "Enabled",
                    "CreationDate": 1577836800
                }}),
            )
            .respond(
                "kms",
                "ListResourceTags",
                json!({"Tags": [{"TagKey": "owner", "TagValue": "ci"}]}),
            );
        let caller = ApiCaller::new(&api, &def.kind, &ScanOptions::default());
        let pages = vec![json!({"Keys": [
            {"KeyId": "managed"},
            {"KeyId": "pending"},
            {"KeyId": "mine"}
        ]})];

        let f = filter(&def.kind, KindFilterEntry::default());
        let selected = def.selector.select(&caller, def, &pages, &f).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "mine");
        assert_eq!(selected[0].tags.get("owner").map(String::as_str), Some("ci"));
        assert!(selected[0].created_at.is_some());
        assert_eq!(api.call_count("kms", "ListResourceTags"), 1);
    }

    #[tokio::test]
    async fn test_route53_zone_strips_prefix() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_route53_zone").unwrap();
        let api = StaticApi::new().respond_when(
            "route53",
            "ListTagsForResource",
            json!({"ResourceId": "Z123"}),
            json!({"ResourceTagSet": {"ResourceId": "Z123", "Tags": [{"Key": "env", "Value": "test"}]}}),
        );
        let caller = ApiCaller::new(&api, &def.kind, &ScanOptions::default());
        let pages = vec![json!({"HostedZones": [{"Id": "/hostedzone/Z123", "Name": "example.com."}]})];

        let f = filter(&def.kind, KindFilterEntry::default().with_tag("env", "test"));
        let selected = def.selector.select(&caller, def, &pages, &f).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "Z123");
    }

    #[tokio::test]
    async fn test_efs_file_system_fetches_tags() {
        let registry = Registry::load().unwrap();
        let def = registry.lookup("aws_efs_file_system").unwrap();
        let api = StaticApi::new().respond(
            "efs",
            "DescribeTags",
            json!({"Tags": [{"Key": "Name", "Value": "scratch"}]}),
        );
        let caller = ApiCaller::new(&api, &def.kind, &ScanOptions::default());
        let pages = vec![json!({"FileSystems": [{"FileSystemId": "fs-1"}]})];

        let f = filter(&def.kind, KindFilterEntry::default().with_tag("Name", "^scr"));
        let selected = def.selector.select(&caller, def, &pages, &f).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "fs-1");
    }
}
