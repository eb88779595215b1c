//! S3 backend built on the `rust-s3` client

use std::sync::Arc;

use async_trait::async_trait;
use s3::serde_types::ListBucketResult;
use s3::{Bucket, Region};

use super::credentials::CredentialStore;
use super::{
    BackendFactory, CommonPrefix, CredentialSource, ListObjectsOutput, ObjectEntry, PageRequest,
    StorageBackend,
};
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// S3 client bound to a single region
#[derive(Clone)]
pub struct S3Backend {
    region: Region,
    credentials: Arc<CredentialStore>,
    path_style: bool,
}

impl S3Backend {
    pub fn new(region: Region, credentials: Arc<CredentialStore>, path_style: bool) -> Self {
        Self {
            region,
            credentials,
            path_style,
        }
    }

    /// Region this client sends requests to
    pub fn region(&self) -> &Region {
        &self.region
    }

    async fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let credentials = self.credentials.current().await?;
        let bucket = Bucket::new(name, self.region.clone(), credentials)
            .map_err(|e| Error::BackendUnavailable(format!("bucket '{}': {}", name, e)))?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn list_objects(&self, request: &PageRequest) -> Result<ListObjectsOutput> {
        let bucket = self.bucket(&request.bucket).await?;

        let (result, status) = bucket
            .list_page(
                request.prefix.clone(),
                Some(request.delimiter.clone()),
                request.continuation_token.clone(),
                None,
                Some(request.max_keys),
            )
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        into_output(&request.bucket, result, status)
    }
}

/// Convert one ListObjectsV2 response into the backend-neutral shape
fn into_output(bucket: &str, result: ListBucketResult, status: u16) -> Result<ListObjectsOutput> {
    if !(200..300).contains(&status) {
        return Err(Error::BackendUnavailable(format!(
            "ListObjectsV2 on '{}' returned HTTP {}",
            bucket, status
        )));
    }

    Ok(ListObjectsOutput {
        common_prefixes: result
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .map(|cp| CommonPrefix { prefix: cp.prefix })
            .collect(),
        contents: result
            .contents
            .into_iter()
            .map(|obj| ObjectEntry { key: obj.key })
            .collect(),
        is_truncated: result.is_truncated,
        next_continuation_token: result.next_continuation_token,
    })
}

/// Whether `name` looks like a region identifier such as `eu-west-1`
fn is_region_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Builds [`S3Backend`] clients sharing one credential store
pub struct S3BackendFactory {
    credentials: Arc<CredentialStore>,
    endpoint: Option<String>,
    path_style: bool,
}

impl S3BackendFactory {
    pub fn new(credentials: Arc<CredentialStore>, endpoint: Option<String>, path_style: bool) -> Self {
        Self {
            credentials,
            endpoint,
            path_style,
        }
    }

    /// Load credentials from the selected source and capture the storage settings
    pub fn from_config(storage: &StorageConfig, source: &CredentialSource) -> Result<Self> {
        let credentials = CredentialStore::load(source.clone())?;
        tracing::info!("Using storage credentials from {}", source.describe());

        Ok(Self::new(
            Arc::new(credentials),
            storage.endpoint.clone(),
            // custom endpoints rarely support virtual-hosted buckets
            storage.path_style || storage.endpoint.is_some(),
        ))
    }

    /// Map a caller-supplied region name onto a region; the endpoint host is
    /// never taken from the name itself
    fn region(&self, name: &str) -> Result<Region> {
        if !is_region_name(name) {
            return Err(Error::InvalidParameter {
                field: "region",
                reason: format!("'{}' is not a region name", name),
            });
        }

        if let Some(endpoint) = &self.endpoint {
            return Ok(Region::Custom {
                region: name.to_string(),
                endpoint: endpoint.clone(),
            });
        }

        match name.parse::<Region>() {
            Ok(Region::Custom { .. }) | Err(_) => Ok(Region::Custom {
                region: name.to_string(),
                endpoint: format!("https://s3.{}.amazonaws.com", name),
            }),
            Ok(region) => Ok(region),
        }
    }
}

impl BackendFactory for S3BackendFactory {
    fn create(&self, region: &str) -> Result<Arc<dyn StorageBackend>> {
        let region = self.region(region)?;
        tracing::debug!("Creating S3 client for region {}", region);
        Ok(Arc::new(S3Backend::new(
            region,
            Arc::clone(&self.credentials),
            self.path_style,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ClientPool;
    use s3::creds::Credentials;

    fn factory(endpoint: Option<&str>) -> S3BackendFactory {
        let source = CredentialSource::Explicit {
            access_key: "AKID".into(),
            secret_key: "secret".into(),
        };
        let store = CredentialStore::load(source).unwrap();
        S3BackendFactory::new(Arc::new(store), endpoint.map(str::to_string), false)
    }

    fn listing(prefixes: Option<&[&str]>, keys: &[&str], token: Option<&str>) -> ListBucketResult {
        ListBucketResult {
            name: "bucket".into(),
            delimiter: Some("/".into()),
            max_keys: Some(20),
            prefix: Some("a/".into()),
            continuation_token: None,
            encoding_type: None,
            is_truncated: token.is_some(),
            next_continuation_token: token.map(str::to_string),
            contents: keys
                .iter()
                .map(|k| s3::serde_types::Object {
                    last_modified: "2024-01-01T00:00:00.000Z".into(),
                    e_tag: None,
                    storage_class: None,
                    key: k.to_string(),
                    owner: None,
                    size: 0,
                })
                .collect(),
            common_prefixes: prefixes.map(|ps| {
                ps.iter()
                    .map(|p| s3::serde_types::CommonPrefix { prefix: p.to_string() })
                    .collect()
            }),
        }
    }

    #[test]
    fn test_known_region() {
        let region = factory(None).region("us-east-2").unwrap();
        assert!(matches!(region, Region::UsEast2));
    }

    #[test]
    fn test_unlisted_region_stays_on_aws() {
        match factory(None).region("mx-central-9").unwrap() {
            Region::Custom { region, endpoint } => {
                assert_eq!(region, "mx-central-9");
                assert_eq!(endpoint, "https://s3.mx-central-9.amazonaws.com");
            }
            other => panic!("expected custom region, got {:?}", other),
        }
    }

    #[test]
    fn test_host_like_region_names_are_rejected() {
        let factory = factory(None);
        for name in [
            "169.254.169.254",
            "attacker.example:8080",
            "not a region",
            "http://localhost",
            "US-EAST-1",
            "",
        ] {
            assert!(
                matches!(
                    factory.region(name),
                    Err(Error::InvalidParameter { field: "region", .. })
                ),
                "accepted {:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_rejected_region_is_not_cached() {
        let pool = ClientPool::new(Arc::new(factory(None)));
        let err = pool.get("169.254.169.254").await.err().unwrap();
        assert!(err.is_user_error());
        assert_eq!(err.field(), Some("region"));
        assert!(pool.is_empty().await);
    }

    #[test]
    fn test_custom_endpoint_region() {
        let region = factory(Some("http://localhost:9000")).region("us-east-1").unwrap();
        match region {
            Region::Custom { region, endpoint } => {
                assert_eq!(region, "us-east-1");
                assert_eq!(endpoint, "http://localhost:9000");
            }
            other => panic!("expected custom region, got {:?}", other),
        }
        assert!(factory(Some("http://localhost:9000")).region("localhost:9999").is_err());
    }

    #[test]
    fn test_from_config_forces_path_style_for_custom_endpoint() {
        let storage = StorageConfig {
            endpoint: Some("http://localhost:4566".into()),
            ..StorageConfig::default()
        };
        let source = CredentialSource::Explicit {
            access_key: "test".into(),
            secret_key: "test".into(),
        };
        let factory = S3BackendFactory::from_config(&storage, &source).unwrap();
        assert!(factory.path_style);
    }

    #[test]
    fn test_listing_without_common_prefixes() {
        let output = into_output("bucket", listing(None, &["a/x.txt"], None), 200).unwrap();
        assert!(output.common_prefixes.is_empty());
        assert_eq!(output.contents, vec![ObjectEntry { key: "a/x.txt".into() }]);
        assert!(!output.is_truncated);
        assert_eq!(output.next_continuation_token, None);
    }

    #[test]
    fn test_truncated_listing_keeps_order_and_token() {
        let output = into_output(
            "bucket",
            listing(Some(&["a/z/", "a/b/"]), &["a/", "a/1.txt"], Some("opaque==")),
            200,
        )
        .unwrap();
        assert_eq!(
            output.common_prefixes,
            vec![
                CommonPrefix { prefix: "a/z/".into() },
                CommonPrefix { prefix: "a/b/".into() },
            ]
        );
        assert_eq!(output.contents.len(), 2);
        assert!(output.is_truncated);
        assert_eq!(output.next_continuation_token.as_deref(), Some("opaque=="));
    }

    #[test]
    fn test_error_status_is_backend_unavailable() {
        let err = into_output("bucket", listing(None, &["a/x.txt"], None), 403).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_backends_share_the_credential_store() {
        let factory = factory(None);
        let _east = factory.create("us-east-2").unwrap();
        let _west = factory.create("eu-west-1").unwrap();
        assert_eq!(Arc::strong_count(&factory.credentials), 3);

        let credentials: Credentials = factory.credentials.current().await.unwrap();
        assert_eq!(credentials.access_key.as_deref(), Some("AKID"));
    }
}
