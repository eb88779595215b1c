//! Paginated Listing Service
//!
//! Issues exactly one delimited listing call per invocation. Following
//! `next_token` across pages is left to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use super::PageResult;
use crate::backend::{
    BackendFactory, ClientPool, CredentialSource, PageRequest, S3BackendFactory,
};
use crate::config::{BrowserConfig, MAX_KEYS_LIMIT};
use crate::error::{Error, Result};
use crate::location::{self, Location};

/// Default deadline for one backend call
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default page size
const DEFAULT_MAX_KEYS: usize = 20;

/// Stateless listing front-end over a region-keyed backend pool
pub struct ListingService {
    pool: ClientPool,
    max_keys: usize,
    request_timeout: Duration,
}

impl ListingService {
    /// Create a service that builds backends through `factory`
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            pool: ClientPool::new(factory),
            max_keys: DEFAULT_MAX_KEYS,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build an S3-backed service; the credential source is selected here, once
    pub fn from_config(config: &BrowserConfig) -> Result<Self> {
        let source = CredentialSource::select(&config.credentials);
        let factory = S3BackendFactory::from_config(&config.storage, &source)?;

        Ok(Self::new(Arc::new(factory))
            .with_max_keys(config.storage.max_keys)
            .with_request_timeout(config.request_timeout()))
    }

    /// Set the page size used by [`ListingService::browse`]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Set the deadline for a single backend call
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Default page size
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Backend client cache
    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Resolve `raw_path` and list one page with the default page size
    pub async fn browse(
        &self,
        raw_path: &str,
        region: &str,
        continuation_token: Option<&str>,
    ) -> Result<PageResult> {
        let location = location::resolve(raw_path)?;
        self.list_page(&location, region, self.max_keys, continuation_token)
            .await
    }

    /// List one page of `location` in `region`
    pub async fn list_page(
        &self,
        location: &Location,
        region: &str,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> Result<PageResult> {
        if location.bucket.is_empty() {
            return Err(Error::invalid_location(location.to_uri(), "missing bucket name"));
        }
        if max_keys == 0 || max_keys > MAX_KEYS_LIMIT {
            return Err(Error::InvalidParameter {
                field: "max_keys",
                reason: format!("must be between 1 and {}", MAX_KEYS_LIMIT),
            });
        }

        let request = PageRequest::new(
            location.bucket.as_str(),
            location.prefix.as_str(),
            max_keys,
            continuation_token,
        );
        let backend = self.pool.get(region).await?;

        tracing::debug!(
            "Listing {} in {} (max_keys={}, continued={})",
            location,
            region,
            max_keys,
            request.continuation_token.is_some()
        );

        let output = match timeout(self.request_timeout, backend.list_objects(&request)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!("Listing {} in {} failed: {}", location, region, e);
                return Err(e);
            }
            Err(_) => {
                tracing::warn!("Listing {} in {} timed out", location, region);
                return Err(Error::BackendUnavailable(format!(
                    "listing timed out after {:?}",
                    self.request_timeout
                )));
            }
        };

        Ok(PageResult::from_output(&location.prefix, output))
    }
}
