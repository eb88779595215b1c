//! Region-keyed client pool
//!
//! One backend client per region, built on first use. Clients carry no
//! per-request state, so losing a construction race is harmless: the
//! first client inserted wins and the other is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{BackendFactory, StorageBackend};
use crate::error::{Error, Result};

/// Maximum number of cached regions; region names come from callers
const DEFAULT_MAX_REGIONS: usize = 32;

/// Lazily populated `region -> client` cache
pub struct ClientPool {
    factory: Arc<dyn BackendFactory>,
    clients: RwLock<HashMap<String, Arc<dyn StorageBackend>>>,
    max_regions: usize,
}

impl ClientPool {
    /// Create an empty pool
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
            max_regions: DEFAULT_MAX_REGIONS,
        }
    }

    /// Override the cache bound
    pub fn with_max_regions(mut self, max_regions: usize) -> Self {
        self.max_regions = max_regions;
        self
    }

    /// Get the client for `region`, constructing it if absent
    pub async fn get(&self, region: &str) -> Result<Arc<dyn StorageBackend>> {
        if region.is_empty() {
            return Err(Error::MissingParameter { field: "region" });
        }

        if let Some(client) = self.clients.read().await.get(region) {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(region) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.create(region)?;
        if clients.len() < self.max_regions {
            tracing::debug!("Caching backend client for region {}", region);
            clients.insert(region.to_string(), Arc::clone(&client));
        } else {
            tracing::warn!(
                "Region cache full ({} entries), not caching client for {}",
                self.max_regions,
                region
            );
        }

        Ok(client)
    }

    /// Whether a client for `region` is cached
    pub async fn contains(&self, region: &str) -> bool {
        self.clients.read().await.contains_key(region)
    }

    /// Number of cached regions
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Drop every cached client
    pub async fn clear(&self) {
        self.clients.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::CountingFactory;
    use crate::backend::MemoryBackend;

    fn counting() -> Arc<CountingFactory> {
        Arc::new(CountingFactory::new(Arc::new(MemoryBackend::new())))
    }

    #[tokio::test]
    async fn test_clients_are_built_once_per_region() {
        let factory = counting();
        let pool = ClientPool::new(factory.clone());

        pool.get("us-east-2").await.unwrap();
        pool.get("us-east-2").await.unwrap();
        pool.get("eu-west-1").await.unwrap();

        assert_eq!(factory.created(), 2);
        assert_eq!(pool.len().await, 2);
        assert!(pool.contains("eu-west-1").await);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_client() {
        let factory = counting();
        let pool = Arc::new(ClientPool::new(factory.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.get("ap-south-1").await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(factory.created(), 1);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let factory = counting();
        let pool = ClientPool::new(factory.clone()).with_max_regions(1);

        pool.get("us-east-1").await.unwrap();
        pool.get("us-west-2").await.unwrap();
        pool.get("us-west-2").await.unwrap();

        assert_eq!(pool.len().await, 1);
        assert!(!pool.contains("us-west-2").await);
        assert_eq!(factory.created(), 3);
    }

    #[tokio::test]
    async fn test_empty_region_is_rejected() {
        let pool = ClientPool::new(counting());
        assert!(matches!(
            pool.get("").await,
            Err(Error::MissingParameter { field: "region" })
        ));

        pool.get("us-east-2").await.unwrap();
        pool.clear().await;
        assert!(pool.is_empty().await);
    }
}
