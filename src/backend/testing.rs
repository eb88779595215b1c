//! Test doubles shared by the listing and API tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendFactory, ListObjectsOutput, PageRequest, StorageBackend};
use crate::error::{Error, Result};

/// Backend whose every call fails the way a denied S3 request does
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn list_objects(&self, _request: &PageRequest) -> Result<ListObjectsOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::BackendUnavailable("AccessDenied: Access Denied".into()))
    }
}

/// Backend that never answers within any reasonable deadline
pub struct StalledBackend;

#[async_trait]
impl StorageBackend for StalledBackend {
    async fn list_objects(&self, _request: &PageRequest) -> Result<ListObjectsOutput> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ListObjectsOutput::default())
    }
}

/// Backend that returns a canned response
pub struct StaticBackend(pub ListObjectsOutput);

#[async_trait]
impl StorageBackend for StaticBackend {
    async fn list_objects(&self, _request: &PageRequest) -> Result<ListObjectsOutput> {
        Ok(self.0.clone())
    }
}

/// Factory that hands out one backend and counts constructions
pub struct CountingFactory {
    backend: Arc<dyn StorageBackend>,
    pub created: AtomicUsize,
}

impl CountingFactory {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl BackendFactory for CountingFactory {
    fn create(&self, _region: &str) -> Result<Arc<dyn StorageBackend>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.backend.clone())
    }
}
