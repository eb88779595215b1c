//! Storage Backend Module
//!
//! The listing service only needs one capability from object storage:
//! a delimited, paginated "list objects" call. This module defines that
//! capability and the implementations behind it.

pub mod credentials;
pub mod memory;
pub mod pool;
pub mod s3;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use self::credentials::{CredentialSource, CredentialStore};
pub use self::memory::{MemoryBackend, MemoryBackendFactory};
pub use self::pool::ClientPool;
pub use self::s3::{S3Backend, S3BackendFactory};

/// Separator that groups keys into one directory level
pub const DELIMITER: &str = "/";

/// One delimited listing request, built fresh per call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: String,
    pub max_keys: usize,
    /// Never `Some("")`; an empty cursor is dropped at construction
    pub continuation_token: Option<String>,
}

impl PageRequest {
    /// Build a request with the standard delimiter
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            delimiter: DELIMITER.to_string(),
            max_keys,
            continuation_token: continuation_token
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }
}

/// A common prefix returned by a delimited listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonPrefix {
    pub prefix: String,
}

/// An object key returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
}

/// Raw backend response for one page, before reshaping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsOutput {
    pub common_prefixes: Vec<CommonPrefix>,
    pub contents: Vec<ObjectEntry>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// Object storage that can list one delimited page
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Issue exactly one listing call
    async fn list_objects(&self, request: &PageRequest) -> Result<ListObjectsOutput>;
}

/// Builds a backend client bound to one region
pub trait BackendFactory: Send + Sync {
    fn create(&self, region: &str) -> Result<Arc<dyn StorageBackend>>;
}
