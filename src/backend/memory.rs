//! In-memory backend
//!
//! Holds a fixed snapshot of bucket keys and answers delimited listings the
//! way ListObjectsV2 does:
//! - keys sharing the next delimiter segment collapse into one common prefix
//! - objects and common prefixes are ordered together by name
//! - `max_keys` bounds objects and prefixes combined
//! - the continuation token is the name of the last entry on the page

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    BackendFactory, CommonPrefix, ListObjectsOutput, ObjectEntry, PageRequest, StorageBackend,
};
use crate::error::{Error, Result};

/// One listing row before it is split back into prefixes and objects
enum Entry {
    Prefix(String),
    Object(String),
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Entry::Prefix(name) | Entry::Object(name) => name,
        }
    }
}

/// Snapshot backend used for local demos and tests
#[derive(Default)]
pub struct MemoryBackend {
    buckets: BTreeMap<String, BTreeSet<String>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<PageRequest>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object key to a bucket, creating the bucket if needed
    pub fn with_object(mut self, bucket: &str, key: &str) -> Self {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string());
        self
    }

    /// Add an empty bucket
    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.buckets.entry(bucket.to_string()).or_default();
        self
    }

    /// Parse a snapshot of `bucket/key` lines; blank lines and lines
    /// starting with `#` are skipped
    pub fn from_snapshot(text: &str) -> Result<Self> {
        let mut backend = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() => {
                    backend = if key.is_empty() {
                        backend.with_bucket(bucket)
                    } else {
                        backend.with_object(bucket, key)
                    };
                }
                _ => {
                    return Err(Error::Config(format!(
                        "snapshot line {}: expected bucket/key, got '{}'",
                        lineno + 1,
                        line
                    )))
                }
            }
        }
        Ok(backend)
    }

    /// Number of listing calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request received
    pub fn last_request(&self) -> Option<PageRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    /// Group keys under `prefix` into one ordered level of entries
    fn entries(keys: &BTreeSet<String>, prefix: &str, delimiter: &str) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::new();

        for key in keys.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }

            let after_prefix = &key[prefix.len()..];
            let grouped = if delimiter.is_empty() {
                None
            } else {
                after_prefix
                    .find(delimiter)
                    .map(|pos| format!("{}{}", prefix, &after_prefix[..pos + delimiter.len()]))
            };

            match grouped {
                Some(common) => {
                    // keys under one common prefix are contiguous in sort order
                    let seen = matches!(entries.last(), Some(Entry::Prefix(last)) if *last == common);
                    if !seen {
                        entries.push(Entry::Prefix(common));
                    }
                }
                None => entries.push(Entry::Object(key.clone())),
            }
        }

        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_objects(&self, request: &PageRequest) -> Result<ListObjectsOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let keys = self.buckets.get(&request.bucket).ok_or_else(|| {
            Error::BackendUnavailable(format!(
                "NoSuchBucket: the bucket '{}' does not exist",
                request.bucket
            ))
        })?;

        let mut entries = Self::entries(keys, &request.prefix, &request.delimiter);

        if let Some(token) = &request.continuation_token {
            entries.retain(|e| e.name() > token.as_str());
        }

        let is_truncated = entries.len() > request.max_keys;
        entries.truncate(request.max_keys);

        let next_continuation_token = if is_truncated {
            entries.last().map(|e| e.name().to_string())
        } else {
            None
        };

        let mut output = ListObjectsOutput {
            is_truncated,
            next_continuation_token,
            ..ListObjectsOutput::default()
        };
        for entry in entries {
            match entry {
                Entry::Prefix(prefix) => output.common_prefixes.push(CommonPrefix { prefix }),
                Entry::Object(key) => output.contents.push(ObjectEntry { key }),
            }
        }

        Ok(output)
    }
}

/// Hands out one shared snapshot for every region
pub struct MemoryBackendFactory {
    backend: Arc<MemoryBackend>,
}

impl MemoryBackendFactory {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }
}

impl BackendFactory for MemoryBackendFactory {
    fn create(&self, _region: &str) -> Result<Arc<dyn StorageBackend>> {
        Ok(self.backend.clone())
    }
}
