//! s3browse - Directory-style browsing for object storage
//!
//! Presents an S3 bucket as a directory tree, one page at a time. A raw
//! location such as `my-bucket/logs/` is resolved into a bucket and key
//! prefix, a single delimited ListObjectsV2 page is fetched, and the result
//! is reshaped into subdirectories and files relative to that prefix.
//!
//! # Features
//!
//! - Location parsing with an optional `s3://` scheme marker
//! - One backend call per page; callers follow continuation tokens
//! - Region-keyed backend client cache
//! - Credential source selection performed once at startup
//! - HTTP API with structured client errors

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod listing;
pub mod location;

pub use config::BrowserConfig;
pub use error::{Error, ErrorKind, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::{PageRequest, StorageBackend};
    pub use crate::config::BrowserConfig;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::listing::{ListingService, PageResult};
    pub use crate::location::{resolve, Location};
}
