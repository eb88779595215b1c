//! Location Resolver
//!
//! Turns a user-facing path such as `my-bucket/logs/2024/` or
//! `s3://my-bucket/logs/2024/` into a bucket name and a key prefix.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Scheme marker recognised at the front of a raw path
pub const SCHEME: &str = "s3://";

/// A bucket and key prefix pointing into object storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Bucket name, taken from the URI host
    pub bucket: String,
    /// Key prefix without a leading separator; empty for the bucket root
    pub prefix: String,
}

impl Location {
    /// Create a location from already separated parts
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Whether this location names the root of its bucket
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Re-join into `s3://bucket/prefix`
    pub fn to_uri(&self) -> String {
        format!("{}{}/{}", SCHEME, self.bucket, self.prefix)
    }

    /// The location one directory level up, or `None` at the bucket root
    pub fn parent(&self) -> Option<Location> {
        if self.is_root() {
            return None;
        }
        let trimmed = self.prefix.trim_end_matches('/');
        let prefix = match trimmed.rfind('/') {
            Some(pos) => &trimmed[..=pos],
            None => "",
        };
        Some(Location::new(self.bucket.clone(), prefix))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// Resolve a raw user path into a [`Location`]
///
/// The scheme marker is optional. Bucket names are not checked for
/// legality here; the storage backend rejects illegal names itself.
pub fn resolve(raw_path: &str) -> Result<Location> {
    let raw = raw_path.trim();
    if raw.is_empty() {
        return Err(Error::MissingParameter { field: "path" });
    }

    let normalized = if has_scheme(raw) {
        format!("{}{}", SCHEME, &raw[SCHEME.len()..])
    } else {
        format!("{}{}", SCHEME, raw)
    };

    let url = Url::parse(&normalized).map_err(|e| Error::invalid_location(raw, e.to_string()))?;

    let bucket = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(Error::invalid_location(raw, "missing bucket name")),
    };

    // exactly one leading separator belongs to the URI, the rest to the key
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let prefix = percent_decode_str(path)
        .decode_utf8()
        .map_err(|e| Error::invalid_location(raw, e.to_string()))?
        .into_owned();

    Ok(Location { bucket, prefix })
}

fn has_scheme(raw: &str) -> bool {
    raw.get(..SCHEME.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SCHEME))
}
