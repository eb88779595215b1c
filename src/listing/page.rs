//! Page results and the reshaping of raw listings into them

use serde::{Deserialize, Serialize};

use crate::backend::ListObjectsOutput;

/// One page of a directory-style listing, relative to the queried prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// Immediate child prefixes, trailing `/` kept
    pub directories: Vec<String>,
    /// Immediate child object names
    pub files: Vec<String>,
    /// Cursor for the next page; `None` once the listing is exhausted
    pub next_token: Option<String>,
}

impl PageResult {
    /// Reshape a raw backend page queried with `prefix`
    pub fn from_output(prefix: &str, output: ListObjectsOutput) -> Self {
        let directories = output
            .common_prefixes
            .into_iter()
            .map(|cp| relative_to(prefix, cp.prefix))
            .collect();

        let files = output
            .contents
            .into_iter()
            // the object named exactly like the prefix is a directory marker
            .filter(|obj| obj.key.len() != prefix.len())
            .map(|obj| relative_to(prefix, obj.key))
            .collect();

        let next_token = if output.is_truncated {
            output.next_continuation_token.filter(|t| !t.is_empty())
        } else {
            None
        };

        Self {
            directories,
            files,
            next_token,
        }
    }

    /// Whether more pages follow this one
    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Remove `prefix` from the front of `value`
///
/// Anchored at the front by length, so a prefix that recurs later inside
/// the key is left alone. A value that does not start with the prefix is
/// returned whole.
fn relative_to(prefix: &str, value: String) -> String {
    if value.starts_with(prefix) {
        value[prefix.len()..].to_string()
    } else {
        tracing::warn!("Backend returned '{}' outside queried prefix '{}'", value, prefix);
        value
    }
}
