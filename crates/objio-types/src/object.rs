use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a remote object: a `(bucket, key)` pair.
///
/// Immutable once constructed. The string form used in every channel error
/// message is the caller's logical path when one was attached with
/// [`ObjectRef::with_path`], and the key otherwise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    bucket: String,
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            path: None,
        }
    }

    /// Attach the logical path the caller opened, e.g. `/dir/file.txt`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The logical path, falling back to the key.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.key)
    }

    /// The bucket holding the object.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The object key within the bucket.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}/{})", self.bucket, self.key)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
