use std::fmt;

use bytes::Bytes;
use objio_types::{ByteRange, ObjectRef};

use crate::checksum::Checksum;

/// The store operations, named as they appear in transfer-fault messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    HeadObject,
    GetObject,
    PutObject,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HeadObject => "HeadObject",
            Self::GetObject => "GetObject",
            Self::PutObject => "PutObject",
        })
    }
}

/// Metadata returned by a probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_length: u64,
    pub etag: Option<String>,
}

/// Conditional-write guard attached to a PUT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteGuard {
    /// The object's current version tag must equal this value.
    IfMatch(String),
    /// The object must not exist.
    IfNoneMatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetObjectRequest {
    pub object: ObjectRef,
    pub range: Option<ByteRange>,
}

impl GetObjectRequest {
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<ByteRange>) -> Self {
        self.range = range;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetObjectOutput {
    /// `200` for full content, `206` for a ranged response.
    pub status: u16,
    pub body: Bytes,
    pub etag: Option<String>,
}

/// A whole-object PUT, optionally appending at a write offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub object: ObjectRef,
    pub body: Bytes,
    /// Append marker: the store's current length must equal this offset.
    pub write_offset: Option<u64>,
    pub guard: Option<WriteGuard>,
    pub checksum: Option<Checksum>,
}

impl PutObjectRequest {
    pub fn new(object: ObjectRef, body: impl Into<Bytes>) -> Self {
        Self {
            object,
            body: body.into(),
            write_offset: None,
            guard: None,
            checksum: None,
        }
    }

    pub fn with_write_offset(mut self, offset: u64) -> Self {
        self.write_offset = Some(offset);
        self
    }

    pub fn with_guard(mut self, guard: Option<WriteGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_checksum(mut self, checksum: Option<Checksum>) -> Self {
        self.checksum = checksum;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Resulting object size, when the store reports it.
    pub size: Option<u64>,
    pub etag: Option<String>,
}
