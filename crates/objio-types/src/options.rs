use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::OptionError;
use crate::integrity::ChecksumAlgorithm;

/// The standard open flags. They compose freely; repeating one is harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StandardOption {
    Read,
    Write,
    Append,
    /// Create the object if it does not exist.
    Create,
    /// Create the object, failing if it already exists.
    CreateNew,
}

/// Byte-range restriction for a staged download: `[start, end)`.
///
/// An absent `end` reads through to the end of the object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Result<Self, OptionError> {
        if start > end {
            return Err(OptionError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    /// Everything from `start` to the end of the object.
    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }

    /// The first `end` bytes of the object.
    pub fn first(end: u64) -> Self {
        Self {
            start: 0,
            end: Some(end),
        }
    }

    /// Clamp the range to an object of `len` bytes.
    ///
    /// Returns `None` when the range starts past the end of the object.
    pub fn clamp(&self, len: u64) -> Option<Range<u64>> {
        if self.start > len {
            return None;
        }
        let end = self.end.map_or(len, |end| end.min(len));
        Some(self.start..end.max(self.start))
    }
}

/// A single open option: a standard flag or one of the extension options.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpenOption {
    Standard(StandardOption),
    /// Download only the given byte range when staging.
    Range(ByteRange),
    /// Capture the object's version tag at open and require it unchanged at
    /// upload time.
    PreventConcurrentOverwrite,
    /// Skip the upload when the staged content hash is unchanged.
    PutOnlyIfModified,
    /// Override the configured integrity-check algorithm.
    IntegrityCheck(ChecksumAlgorithm),
}

impl OpenOption {
    pub const READ: Self = Self::Standard(StandardOption::Read);
    pub const WRITE: Self = Self::Standard(StandardOption::Write);
    pub const APPEND: Self = Self::Standard(StandardOption::Append);
    pub const CREATE: Self = Self::Standard(StandardOption::Create);
    pub const CREATE_NEW: Self = Self::Standard(StandardOption::CreateNew);

    /// Restrict a staged download to `[start, end)`.
    pub fn range(start: u64, end: u64) -> Result<Self, OptionError> {
        ByteRange::new(start, end).map(Self::Range)
    }

    /// Restrict a staged download to the first `end` bytes.
    pub fn range_to(end: u64) -> Self {
        Self::Range(ByteRange::first(end))
    }

    /// Restrict a staged download to everything from `start` on.
    pub fn range_from(start: u64) -> Self {
        Self::Range(ByteRange::from_start(start))
    }

    /// Select an integrity-check algorithm by name.
    pub fn integrity_check_algorithm(name: &str) -> Result<Self, OptionError> {
        name.parse().map(Self::IntegrityCheck)
    }

    /// Name of the extension kind, `None` for standard flags.
    fn extension_kind(&self) -> Option<&'static str> {
        match self {
            Self::Standard(_) => None,
            Self::Range(_) => Some("range"),
            Self::PreventConcurrentOverwrite => Some("preventConcurrentOverwrite"),
            Self::PutOnlyIfModified => Some("putOnlyIfModified"),
            Self::IntegrityCheck(_) => Some("integrityCheckAlgorithm"),
        }
    }
}

impl From<StandardOption> for OpenOption {
    fn from(option: StandardOption) -> Self {
        Self::Standard(option)
    }
}

/// A validated open-option set.
///
/// Standard flags have set semantics. Each extension option kind may appear
/// at most once; adding a second instance is rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    standard: BTreeSet<StandardOption>,
    range: Option<ByteRange>,
    prevent_concurrent_overwrite: bool,
    put_only_if_modified: bool,
    integrity_check: Option<ChecksumAlgorithm>,
}

impl OpenOptions {
    /// An empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a sequence of options, rejecting duplicate extensions.
    pub fn from_options<I>(options: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = OpenOption>,
    {
        let mut set = Self::new();
        for option in options {
            set.insert(option)?;
        }
        Ok(set)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, option: impl Into<OpenOption>) -> Result<Self, OptionError> {
        self.insert(option.into())?;
        Ok(self)
    }

    pub fn insert(&mut self, option: OpenOption) -> Result<(), OptionError> {
        if let Some(kind) = option.extension_kind() {
            if self.has_extension(&option) {
                return Err(OptionError::Duplicate(kind));
            }
        }
        match option {
            OpenOption::Standard(flag) => {
                self.standard.insert(flag);
            }
            OpenOption::Range(range) => self.range = Some(range),
            OpenOption::PreventConcurrentOverwrite => self.prevent_concurrent_overwrite = true,
            OpenOption::PutOnlyIfModified => self.put_only_if_modified = true,
            OpenOption::IntegrityCheck(alg) => self.integrity_check = Some(alg),
        }
        Ok(())
    }

    fn has_extension(&self, option: &OpenOption) -> bool {
        match option {
            OpenOption::Standard(_) => false,
            OpenOption::Range(_) => self.range.is_some(),
            OpenOption::PreventConcurrentOverwrite => self.prevent_concurrent_overwrite,
            OpenOption::PutOnlyIfModified => self.put_only_if_modified,
            OpenOption::IntegrityCheck(_) => self.integrity_check.is_some(),
        }
    }

    pub fn contains(&self, flag: StandardOption) -> bool {
        self.standard.contains(&flag)
    }

    pub fn create(&self) -> bool {
        self.contains(StandardOption::Create)
    }

    pub fn create_new(&self) -> bool {
        self.contains(StandardOption::CreateNew)
    }

    /// `true` when either `CREATE` or `CREATE_NEW` allows a missing object.
    pub fn may_create(&self) -> bool {
        self.create() || self.create_new()
    }

    pub fn append(&self) -> bool {
        self.contains(StandardOption::Append)
    }

    pub fn range(&self) -> Option<ByteRange> {
        self.range
    }

    pub fn prevent_concurrent_overwrite(&self) -> bool {
        self.prevent_concurrent_overwrite
    }

    pub fn put_only_if_modified(&self) -> bool {
        self.put_only_if_modified
    }

    pub fn integrity_check(&self) -> Option<ChecksumAlgorithm> {
        self.integrity_check
    }
}
