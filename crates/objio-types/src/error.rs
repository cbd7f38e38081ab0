use thiserror::Error;

/// Errors produced while building an open-option set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown integrity check algorithm '{0}'")]
    UnknownChecksumAlgorithm(String),

    #[error("duplicate open option: {0}")]
    Duplicate(&'static str),

    #[error("invalid byte range: start {start} is greater than end {end}")]
    InvalidRange { start: u64, end: u64 },
}
