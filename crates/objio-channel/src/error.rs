use std::fmt;
use std::io;

use objio_transport::{Operation, TransportError};
use objio_types::{ObjectRef, OptionError};
use thiserror::Error;

use crate::wait::WaitError;

/// What the caller was doing when a wait or client failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Open,
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "Could not open the path",
            Self::Write => "Could not write to path",
        })
    }
}

impl From<Operation> for Action {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::PutObject => Self::Write,
            Operation::HeadObject | Operation::GetObject => Self::Open,
        }
    }
}

/// Errors surfaced by channels.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The object does not exist. Displays as the object path.
    #[error("{path}")]
    NotFound { path: String },

    /// The object exists where it must not. Displays as the object path.
    #[error("{path}")]
    AlreadyExists { path: String },

    /// A conditional write found the object changed since it was observed.
    #[error("{operation} => {status}; {path}; {message}")]
    PreconditionFailed {
        operation: Operation,
        path: String,
        status: u16,
        message: String,
    },

    /// Any other service fault.
    #[error("{operation} => {status}; {path}; {message}")]
    Transfer {
        operation: Operation,
        path: String,
        status: u16,
        code: String,
        message: String,
    },

    /// A bounded wait timed out or was interrupted. The cause is the source.
    #[error("{action}: {path}")]
    Wait {
        action: Action,
        path: String,
        #[source]
        source: WaitError,
    },

    /// A client-side failure with no service status.
    #[error("{action}: {path}")]
    Io {
        action: Action,
        path: String,
        #[source]
        source: TransportError,
    },

    /// The named operation is not part of this channel's contract.
    #[error("{0} is not supported by this channel")]
    Unsupported(&'static str),

    /// Read on a channel opened without `READ`.
    #[error("channel was not opened for reading")]
    NotReadable,

    /// Write on a channel opened without `WRITE` or `APPEND`.
    #[error("channel was not opened for writing")]
    NotWritable,

    /// The channel was used after `close`.
    #[error("channel is closed")]
    Closed,

    /// Local I/O on the scratch file failed.
    #[error("scratch file error: {0}")]
    Scratch(#[from] io::Error),

    /// An open option or configured algorithm name was rejected.
    #[error(transparent)]
    InvalidOption(#[from] OptionError),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// A failure of one store operation, before translation.
#[derive(Debug)]
pub enum Failure {
    Wait(WaitError),
    Transport(TransportError),
}

impl From<WaitError> for Failure {
    fn from(err: WaitError) -> Self {
        Self::Wait(err)
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl ChannelError {
    /// Map a failed store operation on `object` to a channel error.
    ///
    /// A 404 is only `NotFound` for reads; a 404 on `PutObject` means the
    /// bucket vanished and is reported as a transfer fault.
    pub fn translate(operation: Operation, object: &ObjectRef, failure: impl Into<Failure>) -> Self {
        let path = object.to_string();
        let action = Action::from(operation);
        match failure.into() {
            Failure::Wait(source) => Self::Wait { action, path, source },
            Failure::Transport(TransportError::Service(fault)) => {
                if fault.is_not_found() && operation != Operation::PutObject {
                    Self::NotFound { path }
                } else if fault.is_precondition_failed() {
                    Self::PreconditionFailed {
                        operation,
                        path,
                        status: fault.status,
                        message: fault.message,
                    }
                } else if fault.is_conflict() {
                    Self::AlreadyExists { path }
                } else {
                    Self::Transfer {
                        operation,
                        path,
                        status: fault.status,
                        code: fault.code,
                        message: fault.message,
                    }
                }
            }
            Failure::Transport(source) => Self::Io { action, path, source },
        }
    }

    /// `true` for [`ChannelError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when a wait was interrupted by the cancellation token.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Wait { source: WaitError::Interrupted, .. })
    }

    /// `true` when a wait limit elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Wait { source: WaitError::TimedOut(_), .. })
    }

    /// Service status code, when the store answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PreconditionFailed { status, .. } | Self::Transfer { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        // `Interrupted` is retried by `write_all` and `read_exact`, so a
        // cancelled wait must not use it.
        let kind = match &err {
            ChannelError::NotFound { .. } => io::ErrorKind::NotFound,
            ChannelError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            ChannelError::Wait { source: WaitError::TimedOut(_), .. } => io::ErrorKind::TimedOut,
            ChannelError::Unsupported(_)
            | ChannelError::NotReadable
            | ChannelError::NotWritable => io::ErrorKind::Unsupported,
            ChannelError::InvalidOption(_) | ChannelError::Config(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        match err {
            ChannelError::Scratch(inner) => inner,
            err => io::Error::new(kind, err),
        }
    }
}
