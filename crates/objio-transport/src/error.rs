use thiserror::Error;

/// A failure reported by the object store itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceFault {
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Store error code, e.g. `NoSuchKey`.
    pub code: String,
    /// Server-supplied message.
    pub message: String,
}

impl ServiceFault {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn no_such_key() -> Self {
        Self::new(404, "NoSuchKey", "The specified key does not exist.")
    }

    pub fn no_such_bucket() -> Self {
        Self::new(404, "NoSuchBucket", "The specified bucket does not exist")
    }

    pub fn precondition_failed() -> Self {
        Self::new(
            412,
            "PreconditionFailed",
            "At least one of the pre-conditions you specified did not hold",
        )
    }

    /// The object (or its bucket) does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// A conditional-write guard did not hold.
    pub fn is_precondition_failed(&self) -> bool {
        self.status == 412
    }

    /// A conflicting create raced this request.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

/// Errors from transport requests.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The store answered with an error status.
    #[error("service error {}: {} ({})", .0.status, .0.message, .0.code)]
    Service(ServiceFault),

    /// The client failed before or without a classified store response.
    #[error("client error: {0}")]
    Client(String),
}

impl TransportError {
    /// The service fault, if the store reported one.
    pub fn service_fault(&self) -> Option<&ServiceFault> {
        match self {
            Self::Service(fault) => Some(fault),
            Self::Client(_) => None,
        }
    }
}

impl From<ServiceFault> for TransportError {
    fn from(fault: ServiceFault) -> Self {
        Self::Service(fault)
    }
}

/// Result alias for transport requests.
pub type TransportResult<T> = Result<T, TransportError>;
