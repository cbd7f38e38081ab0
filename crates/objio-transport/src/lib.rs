//! Whole-object transport for objio.
//!
//! The remote store natively supports only three requests: a metadata probe,
//! a (possibly ranged) GET of an object, and a PUT of an entire object. This
//! crate models that surface as the asynchronous [`ObjectTransport`] trait so
//! that channel logic never depends on a concrete client.
//!
//! # Backends
//!
//! - [`InMemoryTransport`] -- bucketed in-memory store for tests and embedding,
//!   with latency and fault injection
//!
//! # Rules
//!
//! 1. Every store-reported failure is a [`ServiceFault`] carrying status, code
//!    and message; anything else is [`TransportError::Client`].
//! 2. The transport never retries. A failed request is reported once.
//! 3. Checksums travel with the PUT and are verified by the store.

pub mod checksum;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use checksum::Checksum;
pub use error::{ServiceFault, TransportError, TransportResult};
pub use memory::InMemoryTransport;
pub use traits::ObjectTransport;
pub use types::{
    GetObjectOutput, GetObjectRequest, ObjectHead, Operation, PutObjectOutput, PutObjectRequest,
    WriteGuard,
};
