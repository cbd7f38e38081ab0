use async_trait::async_trait;
use objio_types::ObjectRef;

use crate::error::TransportResult;
use crate::types::{GetObjectOutput, GetObjectRequest, ObjectHead, PutObjectOutput, PutObjectRequest};

/// Asynchronous request/response client for a whole-object store.
///
/// Implementations must report store-side failures as
/// [`TransportError::Service`](crate::TransportError::Service) so callers can
/// classify them, and must not retry on their own.
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// Metadata probe (HEAD). A missing object is a 404 service fault.
    async fn probe(&self, object: &ObjectRef) -> TransportResult<ObjectHead>;

    /// Download an object, or the requested byte range of it.
    async fn get(&self, request: GetObjectRequest) -> TransportResult<GetObjectOutput>;

    /// Upload an entire object, or append at `write_offset`.
    async fn put(&self, request: PutObjectRequest) -> TransportResult<PutObjectOutput>;
}
