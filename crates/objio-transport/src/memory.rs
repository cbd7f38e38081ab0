use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use objio_types::ObjectRef;
use tracing::debug;

use crate::error::{ServiceFault, TransportError, TransportResult};
use crate::traits::ObjectTransport;
use crate::types::{
    GetObjectOutput, GetObjectRequest, ObjectHead, Operation, PutObjectOutput, PutObjectRequest,
    WriteGuard,
};

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
}

impl StoredObject {
    fn new(data: Bytes) -> Self {
        let etag = etag_of(&data);
        Self { data, etag }
    }
}

/// Version tag: quoted hex of a BLAKE3 prefix of the content.
fn etag_of(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(&blake3::hash(data).as_bytes()[..16]))
}

/// In-memory, bucketed whole-object store.
///
/// Intended for tests and embedding. Behaves like a remote store that
/// supports write-offset appends and conditional writes. Every request can be
/// delayed by a configurable latency, a one-shot fault can be queued per
/// operation, and completed requests are recorded as `"<Operation> => <status>"`.
pub struct InMemoryTransport {
    buckets: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
    faults: Mutex<HashMap<Operation, VecDeque<TransportError>>>,
    latency: RwLock<Option<Duration>>,
    report_size: AtomicBool,
    size_overrides: Mutex<VecDeque<u64>>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryTransport {
    /// Create a new store with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            latency: RwLock::new(None),
            report_size: AtomicBool::new(true),
            size_overrides: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Builder-style [`create_bucket`](Self::create_bucket).
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.create_bucket(bucket);
        self
    }

    /// Create a bucket. Returns `false` if it already existed.
    pub fn create_bucket(&self, bucket: &str) -> bool {
        let mut buckets = self.buckets.write().expect("lock poisoned");
        if buckets.contains_key(bucket) {
            return false;
        }
        buckets.insert(bucket.to_string(), HashMap::new());
        true
    }

    /// Delete a bucket and everything in it. Returns `true` if it existed.
    pub fn delete_bucket(&self, bucket: &str) -> bool {
        self.buckets
            .write()
            .expect("lock poisoned")
            .remove(bucket)
            .is_some()
    }

    /// Store an object directly, creating its bucket if needed.
    /// Returns the new version tag.
    pub fn insert_object(&self, object: &ObjectRef, data: impl Into<Bytes>) -> String {
        let stored = StoredObject::new(data.into());
        let etag = stored.etag.clone();
        self.buckets
            .write()
            .expect("lock poisoned")
            .entry(object.bucket().to_string())
            .or_default()
            .insert(object.key().to_string(), stored);
        etag
    }

    /// Current content of an object.
    pub fn object_data(&self, object: &ObjectRef) -> Option<Bytes> {
        self.lookup(object).map(|stored| stored.data)
    }

    /// Current version tag of an object.
    pub fn object_etag(&self, object: &ObjectRef) -> Option<String> {
        self.lookup(object).map(|stored| stored.etag)
    }

    /// Remove an object. Returns `true` if it existed.
    pub fn remove_object(&self, object: &ObjectRef) -> bool {
        self.buckets
            .write()
            .expect("lock poisoned")
            .get_mut(object.bucket())
            .and_then(|bucket| bucket.remove(object.key()))
            .is_some()
    }

    /// Whether PUT responses report the resulting object size (default on).
    pub fn set_report_size(&self, report: bool) {
        self.report_size.store(report, Ordering::SeqCst);
    }

    /// Report `size` as the resulting object size of the next successful
    /// PUT, whatever was actually stored.
    pub fn report_next_put_size(&self, size: u64) {
        self.size_overrides.lock().expect("lock poisoned").push_back(size);
    }

    /// Delay every subsequent request by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().expect("lock poisoned") = latency;
    }

    /// Fail the next request of kind `operation` with `error`.
    pub fn fail_next(&self, operation: Operation, error: TransportError) {
        self.faults
            .lock()
            .expect("lock poisoned")
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Requests completed so far, as `"<Operation> => <status>"`.
    pub fn request_log(&self) -> Vec<String> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// Drain the request log.
    pub fn take_request_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.requests.lock().expect("lock poisoned"))
    }

    fn lookup(&self, object: &ObjectRef) -> Option<StoredObject> {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(object.bucket())
            .and_then(|bucket| bucket.get(object.key()))
            .cloned()
    }

    async fn delay(&self) {
        let latency = *self.latency.read().expect("lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_fault(&self, operation: Operation) -> Option<TransportError> {
        self.faults
            .lock()
            .expect("lock poisoned")
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
    }

    fn record<T>(&self, operation: Operation, success_status: u16, result: &TransportResult<T>) {
        let status = match result {
            Ok(_) => success_status,
            Err(TransportError::Service(fault)) => fault.status,
            Err(TransportError::Client(_)) => return,
        };
        debug!(%operation, status, "request completed");
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(format!("{operation} => {status}"));
    }

    fn head_now(&self, object: &ObjectRef) -> TransportResult<ObjectHead> {
        let buckets = self.buckets.read().expect("lock poisoned");
        let bucket = buckets
            .get(object.bucket())
            .ok_or_else(ServiceFault::no_such_bucket)?;
        let stored = bucket
            .get(object.key())
            .ok_or_else(ServiceFault::no_such_key)?;
        Ok(ObjectHead {
            content_length: stored.data.len() as u64,
            etag: Some(stored.etag.clone()),
        })
    }

    fn get_now(&self, request: &GetObjectRequest) -> TransportResult<GetObjectOutput> {
        let buckets = self.buckets.read().expect("lock poisoned");
        let bucket = buckets
            .get(request.object.bucket())
            .ok_or_else(ServiceFault::no_such_bucket)?;
        let stored = bucket
            .get(request.object.key())
            .ok_or_else(ServiceFault::no_such_key)?;

        let Some(range) = request.range else {
            return Ok(GetObjectOutput {
                status: 200,
                body: stored.data.clone(),
                etag: Some(stored.etag.clone()),
            });
        };
        let span = range.clamp(stored.data.len() as u64).ok_or_else(|| {
            ServiceFault::new(416, "InvalidRange", "The requested range is not satisfiable")
        })?;
        Ok(GetObjectOutput {
            status: 206,
            body: stored.data.slice(span.start as usize..span.end as usize),
            etag: Some(stored.etag.clone()),
        })
    }

    fn put_now(&self, request: PutObjectRequest) -> TransportResult<PutObjectOutput> {
        if let Some(checksum) = &request.checksum {
            if !checksum.verify(&request.body) {
                return Err(ServiceFault::new(
                    400,
                    "BadDigest",
                    format!(
                        "The {} you specified did not match the calculated checksum.",
                        checksum.algorithm
                    ),
                )
                .into());
            }
        }

        let mut buckets = self.buckets.write().expect("lock poisoned");
        let bucket = buckets
            .get_mut(request.object.bucket())
            .ok_or_else(ServiceFault::no_such_bucket)?;
        let current = bucket.get(request.object.key());

        match (&request.guard, current) {
            (Some(WriteGuard::IfMatch(expected)), Some(stored)) if &stored.etag != expected => {
                return Err(ServiceFault::precondition_failed().into());
            }
            (Some(WriteGuard::IfMatch(_)), None) => {
                return Err(ServiceFault::no_such_key().into());
            }
            (Some(WriteGuard::IfNoneMatch), Some(_)) => {
                return Err(ServiceFault::precondition_failed().into());
            }
            _ => {}
        }

        let data = match request.write_offset {
            None => request.body,
            Some(offset) => {
                let existing = current.map(|stored| stored.data.clone()).unwrap_or_default();
                if offset != existing.len() as u64 {
                    return Err(ServiceFault::new(
                        400,
                        "InvalidWriteOffset",
                        "The write offset value that you specified does not match the current object size.",
                    )
                    .into());
                }
                let mut joined = BytesMut::with_capacity(existing.len() + request.body.len());
                joined.extend_from_slice(&existing);
                joined.extend_from_slice(&request.body);
                joined.freeze()
            }
        };

        let stored = StoredObject::new(data);
        let size = stored.data.len() as u64;
        let etag = stored.etag.clone();
        bucket.insert(request.object.key().to_string(), stored);

        let reported = self.size_overrides.lock().expect("lock poisoned").pop_front();
        Ok(PutObjectOutput {
            size: reported.or(self.report_size.load(Ordering::SeqCst).then_some(size)),
            etag: Some(etag),
        })
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectTransport for InMemoryTransport {
    async fn probe(&self, object: &ObjectRef) -> TransportResult<ObjectHead> {
        self.delay().await;
        let result = match self.take_fault(Operation::HeadObject) {
            Some(fault) => Err(fault),
            None => self.head_now(object),
        };
        self.record(Operation::HeadObject, 200, &result);
        result
    }

    async fn get(&self, request: GetObjectRequest) -> TransportResult<GetObjectOutput> {
        self.delay().await;
        let result = match self.take_fault(Operation::GetObject) {
            Some(fault) => Err(fault),
            None => self.get_now(&request),
        };
        let status = result.as_ref().map_or(200, |output| output.status);
        self.record(Operation::GetObject, status, &result);
        result
    }

    async fn put(&self, request: PutObjectRequest) -> TransportResult<PutObjectOutput> {
        self.delay().await;
        let result = match self.take_fault(Operation::PutObject) {
            Some(fault) => Err(fault),
            None => self.put_now(request),
        };
        self.record(Operation::PutObject, 200, &result);
        result
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.read().expect("lock poisoned");
        let objects: usize = buckets.values().map(HashMap::len).sum();
        f.debug_struct("InMemoryTransport")
            .field("bucket_count", &buckets.len())
            .field("object_count", &objects)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksum;
    use objio_types::{ByteRange, ChecksumAlgorithm};

    fn object(key: &str) -> ObjectRef {
        ObjectRef::new("bucket", key)
    }

    fn store() -> InMemoryTransport {
        InMemoryTransport::new().with_bucket("bucket")
    }

    fn status_of<T: std::fmt::Debug>(result: TransportResult<T>) -> u16 {
        result.unwrap_err().service_fault().expect("service fault").status
    }

    // -----------------------------------------------------------------------
    // Probe / get
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn probe_reports_length_and_etag() {
        let store = store();
        let etag = store.insert_object(&object("a"), &b"hello"[..]);
        let head = store.probe(&object("a")).await.unwrap();
        assert_eq!(head.content_length, 5);
        assert_eq!(head.etag, Some(etag));
    }

    #[tokio::test]
    async fn probe_missing_key_is_404() {
        let store = store();
        let err = store.probe(&object("missing")).await.unwrap_err();
        assert_eq!(err, TransportError::Service(ServiceFault::no_such_key()));
    }

    #[tokio::test]
    async fn get_full_object_is_200() {
        let store = store();
        store.insert_object(&object("a"), &b"abcdefghi"[..]);
        let output = store.get(GetObjectRequest::new(object("a"))).await.unwrap();
        assert_eq!(output.status, 200);
        assert_eq!(&output.body[..], b"abcdefghi");
    }

    #[tokio::test]
    async fn get_range_is_206() {
        let store = store();
        store.insert_object(&object("a"), &b"abcdefghi"[..]);
        let request =
            GetObjectRequest::new(object("a")).with_range(Some(ByteRange::new(3, 6).unwrap()));
        let output = store.get(request).await.unwrap();
        assert_eq!(output.status, 206);
        assert_eq!(&output.body[..], b"def");
    }

    #[tokio::test]
    async fn get_range_past_end_is_416() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        let request =
            GetObjectRequest::new(object("a")).with_range(Some(ByteRange::from_start(10)));
        assert_eq!(status_of(store.get(request).await), 416);
    }

    #[tokio::test]
    async fn get_from_missing_bucket_is_404() {
        let store = InMemoryTransport::new();
        assert_eq!(status_of(store.get(GetObjectRequest::new(object("a"))).await), 404);
    }

    // -----------------------------------------------------------------------
    // Put
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_replaces_content_and_reports_size() {
        let store = store();
        store.insert_object(&object("a"), &b"old content"[..]);
        let output = store
            .put(PutObjectRequest::new(object("a"), &b"new"[..]))
            .await
            .unwrap();
        assert_eq!(output.size, Some(3));
        assert_eq!(output.etag, store.object_etag(&object("a")));
        assert_eq!(store.object_data(&object("a")).unwrap(), &b"new"[..]);
    }

    #[tokio::test]
    async fn put_into_missing_bucket_is_404_with_bucket_message() {
        let store = InMemoryTransport::new();
        let err = store
            .put(PutObjectRequest::new(object("a"), &b"x"[..]))
            .await
            .unwrap_err();
        let fault = err.service_fault().unwrap();
        assert_eq!(fault.status, 404);
        assert_eq!(fault.message, "The specified bucket does not exist");
    }

    #[tokio::test]
    async fn append_at_matching_offset() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        let output = store
            .put(PutObjectRequest::new(object("a"), &b"def"[..]).with_write_offset(3))
            .await
            .unwrap();
        assert_eq!(output.size, Some(6));
        assert_eq!(store.object_data(&object("a")).unwrap(), &b"abcdef"[..]);
    }

    #[tokio::test]
    async fn append_at_zero_creates_missing_object() {
        let store = store();
        store
            .put(PutObjectRequest::new(object("new"), &b"abc"[..]).with_write_offset(0))
            .await
            .unwrap();
        assert_eq!(store.object_data(&object("new")).unwrap(), &b"abc"[..]);
    }

    #[tokio::test]
    async fn append_at_wrong_offset_is_rejected() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        let result = store
            .put(PutObjectRequest::new(object("a"), &b"def"[..]).with_write_offset(1))
            .await;
        assert_eq!(status_of(result), 400);
        assert_eq!(store.object_data(&object("a")).unwrap(), &b"abc"[..]);
    }

    #[tokio::test]
    async fn size_reporting_can_be_disabled() {
        let store = store();
        store.set_report_size(false);
        let output = store
            .put(PutObjectRequest::new(object("a"), &b"abc"[..]))
            .await
            .unwrap();
        assert_eq!(output.size, None);
    }

    #[tokio::test]
    async fn reported_size_can_be_overridden_once() {
        let store = store();
        store.report_next_put_size(1);
        let output = store
            .put(PutObjectRequest::new(object("a"), &b"abc"[..]))
            .await
            .unwrap();
        assert_eq!(output.size, Some(1));
        assert_eq!(store.object_data(&object("a")).unwrap(), "abc");

        let output = store
            .put(PutObjectRequest::new(object("a"), &b"abcd"[..]))
            .await
            .unwrap();
        assert_eq!(output.size, Some(4));
    }

    #[tokio::test]
    async fn removed_object_is_gone() {
        let store = store();
        store.insert_object(&object("a"), "abc");
        assert!(store.remove_object(&object("a")));
        assert!(!store.remove_object(&object("a")));
        assert!(store.object_data(&object("a")).is_none());
        assert_eq!(status_of(store.probe(&object("a")).await), 404);
    }

    // -----------------------------------------------------------------------
    // Guards and checksums
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn if_match_with_stale_etag_is_412() {
        let store = store();
        let stale = store.insert_object(&object("a"), &b"v1"[..]);
        store.insert_object(&object("a"), &b"v2"[..]);
        let request = PutObjectRequest::new(object("a"), &b"v3"[..])
            .with_guard(Some(WriteGuard::IfMatch(stale)));
        let err = store.put(request).await.unwrap_err();
        assert_eq!(err, TransportError::Service(ServiceFault::precondition_failed()));
        assert_eq!(store.object_data(&object("a")).unwrap(), &b"v2"[..]);
    }

    #[tokio::test]
    async fn if_match_with_current_etag_succeeds() {
        let store = store();
        let current = store.insert_object(&object("a"), &b"v1"[..]);
        let request = PutObjectRequest::new(object("a"), &b"v2"[..])
            .with_guard(Some(WriteGuard::IfMatch(current)));
        store.put(request).await.unwrap();
        assert_eq!(store.object_data(&object("a")).unwrap(), &b"v2"[..]);
    }

    #[tokio::test]
    async fn if_none_match_on_existing_object_is_412() {
        let store = store();
        store.insert_object(&object("a"), &b"v1"[..]);
        let request = PutObjectRequest::new(object("a"), &b"v2"[..])
            .with_guard(Some(WriteGuard::IfNoneMatch));
        assert_eq!(status_of(store.put(request).await), 412);
    }

    #[tokio::test]
    async fn bad_checksum_is_rejected() {
        let store = store();
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc32, b"something else");
        let request =
            PutObjectRequest::new(object("a"), &b"payload"[..]).with_checksum(checksum);
        let err = store.put(request).await.unwrap_err();
        assert_eq!(err.service_fault().unwrap().code, "BadDigest");
        assert!(store.object_data(&object("a")).is_none());
    }

    #[tokio::test]
    async fn good_checksum_is_accepted() {
        let store = store();
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc64Nvme, b"payload");
        let request =
            PutObjectRequest::new(object("a"), &b"payload"[..]).with_checksum(checksum);
        store.put(request).await.unwrap();
    }

    // -----------------------------------------------------------------------
    // Faults, latency and the request log
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        store.fail_next(
            Operation::HeadObject,
            ServiceFault::new(403, "Forbidden", "denied").into(),
        );
        assert_eq!(status_of(store.probe(&object("a")).await), 403);
        assert!(store.probe(&object("a")).await.is_ok());
    }

    #[tokio::test]
    async fn request_log_records_statuses() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        store.probe(&object("a")).await.unwrap();
        let _ = store.probe(&object("missing")).await;
        store
            .get(GetObjectRequest::new(object("a")).with_range(Some(ByteRange::first(2))))
            .await
            .unwrap();
        assert_eq!(
            store.take_request_log(),
            vec!["HeadObject => 200", "HeadObject => 404", "GetObject => 206"]
        );
        assert!(store.request_log().is_empty());
    }

    #[tokio::test]
    async fn latency_delays_requests() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        store.set_latency(Some(Duration::from_millis(30)));
        let started = tokio::time::Instant::now();
        store.probe(&object("a")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn delete_bucket_removes_objects() {
        let store = store();
        store.insert_object(&object("a"), &b"abc"[..]);
        assert!(store.delete_bucket("bucket"));
        assert!(store.object_data(&object("a")).is_none());
        assert!(!store.delete_bucket("bucket"));
    }

    #[test]
    fn debug_format() {
        let store = store();
        store.insert_object(&object("a"), &b"x"[..]);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryTransport"));
        assert!(debug.contains("object_count"));
    }
}
