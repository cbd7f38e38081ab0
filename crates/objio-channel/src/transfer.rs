use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;
use objio_transport::{
    Checksum, GetObjectRequest, Operation, PutObjectOutput, PutObjectRequest, WriteGuard,
};
use objio_types::{ByteRange, ChecksumAlgorithm, ObjectRef};
use tracing::debug;

use crate::context::ChannelContext;
use crate::error::ChannelResult;

/// Result of a bulk download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub bytes: u64,
    pub etag: Option<String>,
    /// The store served a range rather than the whole object.
    pub partial: bool,
}

/// Moves whole objects between the store and local files.
#[derive(Clone, Debug)]
pub struct TransferManager {
    context: ChannelContext,
}

impl TransferManager {
    pub fn new(context: ChannelContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    /// Download `object` (or `range` of it) into `dest`, replacing its
    /// content. The cursor is left at the start of the file.
    pub fn download(
        &self,
        object: &ObjectRef,
        range: Option<ByteRange>,
        dest: &mut File,
    ) -> ChannelResult<Download> {
        let request = GetObjectRequest::new(object.clone()).with_range(range);
        let output = self.context.request(
            Operation::GetObject,
            object,
            self.context.timeouts().bulk_download,
            self.context.transport().get(request),
        )?;

        dest.set_len(0)?;
        dest.seek(SeekFrom::Start(0))?;
        dest.write_all(&output.body)?;
        dest.flush()?;
        dest.seek(SeekFrom::Start(0))?;

        let bytes = output.body.len() as u64;
        debug!(object = %object, bytes, status = output.status, "downloaded");
        Ok(Download {
            bytes,
            etag: output.etag,
            partial: output.status == 206,
        })
    }

    /// Upload the whole of `source` as `object`.
    pub fn upload(
        &self,
        source: &Path,
        object: &ObjectRef,
        guard: Option<&WriteGuard>,
        algorithm: ChecksumAlgorithm,
    ) -> ChannelResult<PutObjectOutput> {
        let body = Bytes::from(std::fs::read(source)?);
        let bytes = body.len();
        let checksum = Checksum::compute(algorithm, &body);
        let request = PutObjectRequest::new(object.clone(), body)
            .with_guard(guard.cloned())
            .with_checksum(checksum);
        let output = self.context.request(
            Operation::PutObject,
            object,
            self.context.timeouts().bulk_upload,
            self.context.transport().put(request),
        )?;
        debug!(object = %object, bytes, %algorithm, guarded = guard.is_some(), "uploaded");
        Ok(output)
    }
}
