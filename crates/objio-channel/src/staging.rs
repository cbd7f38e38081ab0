//! Channel that stages an object in a local scratch file.
//!
//! Open downloads the object (or a range of it) into a scratch file. Reads,
//! writes and seeks are then plain local file I/O. `close` uploads the whole
//! scratch file back to the store and deletes it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use objio_transport::WriteGuard;
use objio_types::{ChecksumAlgorithm, ObjectRef, OpenOptions, StandardOption};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{ChannelError, ChannelResult};
use crate::transfer::TransferManager;

/// Access granted on the scratch file by `READ`, `WRITE` and `APPEND`.
///
/// `APPEND` implies write access. With neither `WRITE` nor `APPEND` the
/// channel is readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AccessMode {
    read: bool,
    write: bool,
    append: bool,
}

impl AccessMode {
    fn from_options(options: &OpenOptions) -> Self {
        let append = options.append();
        let write = append || options.contains(StandardOption::Write);
        Self {
            read: options.contains(StandardOption::Read) || !write,
            write,
            append,
        }
    }
}

pub struct StagingChannel {
    object: ObjectRef,
    transfers: TransferManager,
    checksum: ChecksumAlgorithm,
    mode: AccessMode,
    /// `Some` while the channel is open.
    scratch: Option<NamedTempFile>,
    guard: Option<WriteGuard>,
    track_digest: bool,
    /// Digest of the content last known to be stored remotely.
    stored_digest: Option<blake3::Hash>,
}

impl StagingChannel {
    /// Open a staging channel on `object`.
    ///
    /// The integrity-check algorithm is validated and `CREATE_NEW` is
    /// checked before any scratch file exists. A failure after the scratch
    /// file is created removes it before returning.
    ///
    /// A channel opened without write access never uploads.
    pub fn open(
        object: ObjectRef,
        transfers: TransferManager,
        options: &OpenOptions,
    ) -> ChannelResult<Self> {
        let context = transfers.context();
        let checksum = context.checksum_algorithm(options)?;
        let mode = AccessMode::from_options(options);

        if options.create_new() && context.probe(&object)?.is_some() {
            return Err(ChannelError::AlreadyExists {
                path: object.to_string(),
            });
        }

        let mut scratch = context.config().scratch_file(&object)?;

        let mut existing = None;
        if !options.create_new() {
            match transfers.download(&object, options.range(), scratch.as_file_mut()) {
                Ok(download) => existing = Some(download),
                Err(ChannelError::NotFound { .. }) if options.may_create() => {
                    debug!(object = %object, "object missing, staging empty content");
                }
                Err(err) => return Err(err),
            }
        }

        let guard = if options.prevent_concurrent_overwrite() {
            match &existing {
                None => Some(WriteGuard::IfNoneMatch),
                Some(download) => match &download.etag {
                    Some(etag) => Some(WriteGuard::IfMatch(etag.clone())),
                    None => {
                        warn!(object = %object, "store returned no etag, upload will be unguarded");
                        None
                    }
                },
            }
        } else {
            None
        };

        let track_digest = options.put_only_if_modified();
        let stored_digest = match &existing {
            Some(_) if track_digest => Some(digest_file(scratch.path())?),
            _ => None,
        };

        if mode.append {
            scratch.as_file_mut().seek(SeekFrom::End(0))?;
        }

        debug!(
            object = %object,
            existed = existing.is_some(),
            bytes = existing.as_ref().map_or(0, |d| d.bytes),
            guarded = guard.is_some(),
            writable = mode.write,
            "staging channel opened"
        );
        Ok(Self {
            object,
            transfers,
            checksum,
            mode,
            scratch: Some(scratch),
            guard,
            track_digest,
            stored_digest,
        })
    }

    /// The object this channel stages.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// `false` once `close` has been called.
    pub fn is_open(&self) -> bool {
        self.scratch.is_some()
    }

    // ---------------------------------------------------------------
    // Local I/O
    // ---------------------------------------------------------------

    fn file(&mut self) -> ChannelResult<&mut File> {
        self.scratch
            .as_mut()
            .map(NamedTempFile::as_file_mut)
            .ok_or(ChannelError::Closed)
    }

    /// Read from the scratch file at the cursor.
    pub fn read(&mut self, buf: &mut [u8]) -> ChannelResult<usize> {
        let read = self.mode.read;
        let file = self.file()?;
        if !read {
            return Err(ChannelError::NotReadable);
        }
        Ok(file.read(buf)?)
    }

    /// Write to the scratch file at the cursor, or at the end in `APPEND`
    /// mode.
    pub fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        let mode = self.mode;
        let file = self.file()?;
        if !mode.write {
            return Err(ChannelError::NotWritable);
        }
        if mode.append {
            file.seek(SeekFrom::End(0))?;
        }
        Ok(file.write(buf)?)
    }

    /// Cursor position in the staged content.
    pub fn position(&mut self) -> ChannelResult<u64> {
        Ok(self.file()?.stream_position()?)
    }

    /// Move the cursor. Positions past the end are allowed; a later write
    /// fills the gap with zeros.
    pub fn set_position(&mut self, position: u64) -> ChannelResult<()> {
        self.file()?.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Current size of the staged content.
    pub fn size(&self) -> ChannelResult<u64> {
        let scratch = self.scratch.as_ref().ok_or(ChannelError::Closed)?;
        Ok(scratch.as_file().metadata()?.len())
    }

    /// Always fails: truncation is not offered by staging channels.
    pub fn truncate(&mut self, _size: u64) -> ChannelResult<()> {
        Err(ChannelError::Unsupported("truncate"))
    }

    // ---------------------------------------------------------------
    // Publishing
    // ---------------------------------------------------------------

    /// Upload the staged content without closing.
    pub fn force(&mut self) -> ChannelResult<()> {
        let scratch = self.scratch.as_ref().ok_or(ChannelError::Closed)?;
        let path = scratch.path().to_path_buf();
        self.publish(&path)
    }

    /// Upload the staged content and delete the scratch file.
    ///
    /// The channel is closed and the scratch file gone even when the upload
    /// fails. Closing a closed channel does nothing.
    pub fn close(&mut self) -> ChannelResult<()> {
        let Some(scratch) = self.scratch.take() else {
            return Ok(());
        };
        let result = self.publish(scratch.path());
        if let Err(err) = scratch.close() {
            warn!(object = %self.object, error = %err, "failed to remove scratch file");
        }
        debug!(object = %self.object, ok = result.is_ok(), "staging channel closed");
        result
    }

    fn publish(&mut self, path: &Path) -> ChannelResult<()> {
        if !self.mode.write {
            debug!(object = %self.object, "read-only channel, nothing to upload");
            return Ok(());
        }
        let digest = if self.track_digest {
            Some(digest_file(path)?)
        } else {
            None
        };
        if digest.is_some() && digest == self.stored_digest {
            debug!(object = %self.object, "content unchanged, skipping upload");
            return Ok(());
        }

        let output = self
            .transfers
            .upload(path, &self.object, self.guard.as_ref(), self.checksum)?;

        if self.guard.is_some() {
            self.guard = output.etag.map(WriteGuard::IfMatch);
            if self.guard.is_none() {
                warn!(object = %self.object, "store returned no etag, later uploads will be unguarded");
            }
        }
        self.stored_digest = digest;
        Ok(())
    }
}

impl Drop for StagingChannel {
    fn drop(&mut self) {
        if self.scratch.is_some() {
            debug!(object = %self.object, "staging channel dropped without close, changes discarded");
        }
    }
}

impl std::fmt::Debug for StagingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingChannel")
            .field("object", &self.object)
            .field("open", &self.is_open())
            .field("checksum", &self.checksum)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl Read for StagingChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        StagingChannel::read(self, buf).map_err(io::Error::from)
    }
}

impl Write for StagingChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        StagingChannel::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file().map_err(io::Error::from)?.flush()
    }
}

impl Seek for StagingChannel {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file().map_err(io::Error::from)?.seek(pos)
    }
}

fn digest_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hasher.finalize())
}
