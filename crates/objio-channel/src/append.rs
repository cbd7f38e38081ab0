//! Write-forward channel that appends straight to the remote object.
//!
//! Nothing is buffered locally. Every `write` is one PUT at the tracked
//! write offset, and the offset advances to the size the store reports.

use std::io::{self, Write};

use bytes::Bytes;
use objio_transport::{Operation, PutObjectRequest};
use objio_types::{ObjectRef, OpenOptions};
use tracing::{debug, warn};

use crate::context::ChannelContext;
use crate::error::{ChannelError, ChannelResult};

#[derive(Debug)]
pub struct AppendingChannel {
    object: ObjectRef,
    context: ChannelContext,
    open: bool,
    write_offset: u64,
}

impl AppendingChannel {
    /// Probe `object` and open a channel positioned at its current end.
    ///
    /// A missing object is only created, by the first write, when the
    /// options allow it. The integrity-check algorithm is validated before
    /// the probe.
    pub fn open(object: ObjectRef, context: ChannelContext, options: &OpenOptions) -> ChannelResult<Self> {
        context.checksum_algorithm(options)?;
        let write_offset = match context.probe(&object)? {
            Some(_) if options.create_new() => {
                return Err(ChannelError::AlreadyExists {
                    path: object.to_string(),
                })
            }
            Some(head) => head.content_length,
            None if options.may_create() => 0,
            None => {
                return Err(ChannelError::NotFound {
                    path: object.to_string(),
                })
            }
        };
        debug!(object = %object, offset = write_offset, "appending channel opened");
        Ok(Self {
            object,
            context,
            open: true,
            write_offset,
        })
    }

    /// The object appended to.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// `false` once `close` has been called.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Bytes the remote object is known to hold.
    pub fn size(&self) -> u64 {
        self.write_offset
    }

    /// Append `buf` with a single PUT at the current write offset.
    ///
    /// On failure the channel stays open and the offset is unchanged. A
    /// reported size below the current offset is treated like a missing
    /// one, so the offset never decreases.
    pub fn write(&mut self, buf: &[u8]) -> ChannelResult<usize> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        let request = PutObjectRequest::new(self.object.clone(), Bytes::copy_from_slice(buf))
            .with_write_offset(self.write_offset);
        let output = self.context.request(
            Operation::PutObject,
            &self.object,
            self.context.timeouts().bulk_upload,
            self.context.transport().put(request),
        )?;

        let written = buf.len() as u64;
        let fallback = self.write_offset + written;
        self.write_offset = match output.size {
            Some(size) if size >= self.write_offset => size,
            Some(size) => {
                warn!(
                    object = %self.object,
                    offset = self.write_offset,
                    reported = size,
                    "store reported a size below the write offset, counting written bytes instead"
                );
                fallback
            }
            None => fallback,
        };
        debug!(object = %self.object, bytes = written, offset = self.write_offset, "appended");
        Ok(buf.len())
    }

    /// Always fails: the channel is write-forward only.
    pub fn read(&mut self, _buf: &mut [u8]) -> ChannelResult<usize> {
        Err(ChannelError::Unsupported("read"))
    }

    /// Always fails: there is no cursor.
    pub fn position(&self) -> ChannelResult<u64> {
        Err(ChannelError::Unsupported("position"))
    }

    /// Always fails: there is no cursor.
    pub fn set_position(&mut self, _position: u64) -> ChannelResult<()> {
        Err(ChannelError::Unsupported("position"))
    }

    /// Always fails: remote content is never shortened.
    pub fn truncate(&mut self, _size: u64) -> ChannelResult<()> {
        Err(ChannelError::Unsupported("truncate"))
    }

    /// Mark the channel closed. Nothing is buffered, so there is no I/O.
    pub fn close(&mut self) -> ChannelResult<()> {
        if self.open {
            self.open = false;
            debug!(object = %self.object, offset = self.write_offset, "appending channel closed");
        }
        Ok(())
    }
}

impl Write for AppendingChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AppendingChannel::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
