//! File-like channels over a whole-object store.
//!
//! The store only understands whole-object GET and PUT plus a metadata
//! probe. This crate turns that into blocking, seekable channels:
//!
//! - [`StagingChannel`] -- stages the object in a local scratch file,
//!   allows arbitrary local reads, writes and seeks, and re-uploads the whole
//!   file on close
//! - [`AppendingChannel`] -- never materializes content; each write is one
//!   PUT at the tracked write offset
//!
//! Both block the calling thread on the asynchronous [`ObjectTransport`]
//! through a [`Waiter`], bounded by the tiers in [`TimeoutConfig`], and
//! report every failure as a [`ChannelError`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use objio_channel::{ChannelConfig, ChannelContext, StagingChannel, TransferManager, Waiter};
//! use objio_transport::InMemoryTransport;
//! use objio_types::{ObjectRef, OpenOption, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let store = Arc::new(InMemoryTransport::new().with_bucket("bucket"));
//! let context = ChannelContext::new(store, Waiter::new(runtime.handle().clone()), ChannelConfig::default());
//!
//! let options = OpenOptions::from_options([OpenOption::CREATE, OpenOption::WRITE])?;
//! let mut channel = StagingChannel::open(ObjectRef::new("bucket", "notes.txt"), TransferManager::new(context), &options)?;
//! channel.write(b"hello")?;
//! channel.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ObjectTransport`]: objio_transport::ObjectTransport

pub mod append;
pub mod config;
pub mod context;
pub mod error;
pub mod staging;
pub mod transfer;
pub mod wait;

pub use append::AppendingChannel;
pub use config::{ChannelConfig, TimeoutConfig, WaitLimit};
pub use context::ChannelContext;
pub use error::{Action, ChannelError, ChannelResult, Failure};
pub use staging::StagingChannel;
pub use transfer::{Download, TransferManager};
pub use wait::{WaitError, Waiter};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use objio_transport::InMemoryTransport;
    use objio_types::ObjectRef;
    use tempfile::TempDir;

    use crate::{ChannelConfig, ChannelContext, TransferManager, Waiter};

    pub const BUCKET: &str = "test-bucket";

    /// A multi-thread runtime, an in-memory store with one bucket, and a
    /// context whose scratch files land in a private directory.
    pub struct Harness {
        pub store: Arc<InMemoryTransport>,
        pub context: ChannelContext,
        scratch: TempDir,
        _runtime: tokio::runtime::Runtime,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(ChannelConfig::default())
        }

        pub fn with_config(mut config: ChannelConfig) -> Self {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            let scratch = tempfile::tempdir().unwrap();
            if config.scratch_dir.is_none() {
                config.scratch_dir = Some(scratch.path().to_path_buf());
            }
            let store = Arc::new(InMemoryTransport::new().with_bucket(BUCKET));
            let context = ChannelContext::new(
                store.clone(),
                Waiter::new(runtime.handle().clone()),
                config,
            );
            Self {
                store,
                context,
                scratch,
                _runtime: runtime,
            }
        }

        pub fn object(&self, key: &str) -> ObjectRef {
            ObjectRef::new(BUCKET, key)
        }

        pub fn transfers(&self) -> TransferManager {
            TransferManager::new(self.context.clone())
        }

        /// Files currently in the scratch directory.
        pub fn scratch_entries(&self) -> usize {
            std::fs::read_dir(self.scratch.path()).unwrap().count()
        }
    }
}
