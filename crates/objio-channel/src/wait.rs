//! Bounded, interruptible blocking waits on asynchronous store operations.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::WaitLimit;

/// Why a blocking wait ended without an output.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum WaitError {
    /// The wait limit elapsed first.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    /// The cancellation token fired.
    #[error("interrupted while waiting")]
    Interrupted,
    /// The caller is itself running inside a tokio runtime and cannot block.
    #[error("cannot block on the store from inside an async runtime")]
    InsideRuntime,
}

/// Blocks the calling thread on a future driven by a tokio runtime.
///
/// The runtime must be multi-threaded: a current-thread runtime does not
/// drive timers or I/O for `Handle::block_on`. The calling thread must not
/// belong to any tokio runtime; [`Waiter::wait`] refuses with
/// [`WaitError::InsideRuntime`] there.
///
/// Cancelling the token interrupts every pending and future wait of every
/// waiter sharing it. The token is never reset, so an interrupted caller
/// can still observe its interrupted state afterwards.
#[derive(Clone, Debug)]
pub struct Waiter {
    handle: Handle,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(handle: Handle) -> Self {
        Self::with_cancellation(handle, CancellationToken::new())
    }

    pub fn with_cancellation(handle: Handle, cancel: CancellationToken) -> Self {
        Self { handle, cancel }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block until `future` resolves, `limit` elapses, or the waiter is
    /// interrupted. An unresolved future is dropped on timeout or interrupt.
    pub fn wait<F: Future>(&self, limit: WaitLimit, future: F) -> Result<F::Output, WaitError> {
        if Handle::try_current().is_ok() {
            return Err(WaitError::InsideRuntime);
        }
        self.handle.block_on(async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(WaitError::Interrupted),
                output = bounded(limit, future) => output,
            }
        })
    }
}

async fn bounded<F: Future>(limit: WaitLimit, future: F) -> Result<F::Output, WaitError> {
    match limit {
        WaitLimit::Unbounded => Ok(future.await),
        WaitLimit::Bounded(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| WaitError::TimedOut(limit)),
    }
}
