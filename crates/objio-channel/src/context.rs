use std::fmt;
use std::future::Future;
use std::sync::Arc;

use objio_transport::{ObjectHead, ObjectTransport, Operation, TransportResult};
use objio_types::{ChecksumAlgorithm, ObjectRef, OpenOptions};
use tracing::debug;

use crate::config::{ChannelConfig, TimeoutConfig, WaitLimit};
use crate::error::{ChannelError, ChannelResult};
use crate::wait::Waiter;

/// Everything a channel needs to talk to the store: the transport, a
/// waiter bound to the runtime driving it, and the resolved configuration.
///
/// Cloning is cheap and clones share the transport and the interrupt token.
#[derive(Clone)]
pub struct ChannelContext {
    transport: Arc<dyn ObjectTransport>,
    waiter: Waiter,
    config: ChannelConfig,
}

impl ChannelContext {
    pub fn new(transport: Arc<dyn ObjectTransport>, waiter: Waiter, config: ChannelConfig) -> Self {
        Self {
            transport,
            waiter,
            config,
        }
    }

    pub fn transport(&self) -> &Arc<dyn ObjectTransport> {
        &self.transport
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.config.timeouts
    }

    /// Block on one store request and translate its failure.
    pub(crate) fn request<T, F>(
        &self,
        operation: Operation,
        object: &ObjectRef,
        limit: WaitLimit,
        future: F,
    ) -> ChannelResult<T>
    where
        F: Future<Output = TransportResult<T>>,
    {
        match self.waiter.wait(limit, future) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(ChannelError::translate(operation, object, err)),
            Err(err) => Err(ChannelError::translate(operation, object, err)),
        }
    }

    /// Probe `object`, bounded by the probe tier. A missing object is
    /// `Ok(None)`.
    pub fn probe(&self, object: &ObjectRef) -> ChannelResult<Option<ObjectHead>> {
        let result = self.request(
            Operation::HeadObject,
            object,
            self.config.timeouts.probe,
            self.transport.probe(object),
        );
        match result {
            Ok(head) => {
                debug!(object = %object, size = head.content_length, "probe found object");
                Ok(Some(head))
            }
            Err(ChannelError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Algorithm for bulk uploads: the open option when given, otherwise
    /// the configured one.
    pub(crate) fn checksum_algorithm(&self, options: &OpenOptions) -> ChannelResult<ChecksumAlgorithm> {
        match options.integrity_check() {
            Some(algorithm) => Ok(algorithm),
            None => Ok(self.config.checksum_algorithm()?),
        }
    }
}

impl fmt::Debug for ChannelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelContext")
            .field("waiter", &self.waiter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
