//! In-process deferred scheduler.
//!
//! Sleeps on the tokio timer and hands each due request back over an
//! unbounded channel. Pending requests are lost if the process exits, so
//! hosts with a durable job facility should implement
//! [`DeferredScheduler`] on top of that instead.

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{DeferredScheduler, HostError, RestoreRequest};

/// Non-durable [`DeferredScheduler`] running on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct InProcessScheduler {
    due_tx: mpsc::UnboundedSender<RestoreRequest>,
}

impl InProcessScheduler {
    /// Creates the scheduler and the receiver on which due requests arrive.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RestoreRequest>) {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        (Self { due_tx }, due_rx)
    }
}

impl DeferredScheduler for InProcessScheduler {
    fn schedule(&self, request: RestoreRequest) -> Result<(), HostError> {
        let handle = Handle::try_current().map_err(|_| HostError::SchedulerUnavailable)?;
        if self.due_tx.is_closed() {
            return Err(HostError::ScheduleRejected(
                "restore receiver was dropped".to_string(),
            ));
        }

        let due_tx = self.due_tx.clone();
        handle.spawn(async move {
            tokio::time::sleep(request.delay).await;
            debug!(id = %request.id, tier = %request.tier, "Deferred restore is due");
            if due_tx.send(request).is_err() {
                warn!(id = %request.id, "Restore receiver dropped before delivery");
            }
        });
        Ok(())
    }
}
