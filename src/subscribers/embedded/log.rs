//! # LogWriter - forwards runtime events to `tracing`.
//!
//! A minimal subscriber that turns every [`Event`] into one structured `tracing` record.
//! Install any `tracing` subscriber (e.g. `tracing-subscriber`'s `fmt`) to see the output.
//!
//! ## Levels
//! - `debug`: operation started / completed
//! - `info`: cancellations (superseded, lifecycle, cancelled), registry shutdown
//! - `warn`: rejected / evicted operations, subscriber overflow
//! - `error`: operation or subscriber panics
//!
//! ## Example output
//! ```text
//! DEBUG taskreactor: started owner=owner#1 key=search op=op#3
//!  INFO taskreactor: superseded owner=owner#1 key=search op=op#3
//!  INFO taskreactor: cancelled owner=owner#1 key=search op=op#3
//!  INFO taskreactor: lifecycle-cancelled owner=owner#2 key=unique-1 op=op#4
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "taskreactor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let owner = e.owner.map(|o| o.to_string()).unwrap_or_default();
        let key = e.key.as_deref().unwrap_or("-");
        let op = e.op.map(|o| o.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::OperationStarted => {
                debug!(target: TARGET, seq = e.seq, %owner, key, %op, "started");
            }
            EventKind::OperationCompleted => {
                debug!(target: TARGET, seq = e.seq, %owner, key, %op, "completed");
            }
            EventKind::OperationCancelled => {
                info!(target: TARGET, seq = e.seq, %owner, key, %op, "cancelled");
            }
            EventKind::OperationSuperseded => {
                info!(target: TARGET, seq = e.seq, %owner, key, %op, "superseded");
            }
            EventKind::LifecycleCancelled => {
                info!(target: TARGET, seq = e.seq, %owner, key, %op, "lifecycle-cancelled");
            }
            EventKind::RegistryShutdown => {
                info!(target: TARGET, seq = e.seq, reason, "registry-shutdown");
            }
            EventKind::OperationRejected => {
                warn!(target: TARGET, seq = e.seq, %owner, key, %op, "rejected");
            }
            EventKind::OperationEvicted => {
                warn!(target: TARGET, seq = e.seq, %owner, key, %op, "evicted");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, reason, "subscriber-overflow");
            }
            EventKind::OperationPanicked => {
                error!(target: TARGET, seq = e.seq, %owner, key, %op, reason, "panicked");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, reason, "subscriber-panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
