//! Outbound payload delivery.
//!
//! The write worker serializes queued payloads and hands them to whichever
//! session was most recently established. Delivery is best effort: with no
//! session, a still-connecting session, or a sink that has already failed,
//! the payload is dropped and logged, never an error.
//!
//! The connection snapshot is taken per payload, so a payload queued during
//! one session never leaks into the next.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::protocol::Payload;
use crate::transport::LineSink;

use super::sequencer::LatestConnection;

// ============================================================================
// OutboundWrite
// ============================================================================

/// One serialized payload paired with the sink snapshot it was gated on.
pub(crate) struct OutboundWrite {
    line: String,
    sink: Option<LineSink>,
}

impl OutboundWrite {
    /// Pairs a wire line with the current connection snapshot.
    pub(crate) fn new(line: String, latest: &LatestConnection) -> Self {
        let sink = match latest {
            LatestConnection::Connected(sink) => Some(sink.clone()),
            LatestConnection::Disconnected | LatestConnection::Connecting => None,
        };

        Self { line, sink }
    }

    /// `true` when an established, still-healthy sink is attached.
    pub(crate) fn is_valid(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.has_failed())
    }

    /// Queues the line on the attached sink, if any.
    pub(crate) fn dispatch(self) {
        if let Some(sink) = self.sink {
            sink.write_line(self.line);
        }
    }
}

// ============================================================================
// Write worker task
// ============================================================================

/// Runs the write worker until shutdown or until the session handle goes away.
pub(crate) async fn run(
    mut send_rx: mpsc::UnboundedReceiver<Payload>,
    latest_rx: watch::Receiver<LatestConnection>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            payload = send_rx.recv() => {
                let Some(payload) = payload else {
                    debug!("Send channel closed");
                    break;
                };
                handle_payload(payload, &latest_rx);
            }

            _ = shutdown_rx.wait_for(|stop| *stop) => {
                debug!("Shutdown requested");
                break;
            }
        }
    }

    debug!("Write worker terminated");
}

/// Serializes one payload and dispatches it through the current session.
fn handle_payload(payload: Payload, latest_rx: &watch::Receiver<LatestConnection>) {
    let line = match payload.serialize() {
        Ok(line) => line,
        Err(e) => {
            debug!(key = %payload.key, error = %e, "Dropping unserializable payload");
            return;
        }
    };

    let write = {
        let latest = latest_rx.borrow();
        OutboundWrite::new(line, &latest)
    };

    if write.is_valid() {
        trace!(key = %payload.key, "Payload written");
        write.dispatch();
    } else {
        debug!(key = %payload.key, "Dropping payload without a connected session");
    }
}

// ============================================================================
// Tests
// ============================================================================
