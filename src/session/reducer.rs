//! State fold and outward broadcasts.
//!
//! The reducer is the only writer of session state. Connection events from
//! the sequencer and direct mutations from the session handle both funnel
//! into a single fold over [`ClientState`]; every distinct result is
//! published to the state cell, and distinct status transitions plus server
//! response lines go out through the [`BroadcastSink`].
//!
//! # Deduplication
//!
//! Two layers, mirroring what observers care about:
//!
//! - the state cell only publishes when the folded state actually changed
//! - the broadcaster only hears a status when it differs from the last one
//!   it was told, so a retarget that stays `Connecting` updates the state
//!   cell without a duplicate status notification

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::broadcast::BroadcastSink;
use crate::state::{ClientState, Mutation, Status};

use super::sequencer::SessionEvent;

// ============================================================================
// Reducer
// ============================================================================

/// The fold itself, kept separate from the channel loop.
struct Reducer {
    /// Current folded state.
    state: ClientState,
    /// Last status handed to the broadcaster.
    last_status: Status,
    /// Observable state cell.
    state_tx: watch::Sender<ClientState>,
    /// Outward notification sink.
    broadcaster: Arc<dyn BroadcastSink>,
}

impl Reducer {
    fn new(state_tx: watch::Sender<ClientState>, broadcaster: Arc<dyn BroadcastSink>) -> Self {
        let state = state_tx.borrow().clone();
        let last_status = state.status;

        Self {
            state,
            last_status,
            state_tx,
            broadcaster,
        }
    }

    /// Announces the seed status so observers always hear a first value.
    fn announce_initial(&self) {
        self.broadcaster.connection_status(self.last_status);
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connection(event) => {
                trace!(?event, "Connection event");
                self.apply(event.mutation());
            }
            SessionEvent::Response(line) => {
                trace!(line = %line, "Server response");
                self.broadcaster.server_response(&line);
            }
        }
    }

    fn apply(&mut self, mutation: Mutation) {
        let next = mutation(self.state.clone());

        if next == self.state {
            trace!("Mutation produced no change");
            return;
        }

        self.state = next;
        self.state_tx.send_replace(self.state.clone());

        if self.state.status != self.last_status {
            self.last_status = self.state.status;
            debug!(status = ?self.last_status, "Connection status changed");
            self.broadcaster.connection_status(self.last_status);
        }
    }
}

// ============================================================================
// Reducer task
// ============================================================================

/// Runs the fold until both inbound channels close.
///
/// Buffered messages are drained before a closed channel is acted on, so
/// the final direct mutation sent during stop is always applied.
pub(crate) async fn run(
    mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    mut mutations_rx: mpsc::UnboundedReceiver<Mutation>,
    state_tx: watch::Sender<ClientState>,
    broadcaster: Arc<dyn BroadcastSink>,
) {
    let mut reducer = Reducer::new(state_tx, broadcaster);
    reducer.announce_initial();

    let mut events_open = true;
    let mut mutations_open = true;

    while events_open || mutations_open {
        tokio::select! {
            event = events_rx.recv(), if events_open => {
                match event {
                    Some(event) => reducer.handle_event(event),
                    None => events_open = false,
                }
            }

            mutation = mutations_rx.recv(), if mutations_open => {
                match mutation {
                    Some(mutation) => reducer.apply(mutation),
                    None => mutations_open = false,
                }
            }
        }
    }

    debug!("Reducer terminated");
}

// ============================================================================
// Tests
// ============================================================================
