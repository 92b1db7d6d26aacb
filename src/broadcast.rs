//! Outward notification seam for session events.
//!
//! The session reducer pushes two kinds of notifications as side effects of
//! the state fold: connection status transitions and raw server response
//! lines. Embedders implement [`BroadcastSink`] to route these into their
//! own notification system (system broadcasts, an event bus, a test
//! recorder). [`NoBroadcast`] is the default and discards everything.

// ============================================================================
// Imports
// ============================================================================

use crate::state::Status;

// ============================================================================
// BroadcastSink
// ============================================================================

/// Receives session notifications as they happen.
///
/// Implementations must be cheap and non-blocking: calls are made from the
/// session's reducer task, and a slow sink stalls state propagation.
///
/// # Example
///
/// ```
/// use rcswitch_client::{BroadcastSink, Status};
///
/// struct PrintSink;
///
/// impl BroadcastSink for PrintSink {
///     fn connection_status(&self, status: Status) {
///         println!("status: {status:?}");
///     }
///
///     fn server_response(&self, line: &str) {
///         println!("server: {line}");
///     }
/// }
/// ```
pub trait BroadcastSink: Send + Sync {
    /// Called once per connection status transition, deduplicated.
    fn connection_status(&self, status: Status);

    /// Called once per line received from the server, in arrival order.
    fn server_response(&self, line: &str);
}

// ============================================================================
// NoBroadcast
// ============================================================================

/// A [`BroadcastSink`] that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBroadcast;

impl BroadcastSink for NoBroadcast {
    #[inline]
    fn connection_status(&self, _status: Status) {}

    #[inline]
    fn server_response(&self, _line: &str) {}
}
