//! Observable session state and the mutation unit that changes it.
//!
//! [`ClientState`] is the authoritative value consumers observe. It is never
//! mutated in place: the session folds [`Mutation`] functions over the
//! current value, and every fold step produces a fresh state. The fold loop
//! itself lives in `session::reducer`; this module only defines the value
//! types.
//!
//! # State machine
//!
//! ```text
//!              ┌──────────────┐
//!      ┌──────►│ Disconnected │◄──────┐
//!      │       └──────┬───────┘       │
//!      │              │ Connect       │
//!      │       ┌──────▼───────┐       │
//!      │       │  Connecting  ├───────┤  open failed
//!      │       └──────┬───────┘       │
//!      │              │ open ok       │
//!      │       ┌──────▼───────┐       │
//!      └───────┤  Connected   ├───────┘  sentinel / read error / stop
//!              └──────────────┘
//! ```
//!
//! `status` never moves from `Disconnected` straight to `Connected`; a
//! `Connecting` value is always published first.

// ============================================================================
// Status
// ============================================================================

/// Connection status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No live connection and none being established.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A connection to the hub is established.
    Connected,
}

// ============================================================================
// ClientState
// ============================================================================

/// The observable state of one client session.
///
/// Invariant: `service_name` is `Some` only while `status` is
/// [`Status::Connecting`] or [`Status::Connected`]. Mutations produced by the
/// session set both fields together, so the invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    /// Current connection status.
    pub status: Status,

    /// Name of the hub service this session targets, while one is targeted.
    pub service_name: Option<String>,

    /// Whether the host application is currently backgrounded.
    pub in_background: bool,

    /// Whether the session has been stopped by the host.
    pub is_stopped: bool,
}

impl Default for ClientState {
    /// The state every session starts from: disconnected, no service,
    /// backgrounded, not stopped.
    fn default() -> Self {
        Self {
            status: Status::Disconnected,
            service_name: None,
            in_background: true,
            is_stopped: false,
        }
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// A single unit of state change: a pure function from the current state to
/// the next one.
///
/// Mutations are produced by the session's input routing and connection
/// lifecycle, sent over a channel, and consumed by exactly one fold step.
///
/// # Example
///
/// ```
/// use rcswitch_client::{ClientState, Mutation};
///
/// let mutation: Mutation = Box::new(|state| ClientState {
///     in_background: false,
///     ..state
/// });
///
/// let next = mutation(ClientState::default());
/// assert!(!next.in_background);
/// ```
pub type Mutation = Box<dyn FnOnce(ClientState) -> ClientState + Send>;

// ============================================================================
// Tests
// ============================================================================
