//! RC Switch Control client - hub session management library.
//!
//! This library manages a client session against an RC Switch Control hub:
//! a single line-framed TCP connection carrying JSON commands out and raw
//! response lines back, with observable connection state.
//!
//! # Architecture
//!
//! The session follows a unidirectional data flow:
//!
//! - **Inputs**: connect requests, outbound payloads, and context changes
//!   enter through [`ClientSession::submit`] and never block
//! - **Workers**: a sequencer runs one TCP attempt at a time, a reducer
//!   folds events into [`ClientState`], a write worker delivers payloads
//! - **Outputs**: state lands in a watch cell; status transitions and
//!   server lines go out through a [`BroadcastSink`]
//!
//! Key design principles:
//!
//! - One connection attempt at a time; newer targets overwrite queued ones
//! - Writes are fire-and-forget and silently dropped without a session
//! - State observers always see the latest state, deduplicated
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use rcswitch_client::{ClientSession, Input, Payload, ServiceTarget, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = ClientSession::builder().build();
//!     let mut state = session.state();
//!
//!     // Connect to a hub found via service discovery
//!     session.submit(Input::Connect(ServiceTarget::new(
//!         "Kitchen",
//!         IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
//!         4999,
//!     )));
//!
//!     // Fire a command once the session is up
//!     if state.wait_for(|s| s.status == Status::Connected).await.is_ok() {
//!         session.submit(Input::Send(
//!             Payload::new("SwitchProtocol").with_action("toggle"),
//!         ));
//!     }
//!
//!     session.stop().await;
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`broadcast`] | Outward notification seam |
//! | [`discovery`] | Discovered service targets |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Outbound payload types |
//! | [`session`] | Session handle and worker orchestration |
//! | [`state`] | Observable session state |
//! | [`transport`] | Line-framed TCP transport (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Outward notification seam.
///
/// Implement [`BroadcastSink`] to receive status transitions and server
/// response lines as they happen.
pub mod broadcast;

/// Discovered service targets.
///
/// A [`ServiceTarget`] names a hub found via service discovery.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Outbound payload types.
///
/// Commands travel to the hub as single-line JSON [`Payload`]s.
pub mod protocol;

/// Session handle and worker orchestration.
///
/// Use [`ClientSession::builder()`] to create a configured session.
pub mod session;

/// Observable session state.
///
/// The session folds everything that happens into a [`ClientState`].
pub mod state;

/// Line-framed TCP transport layer.
///
/// Internal module handling the socket and its detached writer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{ClientSession, Input, SessionBuilder};

// State types
pub use state::{ClientState, Mutation, Status};

// Discovery types
pub use discovery::ServiceTarget;

// Protocol types
pub use protocol::Payload;

// Broadcast types
pub use broadcast::{BroadcastSink, NoBroadcast};

// Error types
pub use error::{Error, Result};
