//! Line-oriented TCP transport layer.
//!
//! This module handles communication between the client (Rust) and the
//! RC Switch Control hub over a plain TCP socket with newline-delimited
//! messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  Hub             │
//! │                 │       TCP, line-framed       │  (RC Switch     │
//! │  LineSocket ────│◄────────────────────────────►│   Control)      │
//! │  LineSink       │       host:port              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `LineSocket::open` - Connect to a discovered hub with a deadline
//! 2. `LineSocket::sink` - Hand out write handles for outbound commands
//! 3. `LineSocket::read_line` - Receive server lines until goodbye or EOF
//! 4. `LineSocket::close` - Close the session (also happens on drop)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | Line-framed TCP socket and write handle |

// ============================================================================
// Submodules
// ============================================================================

/// Line-framed TCP socket and write handle.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::{LineSink, LineSocket, SERVER_GOODBYE};
