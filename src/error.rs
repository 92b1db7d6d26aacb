//! Error types for the client session core.
//!
//! This module defines the error type used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use rcswitch_client::{Result, transport::LineSocket};
//!
//! async fn example() -> Result<()> {
//!     let socket = LineSocket::open("10.0.0.5".parse().unwrap(), 4999).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Transport | [`Error::ConnectTimeout`], [`Error::Io`] |
//! | Encoding | [`Error::Json`] |
//!
//! The public session surface rarely surfaces these: connection and read
//! failures are consumed inside the session and resolve to an ordinary
//! `Disconnected` state transition, and outbound write failures are dropped
//! by policy. The variants below are what the transport and codec layers can
//! produce for direct users of those layers.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connecting to the hub did not complete within the deadline.
    ///
    /// Returned when the TCP connect does not finish in time.
    #[error("Connect timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error from the underlying socket.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error from the payload codec.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on a fresh connection attempt.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Io(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
