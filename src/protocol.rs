//! Outbound payload types and serialization.
//!
//! Hub commands travel as single-line JSON. This module defines the
//! [`Payload`] envelope and its serialization; the concrete command
//! vocabulary (switch, ZigBee, BLE actions) belongs to the protocol plugins
//! that populate these fields, not to this crate.
//!
//! Inbound traffic is deliberately *not* decoded here: server lines are
//! forwarded upward as opaque text for the response channel to interpret.
//!
//! # Wire format
//!
//! ```json
//! {"key":"ZigBeeProtocol","action":"rediscover","data":"..."}
//! ```
//!
//! One payload per line; `serde_json` guarantees the serialized form
//! contains no raw newlines, so the line framing of the transport is safe.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::Result;

// ============================================================================
// Payload
// ============================================================================

/// An outbound command envelope.
///
/// `key` names the protocol handler on the hub that should receive the
/// command; `action` and `data` are interpreted by that handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    /// Routing key naming the hub-side protocol handler.
    pub key: String,

    /// Action for the handler to perform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Action-specific data, already encoded by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Payload {
    /// Creates a payload with only a routing key.
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: None,
            data: None,
        }
    }

    /// Sets the action.
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the action data.
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Serializes the payload to its single-line wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
