//! Resolved discovery targets.
//!
//! Service discovery itself (mDNS/NSD resolution of a named hub) happens
//! outside this crate. The discovery collaborator hands the session a fully
//! resolved [`ServiceTarget`] triple, and that triple is all the session ever
//! needs to open a connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;

// ============================================================================
// ServiceTarget
// ============================================================================

/// A resolved hub service: the name shown to users plus the socket address
/// the discovery layer resolved it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    /// Human-readable service name, carried through connection state.
    pub service_name: String,

    /// Resolved host address.
    pub host: IpAddr,

    /// Resolved TCP port.
    pub port: u16,
}

impl ServiceTarget {
    /// Creates a new resolved target.
    #[inline]
    #[must_use]
    pub fn new(service_name: impl Into<String>, host: IpAddr, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            host,
            port,
        }
    }
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.service_name, self.host, self.port)
    }
}

// ============================================================================
// Tests
// ============================================================================
