//! Client session orchestration.
//!
//! This module wires the session's three worker tasks together and exposes
//! the public [`ClientSession`] handle.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                ClientSession                 │
//!                 └──────┬───────────────┬───────────────┬───────┘
//!        Connect (watch) │  Send (mpsc)  │   mutations   │ (mpsc)
//!                        ▼               ▼               ▼
//!                 ┌───────────┐   ┌────────────┐   ┌──────────┐
//!                 │ sequencer │   │   write    │   │ reducer  │
//!                 │  (1 TCP   │   │  worker    │   │ (state   │
//!                 │  attempt  │   │            │   │  fold)   │
//!                 │  at a     │   │            │   │          │
//!                 │  time)    │   │            │   │          │
//!                 └─────┬─────┘   └─────┬──────┘   └────┬─────┘
//!                       │ events        │ lines         │ state (watch)
//!                       │ (mpsc)        ▼               ▼
//!                       │          LineSocket      BroadcastSink
//!                       └──────────────► reducer
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session handle, inputs, builder |
//! | `sequencer` | One-at-a-time connection attempts |
//! | `reducer` | State fold and outward broadcasts |
//! | `write` | Outbound payload delivery |

// ============================================================================
// Submodules
// ============================================================================

/// Session handle, inputs, builder.
pub mod core;

mod reducer;
mod sequencer;
mod write;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{ClientSession, Input, SessionBuilder};
