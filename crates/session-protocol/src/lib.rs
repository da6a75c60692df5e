//! # Session Protocol
//!
//! Type-safe building blocks for the board session system.
//!
//! This crate defines the wire codec, the connection state machine, the
//! events a session emits, and the unified error type. It has no async
//! code and no transport dependencies, making it fully testable in
//! isolation.
//!
//! ## Architecture
//!
//! - **codec**: fixed-width ASCII command encoding and framing
//! - **SessionState**: FSM state machine (pure logic, no side effects)
//! - **SessionEvent**: messages from the session to the application
//! - **SessionError**: unified error type for session operations

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod codec;
pub mod errors;
pub mod events;
pub mod state;

pub use codec::{Command, PinLevel, PinMode};
pub use errors::SessionError;
pub use events::SessionEvent;
pub use state::SessionState;
