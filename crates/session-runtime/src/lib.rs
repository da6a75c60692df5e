//! # Session Runtime
//!
//! Actor infrastructure for the board session system: the `Actor`
//! trait with its run loop, the message enums and channel plumbing,
//! logging macros, and cancellable delay timers.
//!
//! ## Message Flow
//!
//! ```text
//! Session handle → SessionMessage → SessionActor → PortMessage → port task
//!                                        ↓
//!                                  SessionEvent → application
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod channels;
pub mod logging;
pub mod timers;

pub use actor::Actor;
pub use channels::{PortMessage, SessionChannels, SessionHandles, SessionMessage};
pub use timers::{spawn_delay, DelayHandle};
