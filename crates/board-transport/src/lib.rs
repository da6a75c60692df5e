//! # Board Transport
//!
//! Byte-stream transport abstraction for board sessions, plus the
//! device discovery capability used to find candidate endpoints.
//!
//! Production code uses [`serial::SerialTransport`] over a USB serial
//! port; tests use the scripted [`mock::MockTransport`].

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod lines;
pub mod mock;
pub mod serial;
pub mod transport;

pub use lines::LineSplitter;
pub use serial::{SerialDiscovery, SerialTransport};
pub use transport::{BoxTransport, DeviceDiscovery, Transport, TransportError};
