//! # Board Session
//!
//! The session layer: owns the connection lifecycle from "port not yet
//! found" through "device ready", encodes pin commands onto the wire,
//! and buffers writes until the device has proven it is listening.
//!
//! ## Components
//!
//! - **SessionActor**: FSM actor driving discovery, handshake, and
//!   write gating
//! - **Session**: cloneable command handle (`digital_write`,
//!   `set_pin_mode`, ...)
//! - **WriteBuffer**: FIFO for commands issued before the device is
//!   ready
//! - **port**: spawned task that exclusively owns the transport

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod constants;
pub mod handle;
mod port;
pub mod session_actor;
pub mod write_buffer;

pub use handle::{Session, SessionOptions};
pub use session_actor::SessionActor;
pub use write_buffer::WriteBuffer;
