use serde::{Deserialize, Serialize};

/// Events from the session to the application
///
/// Delivered in the order the session observed them; `Ready` is
/// guaranteed to fire at most once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A transport was opened on the named endpoint
    Connected { endpoint: String },

    /// First data observed from the device; writes now go direct
    Ready,

    /// One complete line received from the device (delimiter preserved)
    Data { bytes: Vec<u8> },

    /// Error occurred (discovery failure, lost transport, handler error)
    Error { message: String },

    /// Transport handle released; no further events follow
    Closed,
}
