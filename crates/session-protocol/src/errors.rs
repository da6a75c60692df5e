//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest user action when possible
//!
//! Examples:
//! - ✅ "No serial device opened after trying 3 candidates. Check cabling and permissions."
//! - ❌ "Not found" (lacks context and action)

use thiserror::Error;

/// Unified error type for session operations
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// State transition was rejected
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Session received an unexpected message in current state
    #[error("Unexpected message in state {state}: {message}")]
    UnexpectedMessage { state: String, message: String },

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// No candidate endpoint could be opened
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Pin number does not fit the two-digit wire field
    #[error("Pin {0} out of range: pins must be 0-99")]
    InvalidPin(u8),

    /// Value does not fit the three-digit wire field
    #[error("Value {0} out of range: values must be 0-999")]
    InvalidValue(u16),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SessionError {
    fn from(s: String) -> Self {
        SessionError::Other(s)
    }
}

impl From<&str> for SessionError {
    fn from(s: &str) -> Self {
        SessionError::Other(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::InvalidTransition("Disconnected → Ready".into());
        assert_eq!(
            err.to_string(),
            "Invalid state transition: Disconnected → Ready"
        );
    }

    #[test]
    fn test_error_from_string() {
        let err: SessionError = "Test error".into();
        match err {
            SessionError::Other(msg) => assert_eq!(msg, "Test error"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_invalid_pin_message_names_range() {
        let err = SessionError::InvalidPin(100);
        assert!(err.to_string().contains("0-99"));
    }

    #[test]
    fn test_unexpected_message_error() {
        let err = SessionError::UnexpectedMessage {
            state: "Closed".into(),
            message: "Connect".into(),
        };
        assert!(err.to_string().contains("Unexpected message in state Closed"));
    }
}
