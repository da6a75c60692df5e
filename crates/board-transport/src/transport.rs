use futures::future::BoxFuture;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Failed to open {endpoint}: {reason}")]
    OpenFailed { endpoint: String, reason: String },
    #[error("Not connected")]
    NotConnected,
    #[error("Transport closed")]
    Closed,
}

/// A generic async byte-stream transport (serial port, scripted mock)
///
/// Methods return boxed futures so the trait stays object-safe; the
/// session owns its transport as a `Box<dyn Transport>` and the port
/// task is the only caller of these methods.
pub trait Transport: Send + 'static {
    /// Read the next chunk of bytes
    ///
    /// Returns at least one byte on success. `Err(Closed)` means the
    /// peer went away and the transport should be released.
    fn read_chunk(&mut self) -> BoxFuture<'_, Result<Vec<u8>, TransportError>>;

    /// Write all of `data` to the transport
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Close the transport and release the underlying handle
    fn close(&mut self) -> BoxFuture<'_, Result<(), TransportError>>;
}

/// Owned transport trait object
pub type BoxTransport = Box<dyn Transport>;

/// Capability for enumerating and opening candidate devices
///
/// The session tries candidates in the order returned; the first
/// endpoint that opens wins. Implementations decide what counts as a
/// candidate (USB serial ports in production, scripted entries in
/// tests).
pub trait DeviceDiscovery: Send + 'static {
    /// Candidate endpoints, in the order they should be tried
    fn list_candidates(&mut self) -> BoxFuture<'_, Result<Vec<String>, TransportError>>;

    /// Open one endpoint at the given baud rate
    fn open<'a>(
        &'a mut self,
        endpoint: &'a str,
        baud: u32,
    ) -> BoxFuture<'a, Result<BoxTransport, TransportError>>;
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_message_names_endpoint() {
        let err = TransportError::OpenFailed {
            endpoint: "/dev/ttyACM0".into(),
            reason: "Permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyACM0"));
        assert!(msg.contains("Permission denied"));
    }
}
