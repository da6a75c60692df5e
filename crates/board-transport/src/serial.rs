//! Native serial transport over tokio-serial
//!
//! `SerialDiscovery` enumerates OS serial ports and keeps only names
//! that look like USB CDC or ACM devices, which is where hobbyist
//! boards show up on every supported platform.

use crate::transport::{BoxTransport, DeviceDiscovery, Transport, TransportError};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Read buffer size per chunk. Device responses are short lines; 1 KiB
/// absorbs bursts without churning allocations.
const READ_BUF_SIZE: usize = 1024;

/// A serial port opened for a session
pub struct SerialTransport {
    stream: SerialStream,
}

impl SerialTransport {
    /// Open `path` at the given baud rate (8N1, no flow control)
    pub fn open(path: &str, baud: u32) -> Result<Self, TransportError> {
        let stream = tokio_serial::new(path, baud)
            .open_native_async()
            .map_err(|e| TransportError::OpenFailed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { stream })
    }
}

impl Transport for SerialTransport {
    fn read_chunk(&mut self) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        async move {
            let mut buf = vec![0u8; READ_BUF_SIZE];
            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if n == 0 {
                // EOF means the device went away
                return Err(TransportError::Closed);
            }
            buf.truncate(n);
            Ok(buf)
        }
        .boxed()
    }

    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.stream
                .write_all(data)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            self.stream
                .flush()
                .await
                .map_err(|e| TransportError::Io(e.to_string()))
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.stream
                .shutdown()
                .await
                .map_err(|e| TransportError::Io(e.to_string()))
        }
        .boxed()
    }
}

/// Discovers USB serial devices via OS port enumeration
#[derive(Debug, Default)]
pub struct SerialDiscovery;

impl SerialDiscovery {
    pub fn new() -> Self {
        Self
    }
}

/// Does this port name look like a USB serial device?
fn is_usb_serial(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("usb") || lower.contains("acm")
}

impl DeviceDiscovery for SerialDiscovery {
    fn list_candidates(&mut self) -> BoxFuture<'_, Result<Vec<String>, TransportError>> {
        async move {
            let ports =
                tokio_serial::available_ports().map_err(|e| TransportError::Io(e.to_string()))?;
            let mut candidates: Vec<String> = ports
                .into_iter()
                .map(|p| p.port_name)
                .filter(|name| is_usb_serial(name))
                .collect();
            // Stable order so retries walk the same sequence
            candidates.sort();
            Ok(candidates)
        }
        .boxed()
    }

    fn open<'a>(
        &'a mut self,
        endpoint: &'a str,
        baud: u32,
    ) -> BoxFuture<'a, Result<BoxTransport, TransportError>> {
        async move {
            let transport = SerialTransport::open(endpoint, baud)?;
            Ok(Box::new(transport) as BoxTransport)
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_serial_name_filter() {
        assert!(is_usb_serial("/dev/ttyUSB0"));
        assert!(is_usb_serial("/dev/ttyACM1"));
        assert!(is_usb_serial("/dev/cu.usbmodem14101"));
        assert!(is_usb_serial("COM3-USB")); // Windows bridge names vary
        assert!(!is_usb_serial("/dev/ttyS0"));
        assert!(!is_usb_serial("/dev/console"));
    }
}
