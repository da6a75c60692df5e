//! Scripted transport doubles for exercising session logic without
//! hardware. A `MockTransport` reads whatever the test feeds it and
//! records every write; `MockDiscovery` scripts the candidate walk.

use crate::transport::{BoxTransport, DeviceDiscovery, Transport, TransportError};
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use futures::FutureExt;
use futures_channel::mpsc;
use std::sync::{Arc, Mutex};

/// Shared log of everything a MockTransport was asked to write
pub type WriteLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// Test-side controls for one MockTransport
#[derive(Clone)]
pub struct MockTransportHandle {
    inbound_tx: mpsc::Sender<Vec<u8>>,
    writes: WriteLog,
    closed: Arc<Mutex<bool>>,
}

impl MockTransportHandle {
    /// Script one inbound line (newline appended)
    pub fn feed_line(&mut self, line: &[u8]) {
        let mut data = line.to_vec();
        data.push(b'\n');
        let _ = self.inbound_tx.try_send(data);
    }

    /// Script a raw inbound chunk, exactly as given
    pub fn feed_raw(&mut self, chunk: &[u8]) {
        let _ = self.inbound_tx.try_send(chunk.to_vec());
    }

    /// Everything written so far, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Writes rendered as strings, for wire-format assertions
    pub fn written_strings(&self) -> Vec<String> {
        self.written()
            .into_iter()
            .map(|w| String::from_utf8_lossy(&w).into_owned())
            .collect()
    }

    /// Has the session released the transport?
    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

/// In-memory transport driven by a test script
pub struct MockTransport {
    inbound: mpsc::Receiver<Vec<u8>>,
    writes: WriteLog,
    closed: Arc<Mutex<bool>>,
}

impl MockTransport {
    /// Returns the transport plus the handle for scripting it
    pub fn new() -> (Self, MockTransportHandle) {
        let (inbound_tx, inbound) = mpsc::channel(64);
        let writes: WriteLog = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));

        let handle = MockTransportHandle {
            inbound_tx,
            writes: writes.clone(),
            closed: closed.clone(),
        };

        (
            Self {
                inbound,
                writes,
                closed,
            },
            handle,
        )
    }
}

impl Transport for MockTransport {
    fn read_chunk(&mut self) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        async move {
            match self.inbound.next().await {
                Some(bytes) => Ok(bytes),
                // Script side dropped: behave like an unplugged device
                None => Err(TransportError::Closed),
            }
        }
        .boxed()
    }

    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            if let Ok(mut writes) = self.writes.lock() {
                writes.push(data.to_vec());
            }
            Ok(())
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            if let Ok(mut closed) = self.closed.lock() {
                *closed = true;
            }
            self.inbound.close();
            Ok(())
        }
        .boxed()
    }
}

/// Log of (endpoint, baud) pairs passed to `open`
pub type OpenLog = Arc<Mutex<Vec<(String, u32)>>>;

/// Scripted discovery: candidates in a fixed order, some of which open
#[derive(Default)]
pub struct MockDiscovery {
    candidates: Vec<String>,
    ports: Vec<(String, MockTransport)>,
    open_log: OpenLog,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate that enumerates but fails to open
    pub fn add_dead_candidate(&mut self, endpoint: &str) {
        self.candidates.push(endpoint.to_string());
    }

    /// Candidate backed by a scripted transport; returns its handle
    pub fn add_working_candidate(&mut self, endpoint: &str) -> MockTransportHandle {
        let (transport, handle) = MockTransport::new();
        self.candidates.push(endpoint.to_string());
        self.ports.push((endpoint.to_string(), transport));
        handle
    }

    /// Shared view of every `open` attempt, in order
    pub fn open_log(&self) -> OpenLog {
        self.open_log.clone()
    }
}

impl DeviceDiscovery for MockDiscovery {
    fn list_candidates(&mut self) -> BoxFuture<'_, Result<Vec<String>, TransportError>> {
        async move { Ok(self.candidates.clone()) }.boxed()
    }

    fn open<'a>(
        &'a mut self,
        endpoint: &'a str,
        baud: u32,
    ) -> BoxFuture<'a, Result<BoxTransport, TransportError>> {
        async move {
            if let Ok(mut log) = self.open_log.lock() {
                log.push((endpoint.to_string(), baud));
            }
            if let Some(pos) = self.ports.iter().position(|(e, _)| e == endpoint) {
                let (_, transport) = self.ports.remove(pos);
                Ok(Box::new(transport) as BoxTransport)
            } else {
                Err(TransportError::OpenFailed {
                    endpoint: endpoint.to_string(),
                    reason: "device did not respond".into(),
                })
            }
        }
        .boxed()
    }
}
