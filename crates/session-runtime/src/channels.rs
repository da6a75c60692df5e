use futures_channel::mpsc;
use session_protocol::SessionEvent;

/// Messages processed by the session actor
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Begin device discovery and open the first usable candidate
    Connect,

    /// Encoded 7-character payload from the command API (unframed)
    Write { payload: String },

    /// One complete line from the port task
    Inbound { bytes: Vec<u8> },

    /// Post-connect settle delay elapsed; run the handshake
    HandshakeDue,

    /// Spacing delay elapsed; send the second identify ping
    IdentifyDue,

    /// Shutdown grace period elapsed; release the transport
    CloseDue,

    /// Port task has released the transport
    PortClosed,

    /// Orderly shutdown requested
    Shutdown,
}

/// Messages processed by the port task
#[derive(Debug, Clone)]
pub enum PortMessage {
    /// Raw bytes to write to the transport
    Write { data: Vec<u8> },

    /// Close the transport and stop the task
    Close,
}

/// Receiving ends handed to the spawned session actor
pub struct SessionHandles {
    pub session_rx: mpsc::Receiver<SessionMessage>,
    pub event_tx: mpsc::Sender<SessionEvent>,
}

/// Channel plumbing kept by the caller side
///
/// Holds the session sender (cloneable) and the event receiver. The
/// receiver should be taken exactly once with `take_event_receiver`.
pub struct SessionChannels {
    session_tx: mpsc::Sender<SessionMessage>,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl SessionChannels {
    /// Create the channel pair for one session
    ///
    /// Capacities:
    /// - session: 256 - commands and control messages (low frequency;
    ///   encoded commands are 7 bytes, so even a burst is tiny)
    /// - event: 1024 - data lines at 115200 baud arrive well under
    ///   1000/s, so this absorbs seconds of consumer lag
    pub fn new() -> (Self, SessionHandles) {
        let (session_tx, session_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::channel(1024);

        let handles = SessionHandles {
            session_rx,
            event_tx,
        };

        let channels = Self {
            session_tx,
            event_rx,
        };

        (channels, handles)
    }

    /// Clone the session sender (for the handle or for timer tasks)
    pub fn session_sender(&self) -> mpsc::Sender<SessionMessage> {
        self.session_tx.clone()
    }

    /// Take ownership of the event receiver
    ///
    /// The receiver should only be taken once; later calls return a
    /// disconnected receiver that never yields events.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SessionEvent> {
        let (_dummy_tx, dummy_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, dummy_rx)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use futures::stream::StreamExt;

    #[tokio::test]
    async fn test_session_channel_routing() {
        let (channels, mut handles) = SessionChannels::new();

        channels
            .session_sender()
            .try_send(SessionMessage::Write {
                payload: "0103255".into(),
            })
            .unwrap();

        let msg = handles.session_rx.next().await.unwrap();
        match msg {
            SessionMessage::Write { payload } => assert_eq!(payload, "0103255"),
            _ => panic!("Wrong message type"),
        }
    }

    #[tokio::test]
    async fn test_event_receiver_take_once() {
        let (mut channels, mut handles) = SessionChannels::new();

        handles.event_tx.try_send(SessionEvent::Ready).ok();
        drop(handles);

        let mut event_rx = channels.take_event_receiver();
        match event_rx.next().await.unwrap() {
            SessionEvent::Ready => {}
            _ => panic!("Wrong event type"),
        }

        // Second take yields a disconnected receiver
        let mut second = channels.take_event_receiver();
        assert!(second.next().await.is_none());
    }
}
