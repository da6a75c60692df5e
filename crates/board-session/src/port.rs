//! Port task: the single owner of an open transport
//!
//! The session actor never touches the transport directly; it sends
//! `PortMessage`s to this task, which also runs the read loop and
//! forwards completed lines back as `Inbound` messages. When the
//! transport fails or a `Close` arrives, the task releases the handle
//! and confirms with `PortClosed` so the session can finish its
//! teardown (event-driven coordination, no arbitrary waits).

use crate::constants::channel;
use board_transport::{BoxTransport, LineSplitter, TransportError};
use futures::stream::StreamExt;
use futures::{pin_mut, select, FutureExt};
use futures_channel::mpsc;
use session_runtime::{session_debug, session_warn, PortMessage, SessionMessage};

/// Spawn the task that exclusively owns `transport`
///
/// Returns the sender for `PortMessage`s. The task ends after a
/// `Close`, a transport error, or all senders dropping; in every case
/// it closes the transport and sends `PortClosed` exactly once.
pub(crate) fn spawn_port_task(
    transport: BoxTransport,
    session_tx: mpsc::Sender<SessionMessage>,
) -> mpsc::Sender<PortMessage> {
    let (port_tx, port_rx) = mpsc::channel(channel::PORT_CAPACITY);
    tokio::spawn(run_port(transport, port_rx, session_tx));
    port_tx
}

enum PortActivity {
    Read(Result<Vec<u8>, TransportError>),
    Message(Option<PortMessage>),
}

async fn run_port(
    mut transport: BoxTransport,
    mut port_rx: mpsc::Receiver<PortMessage>,
    session_tx: mpsc::Sender<SessionMessage>,
) {
    let mut splitter = LineSplitter::new();

    loop {
        // Scope the read future so the transport borrow ends before a
        // write needs it. An abandoned read_chunk loses nothing: data
        // only materializes when the future completes.
        let activity = {
            let read_fut = transport.read_chunk().fuse();
            pin_mut!(read_fut);
            select! {
                chunk = read_fut => PortActivity::Read(chunk),
                msg = port_rx.next() => PortActivity::Message(msg),
            }
        };

        match activity {
            PortActivity::Read(Ok(bytes)) => {
                for line in splitter.push(&bytes) {
                    let _ = session_tx
                        .clone()
                        .try_send(SessionMessage::Inbound { bytes: line });
                }
            }
            PortActivity::Read(Err(e)) => {
                session_debug!("PortTask: read failed: {}", e);
                break;
            }
            PortActivity::Message(Some(PortMessage::Write { data })) => {
                if let Err(e) = transport.write_all(&data).await {
                    session_warn!("PortTask: write failed: {}", e);
                    break;
                }
            }
            PortActivity::Message(Some(PortMessage::Close))
            | PortActivity::Message(None) => break,
        }
    }

    if let Err(e) = transport.close().await {
        session_debug!("PortTask: close failed: {}", e);
    }
    let _ = session_tx.clone().try_send(SessionMessage::PortClosed);
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use board_transport::mock::MockTransport;
    use std::time::Duration;

    async fn next_session_message(
        rx: &mut mpsc::Receiver<SessionMessage>,
    ) -> SessionMessage {
        tokio::time::timeout(Duration::from_secs(1), rx.next())
            .await
            .expect("timed out waiting for session message")
            .expect("session channel closed")
    }

    #[tokio::test]
    async fn test_inbound_lines_forwarded() {
        let (transport, mut handle) = MockTransport::new();
        let (session_tx, mut session_rx) = mpsc::channel(64);
        let _port_tx = spawn_port_task(Box::new(transport), session_tx);

        handle.feed_line(b"hello");

        match next_session_message(&mut session_rx).await {
            SessionMessage::Inbound { bytes } => assert_eq!(bytes, b"hello\n"),
            other => panic!("Expected Inbound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_lines_reassembled() {
        let (transport, mut handle) = MockTransport::new();
        let (session_tx, mut session_rx) = mpsc::channel(64);
        let _port_tx = spawn_port_task(Box::new(transport), session_tx);

        handle.feed_raw(b"hel");
        handle.feed_raw(b"lo\nwor");
        handle.feed_raw(b"ld\n");

        match next_session_message(&mut session_rx).await {
            SessionMessage::Inbound { bytes } => assert_eq!(bytes, b"hello\n"),
            other => panic!("Expected Inbound, got {:?}", other),
        }
        match next_session_message(&mut session_rx).await {
            SessionMessage::Inbound { bytes } => assert_eq!(bytes, b"world\n"),
            other => panic!("Expected Inbound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writes_reach_transport() {
        let (transport, handle) = MockTransport::new();
        let (session_tx, _session_rx) = mpsc::channel(64);
        let mut port_tx = spawn_port_task(Box::new(transport), session_tx);

        port_tx
            .try_send(PortMessage::Write {
                data: b"!0103255.".to_vec(),
            })
            .unwrap();

        // Give the task a moment to process
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.written_strings(), vec!["!0103255."]);
    }

    #[tokio::test]
    async fn test_close_releases_transport_and_confirms() {
        let (transport, handle) = MockTransport::new();
        let (session_tx, mut session_rx) = mpsc::channel(64);
        let mut port_tx = spawn_port_task(Box::new(transport), session_tx);

        port_tx.try_send(PortMessage::Close).unwrap();

        match next_session_message(&mut session_rx).await {
            SessionMessage::PortClosed => {}
            other => panic!("Expected PortClosed, got {:?}", other),
        }
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_read_failure_ends_task_with_port_closed() {
        let (transport, handle) = MockTransport::new();
        let (session_tx, mut session_rx) = mpsc::channel(64);
        let _port_tx = spawn_port_task(Box::new(transport), session_tx);

        // Dropping the script side makes the next read fail
        drop(handle);

        match next_session_message(&mut session_rx).await {
            SessionMessage::PortClosed => {}
            other => panic!("Expected PortClosed, got {:?}", other),
        }
    }
}
