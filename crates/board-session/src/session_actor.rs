use crate::constants::{handshake, shutdown, BAUD_RATE};
use crate::port::spawn_port_task;
use crate::write_buffer::WriteBuffer;
use board_transport::DeviceDiscovery;
use futures_channel::mpsc;
use session_protocol::codec::{frame, Command, CLEARING_SEQUENCE};
use session_protocol::{SessionError, SessionEvent, SessionState};
use session_runtime::{
    session_debug, session_info, session_warn, spawn_delay, Actor, DelayHandle, PortMessage,
    SessionMessage,
};
use std::time::Duration;

/// SessionActor manages the connection state machine for one board
///
/// Responsibilities:
/// - Maintain single source of truth for session state
/// - Validate and execute state transitions
/// - Walk discovery candidates and spawn the port task on first open
/// - Gate writes: direct when Ready, buffered otherwise
/// - Drive the post-connect handshake and the shutdown sequence
/// - Emit session events to the application
///
/// ## State Machine
///
/// For the complete transition diagram and invariants, see
/// `session-protocol/src/state.rs` (`SessionState` documentation).
///
/// Key coordination patterns:
/// - **Timer-driven handshake**: Connect → (500ms) → HandshakeDue →
///   clearing bytes, optional debug-on, identify ping → (500ms) →
///   IdentifyDue → second ping
/// - **Event-driven close**: Shutdown → [debug-off, (100ms) →
///   CloseDue] → PortMessage::Close → PortClosed → Closed event
pub struct SessionActor {
    state: SessionState,
    debug: bool,
    discovery: Box<dyn DeviceDiscovery>,
    port_tx: Option<mpsc::Sender<PortMessage>>,
    endpoint: Option<String>,
    pending: WriteBuffer,
    event_tx: mpsc::Sender<SessionEvent>,

    // Channel to send messages to self (for timers)
    session_tx: mpsc::Sender<SessionMessage>,

    // Pending delay handles - auto-cancelled when dropped or replaced
    handshake_timer: Option<DelayHandle>,
    identify_timer: Option<DelayHandle>,
    close_timer: Option<DelayHandle>,
}

impl SessionActor {
    pub fn new(
        discovery: Box<dyn DeviceDiscovery>,
        debug: bool,
        event_tx: mpsc::Sender<SessionEvent>,
        session_tx: mpsc::Sender<SessionMessage>,
    ) -> Self {
        Self {
            state: SessionState::Disconnected,
            debug,
            discovery,
            port_tx: None,
            endpoint: None,
            pending: WriteBuffer::new(),
            event_tx,
            session_tx,
            handshake_timer: None,
            identify_timer: None,
            close_timer: None,
        }
    }

    /// Send a session event to the application (non-critical)
    ///
    /// Failures are logged but don't propagate - a slow consumer must
    /// not take down the FSM.
    fn send_event(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            session_warn!("SessionActor: event dropped: {:?}", e);
        }
    }

    /// Send a CRITICAL message to the port task
    ///
    /// If the channel is closed, the port task has already shut down.
    /// If the channel is full, the system is overloaded. Both cases
    /// propagate as errors.
    fn send_critical_port(&self, msg: PortMessage) -> Result<(), SessionError> {
        let Some(port_tx) = &self.port_tx else {
            return Err(SessionError::Transport(
                "Port task not running - transport already released".into(),
            ));
        };
        port_tx.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                SessionError::ChannelClosed("Port task has shut down".into())
            } else {
                SessionError::Other("Port task channel overloaded".into())
            }
        })
    }

    fn send_raw(&self, data: Vec<u8>) -> Result<(), SessionError> {
        self.send_critical_port(PortMessage::Write { data })
    }

    fn send_framed(&self, payload: &str) -> Result<(), SessionError> {
        self.send_raw(frame(payload).into_bytes())
    }

    /// Attempt to transition to a new state
    fn transition(&mut self, new_state: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(new_state) {
            return Err(SessionError::InvalidTransition(format!(
                "{:?} → {:?}",
                self.state, new_state
            )));
        }
        session_debug!("SessionActor: {:?} → {:?}", self.state, new_state);
        self.state = new_state;
        Ok(())
    }

    fn cancel_handshake_timers(&mut self) {
        // Dropping a DelayHandle cancels its delay
        self.handshake_timer = None;
        self.identify_timer = None;
    }

    async fn handle_connect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Disconnected {
            return Err(SessionError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "Connect".into(),
            });
        }

        let candidates = self
            .discovery
            .list_candidates()
            .await
            .map_err(|e| SessionError::DeviceNotFound(format!("enumeration failed: {}", e)))?;

        for endpoint in &candidates {
            match self.discovery.open(endpoint, BAUD_RATE).await {
                Ok(transport) => {
                    let port_tx = spawn_port_task(transport, self.session_tx.clone());
                    self.port_tx = Some(port_tx);
                    self.endpoint = Some(endpoint.clone());
                    self.transition(SessionState::Connected)?;
                    self.send_event(SessionEvent::Connected {
                        endpoint: endpoint.clone(),
                    });
                    session_info!("SessionActor: opened {} at {} baud", endpoint, BAUD_RATE);

                    self.handshake_timer = Some(spawn_delay(
                        self.session_tx.clone(),
                        SessionMessage::HandshakeDue,
                        Duration::from_millis(handshake::POST_CONNECT_DELAY_MS),
                    ));
                    return Ok(());
                }
                Err(e) => {
                    // Recovered locally; the next candidate may still open
                    session_debug!("SessionActor: candidate {} rejected: {}", endpoint, e);
                }
            }
        }

        Err(SessionError::DeviceNotFound(format!(
            "no serial device opened after trying {} candidate(s). Check cabling and permissions.",
            candidates.len()
        )))
    }

    fn handle_write(&mut self, payload: String) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => self.send_framed(&payload),
            SessionState::Closed => {
                session_warn!("SessionActor: dropping write after close: {}", payload);
                Ok(())
            }
            SessionState::Disconnected | SessionState::Connected => {
                session_debug!("SessionActor: buffering write until ready: {}", payload);
                self.pending.enqueue(payload);
                Ok(())
            }
        }
    }

    fn handle_inbound(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        if !self.state.is_open() {
            // Late reads racing a close are not an error
            return Ok(());
        }

        if self.state == SessionState::Connected {
            self.transition(SessionState::Ready)?;
            self.send_event(SessionEvent::Ready);

            // Flush everything queued before the device came up, in
            // insertion order, ahead of any write that arrives later.
            // Runs synchronously inside this handler so later Write
            // messages cannot interleave.
            for payload in self.pending.drain() {
                self.send_framed(&payload)?;
            }
        }

        self.send_event(SessionEvent::Data { bytes });
        Ok(())
    }

    fn handle_handshake_due(&mut self) -> Result<(), SessionError> {
        self.handshake_timer = None;
        if self.port_tx.is_none() || !self.state.is_open() {
            return Ok(());
        }

        // Unframed zero run: flushes whatever partial input the
        // device-side parser accumulated while the port was opening.
        self.send_raw(CLEARING_SEQUENCE.to_vec())?;

        if self.debug {
            self.send_framed(&Command::debug_toggle(true).encode())?;
        }

        self.send_framed(&Command::identify().encode())?;

        self.identify_timer = Some(spawn_delay(
            self.session_tx.clone(),
            SessionMessage::IdentifyDue,
            Duration::from_millis(handshake::IDENTIFY_SPACING_MS),
        ));

        Ok(())
    }

    fn handle_identify_due(&mut self) -> Result<(), SessionError> {
        self.identify_timer = None;
        if self.port_tx.is_none() || !self.state.is_open() {
            return Ok(());
        }
        self.send_framed(&Command::identify().encode())
    }

    fn handle_shutdown(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            // Idempotent: repeated shutdown is a no-op
            return Ok(());
        }

        self.cancel_handshake_timers();
        self.pending.clear();

        let was_open = self.port_tx.is_some();
        self.transition(SessionState::Closed)?;

        if !was_open {
            // Nothing to release; confirm immediately
            self.send_event(SessionEvent::Closed);
            return Ok(());
        }

        if self.debug {
            // Leave the device with debug echo off; hold the port
            // briefly so the frame drains before release.
            self.send_framed(&Command::debug_toggle(false).encode())?;
            self.close_timer = Some(spawn_delay(
                self.session_tx.clone(),
                SessionMessage::CloseDue,
                Duration::from_millis(shutdown::GRACE_MS),
            ));
        } else {
            self.send_critical_port(PortMessage::Close)?;
        }

        Ok(())
    }

    fn handle_close_due(&mut self) -> Result<(), SessionError> {
        self.close_timer = None;
        if self.port_tx.is_some() {
            self.send_critical_port(PortMessage::Close)?;
        }
        Ok(())
    }

    fn handle_port_closed(&mut self) -> Result<(), SessionError> {
        if self.port_tx.take().is_none() {
            // Already released
            return Ok(());
        }
        self.endpoint = None;

        if self.state != SessionState::Closed {
            // Transport dropped out from under us rather than via shutdown()
            self.send_event(SessionEvent::Error {
                message: "Connection lost: device closed the transport or a write failed".into(),
            });
            self.cancel_handshake_timers();
            self.pending.clear();
            self.transition(SessionState::Closed)?;
        }

        self.send_event(SessionEvent::Closed);
        Ok(())
    }
}

impl Actor for SessionActor {
    type Message = SessionMessage;

    fn name(&self) -> &'static str {
        "SessionActor"
    }

    async fn handle(&mut self, msg: Self::Message) -> Result<(), SessionError> {
        match msg {
            SessionMessage::Connect => self.handle_connect().await,
            SessionMessage::Write { payload } => self.handle_write(payload),
            SessionMessage::Inbound { bytes } => self.handle_inbound(bytes),
            SessionMessage::HandshakeDue => self.handle_handshake_due(),
            SessionMessage::IdentifyDue => self.handle_identify_due(),
            SessionMessage::Shutdown => self.handle_shutdown(),
            SessionMessage::CloseDue => self.handle_close_due(),
            SessionMessage::PortClosed => self.handle_port_closed(),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(port_tx) = self.port_tx.take() {
            let _ = port_tx.clone().try_send(PortMessage::Close);
        }
    }
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
    use board_transport::mock::MockDiscovery;

    fn create_test_actor(
        discovery: MockDiscovery,
        debug: bool,
    ) -> (
        SessionActor,
        mpsc::Receiver<SessionMessage>,
        mpsc::Receiver<SessionEvent>,
    ) {
        let (session_tx, session_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let actor = SessionActor::new(Box::new(discovery), debug, event_tx, session_tx);
        (actor, session_rx, event_rx)
    }

    /// Wire a fake port channel directly, skipping discovery
    fn attach_port(actor: &mut SessionActor) -> mpsc::Receiver<PortMessage> {
        let (port_tx, port_rx) = mpsc::channel(64);
        actor.port_tx = Some(port_tx);
        actor.state = SessionState::Connected;
        actor.endpoint = Some("/dev/ttyACM0".into());
        port_rx
    }

    fn drain_port_writes(port_rx: &mut mpsc::Receiver<PortMessage>) -> Vec<String> {
        let mut writes = Vec::new();
        while let Ok(Some(msg)) = port_rx.try_next() {
            if let PortMessage::Write { data } = msg {
                writes.push(String::from_utf8_lossy(&data).into_owned());
            }
        }
        writes
    }

    fn drain_events(event_rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = event_rx.try_next() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_connect_with_no_candidates_is_device_not_found() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);

        match actor.handle(SessionMessage::Connect).await {
            Err(SessionError::DeviceNotFound(_)) => {}
            other => panic!("Expected DeviceNotFound, got {:?}", other),
        }
        assert_eq!(actor.state, SessionState::Disconnected);
        assert!(drain_events(&mut event_rx).is_empty());
    }

    #[tokio::test]
    async fn test_connect_skips_dead_candidates() {
        let mut discovery = MockDiscovery::new();
        discovery.add_dead_candidate("/dev/ttyUSB0");
        let _handle = discovery.add_working_candidate("/dev/ttyACM0");
        let open_log = discovery.open_log();

        let (mut actor, _session_rx, mut event_rx) = create_test_actor(discovery, false);

        actor.handle(SessionMessage::Connect).await.unwrap();

        assert_eq!(actor.state, SessionState::Connected);
        let events = drain_events(&mut event_rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::Connected { endpoint } => assert_eq!(endpoint, "/dev/ttyACM0"),
            other => panic!("Expected Connected, got {:?}", other),
        }

        // Both candidates tried in order, all at the fixed baud rate
        let log = open_log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("/dev/ttyUSB0".to_string(), 115200),
                ("/dev/ttyACM0".to_string(), 115200)
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_in_connected_state_is_unexpected() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let _port_rx = attach_port(&mut actor);

        match actor.handle(SessionMessage::Connect).await {
            Err(SessionError::UnexpectedMessage { .. }) => {}
            other => panic!("Expected UnexpectedMessage, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writes_buffer_until_ready_then_flush_in_order() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);

        actor
            .handle(SessionMessage::Write {
                payload: "0005001".into(),
            })
            .await
            .unwrap();
        actor
            .handle(SessionMessage::Write {
                payload: "0103255".into(),
            })
            .await
            .unwrap();

        // Nothing reaches the transport while waiting for the device
        assert!(drain_port_writes(&mut port_rx).is_empty());
        assert_eq!(actor.pending.len(), 2);

        actor
            .handle(SessionMessage::Inbound {
                bytes: b"boot\n".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(actor.state, SessionState::Ready);
        assert!(actor.pending.is_empty());
        assert_eq!(
            drain_port_writes(&mut port_rx),
            vec!["!0005001.", "!0103255."]
        );

        let events = drain_events(&mut event_rx);
        assert!(matches!(events[0], SessionEvent::Ready));
        assert!(matches!(events[1], SessionEvent::Data { .. }));

        // Post-ready writes go direct
        actor
            .handle(SessionMessage::Write {
                payload: "0103000".into(),
            })
            .await
            .unwrap();
        assert_eq!(drain_port_writes(&mut port_rx), vec!["!0103000."]);
    }

    #[tokio::test]
    async fn test_ready_fires_exactly_once() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let _port_rx = attach_port(&mut actor);

        for _ in 0..3 {
            actor
                .handle(SessionMessage::Inbound {
                    bytes: b"tick\n".to_vec(),
                })
                .await
                .unwrap();
        }

        let events = drain_events(&mut event_rx);
        let ready_count = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Ready))
            .count();
        let data_count = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Data { .. }))
            .count();
        assert_eq!(ready_count, 1);
        assert_eq!(data_count, 3);
    }

    #[tokio::test]
    async fn test_handshake_sends_clearing_then_ping() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::HandshakeDue).await.unwrap();

        assert_eq!(
            drain_port_writes(&mut port_rx),
            vec!["00000000", "!9000000."]
        );
        assert!(actor.identify_timer.is_some());
    }

    #[tokio::test]
    async fn test_handshake_debug_on_precedes_buffered_flush() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), true);
        let mut port_rx = attach_port(&mut actor);

        // A command issued before the device is ready
        actor
            .handle(SessionMessage::Write {
                payload: "0103255".into(),
            })
            .await
            .unwrap();

        actor.handle(SessionMessage::HandshakeDue).await.unwrap();
        actor
            .handle(SessionMessage::Inbound {
                bytes: b"boot\n".to_vec(),
            })
            .await
            .unwrap();

        let writes = drain_port_writes(&mut port_rx);
        assert_eq!(
            writes,
            vec!["00000000", "!9900001.", "!9000000.", "!0103255."]
        );
    }

    #[tokio::test]
    async fn test_second_identify_ping() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::HandshakeDue).await.unwrap();
        let _ = drain_port_writes(&mut port_rx);

        actor.handle(SessionMessage::IdentifyDue).await.unwrap();
        assert_eq!(drain_port_writes(&mut port_rx), vec!["!9000000."]);
    }

    #[tokio::test]
    async fn test_handshake_after_close_is_a_noop() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);
        actor.state = SessionState::Closed;

        actor.handle(SessionMessage::HandshakeDue).await.unwrap();
        actor.handle(SessionMessage::IdentifyDue).await.unwrap();
        assert!(drain_port_writes(&mut port_rx).is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_without_debug_closes_immediately() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::Shutdown).await.unwrap();

        assert_eq!(actor.state, SessionState::Closed);
        assert!(matches!(
            port_rx.try_next(),
            Ok(Some(PortMessage::Close))
        ));

        // Closed event waits for the port task's confirmation
        assert!(drain_events(&mut event_rx).is_empty());
        actor.handle(SessionMessage::PortClosed).await.unwrap();
        let events = drain_events(&mut event_rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_with_debug_sends_toggle_then_grace_close() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), true);
        let mut port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::Shutdown).await.unwrap();

        // Debug-off frame written, transport not yet released
        assert_eq!(drain_port_writes(&mut port_rx), vec!["!9900000."]);
        assert!(matches!(port_rx.try_next(), Err(_)));
        assert!(actor.close_timer.is_some());

        // Grace elapses; now the port is told to close
        actor.handle(SessionMessage::CloseDue).await.unwrap();
        assert!(matches!(
            port_rx.try_next(),
            Ok(Some(PortMessage::Close))
        ));

        actor.handle(SessionMessage::PortClosed).await.unwrap();
        let events = drain_events(&mut event_rx);
        assert!(matches!(events[0], SessionEvent::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_discards_pending_queue() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let _port_rx = attach_port(&mut actor);

        actor
            .handle(SessionMessage::Write {
                payload: "0103255".into(),
            })
            .await
            .unwrap();
        assert_eq!(actor.pending.len(), 1);

        actor.handle(SessionMessage::Shutdown).await.unwrap();
        assert!(actor.pending.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let _port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::Shutdown).await.unwrap();
        actor.handle(SessionMessage::Shutdown).await.unwrap();
        assert_eq!(actor.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_write_after_close_is_dropped() {
        let (mut actor, _session_rx, _event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let mut port_rx = attach_port(&mut actor);
        actor.handle(SessionMessage::Shutdown).await.unwrap();
        let _ = drain_port_writes(&mut port_rx);

        actor
            .handle(SessionMessage::Write {
                payload: "0103255".into(),
            })
            .await
            .unwrap();
        assert!(actor.pending.is_empty());
        assert!(drain_port_writes(&mut port_rx).is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_port_closed_emits_error_then_closed() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);
        let _port_rx = attach_port(&mut actor);

        actor.handle(SessionMessage::PortClosed).await.unwrap();

        assert_eq!(actor.state, SessionState::Closed);
        let events = drain_events(&mut event_rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Error { .. }));
        assert!(matches!(events[1], SessionEvent::Closed));
    }

    #[tokio::test]
    async fn test_inbound_while_disconnected_is_ignored() {
        let (mut actor, _session_rx, mut event_rx) =
            create_test_actor(MockDiscovery::new(), false);

        actor
            .handle(SessionMessage::Inbound {
                bytes: b"noise\n".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(actor.state, SessionState::Disconnected);
        assert!(drain_events(&mut event_rx).is_empty());
    }
}
