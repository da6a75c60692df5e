//! Cloneable application-facing handle for one board session
//!
//! `Session::start` spawns the session actor, kicks off discovery, and
//! hands back the handle plus the event receiver. The handle's methods
//! validate pin commands up front and enqueue them as messages; the
//! actor decides whether they go straight to the wire or wait in the
//! pending buffer.

use crate::session_actor::SessionActor;
use board_transport::DeviceDiscovery;
use futures_channel::mpsc;
use session_protocol::codec::Command;
use session_protocol::{PinLevel, PinMode, SessionError, SessionEvent};
use session_runtime::{Actor, SessionChannels, SessionMessage};

/// Session tuning knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Ask the device to echo every received command on its data line
    pub debug: bool,
}

/// Handle for issuing commands to a running session
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct Session {
    session_tx: mpsc::Sender<SessionMessage>,
}

impl Session {
    /// Spawn the session actor and begin discovery
    ///
    /// Returns the command handle and the event receiver. Discovery
    /// starts immediately; the outcome arrives as a `Connected` event
    /// or an `Error` event, never as a return value here.
    pub fn start<D: DeviceDiscovery>(
        discovery: D,
        options: SessionOptions,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (mut channels, handles) = SessionChannels::new();
        let session_tx = channels.session_sender();

        let actor = SessionActor::new(
            Box::new(discovery),
            options.debug,
            handles.event_tx.clone(),
            session_tx.clone(),
        );
        tokio::spawn(actor.run(handles.session_rx, handles.event_tx));

        // The actor's mailbox is empty at this point; Connect cannot fail
        // to enqueue.
        let _ = session_tx.clone().try_send(SessionMessage::Connect);

        let handle = Self { session_tx };
        (handle, channels.take_event_receiver())
    }

    /// Configure a pin as input or output
    pub fn set_pin_mode(&self, pin: u8, mode: PinMode) -> Result<(), SessionError> {
        self.send_command(Command::pin_mode(pin, mode)?)
    }

    /// Drive a digital pin high or low
    pub fn digital_write(&self, pin: u8, level: PinLevel) -> Result<(), SessionError> {
        self.send_command(Command::digital_write(pin, level)?)
    }

    /// Request a digital read; the result arrives on the data line
    pub fn digital_read(&self, pin: u8) -> Result<(), SessionError> {
        self.send_command(Command::digital_read(pin)?)
    }

    /// PWM write to an analog-capable pin
    pub fn analog_write(&self, pin: u8, value: u8) -> Result<(), SessionError> {
        self.send_command(Command::analog_write(pin, value)?)
    }

    /// Request an analog read; the result arrives on the data line
    pub fn analog_read(&self, pin: u8) -> Result<(), SessionError> {
        self.send_command(Command::analog_read(pin)?)
    }

    /// Begin the orderly shutdown sequence
    ///
    /// Completion is signaled by the `Closed` event, not by this call
    /// returning.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionMessage::Shutdown)
    }

    fn send_command(&self, command: Command) -> Result<(), SessionError> {
        self.send(SessionMessage::Write {
            payload: command.encode(),
        })
    }

    fn send(&self, msg: SessionMessage) -> Result<(), SessionError> {
        self.session_tx.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                SessionError::ChannelClosed("Session actor has stopped".into())
            } else {
                SessionError::Other("Session mailbox overloaded".into())
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use board_transport::mock::MockDiscovery;
    use futures::stream::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_start_reports_device_not_found() {
        let (_session, mut events) = Session::start(MockDiscovery::new(), SessionOptions::default());

        let event = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        match event {
            SessionEvent::Error { message } => {
                assert!(message.contains("0 candidate(s)"), "got: {}", message);
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_emits_connected_for_working_device() {
        let mut discovery = MockDiscovery::new();
        let _handle = discovery.add_working_candidate("/dev/ttyACM0");

        let (_session, mut events) = Session::start(discovery, SessionOptions::default());

        let event = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        match event {
            SessionEvent::Connected { endpoint } => assert_eq!(endpoint, "/dev/ttyACM0"),
            other => panic!("Expected Connected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_pin_rejected_before_sending() {
        let (session, _events) = Session::start(MockDiscovery::new(), SessionOptions::default());

        match session.digital_write(100, PinLevel::High) {
            Err(SessionError::InvalidPin(100)) => {}
            other => panic!("Expected InvalidPin, got {:?}", other),
        }
        match session.set_pin_mode(255, PinMode::Output) {
            Err(SessionError::InvalidPin(255)) => {}
            other => panic!("Expected InvalidPin, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clone_shares_the_same_actor() {
        let mut discovery = MockDiscovery::new();
        let _handle = discovery.add_working_candidate("/dev/ttyACM0");
        let (session, mut events) = Session::start(discovery, SessionOptions::default());

        let clone = session.clone();
        clone.shutdown().unwrap();

        // Walk events until Closed shows up; the clone's shutdown drove
        // the shared actor.
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.next())
                .await
                .unwrap()
                .unwrap();
            if matches!(event, SessionEvent::Closed) {
                break;
            }
        }
    }
}
