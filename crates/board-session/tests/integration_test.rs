//! End-to-end session tests over scripted transports
//!
//! These run the real actor task with real timers, so the handshake and
//! shutdown assertions wait out the actual delays (500ms settle, 100ms
//! grace). Wire traffic is checked against the transport's write log.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use board_session::{Session, SessionOptions};
use board_transport::mock::{MockDiscovery, MockTransportHandle};
use futures::stream::StreamExt;
use futures_channel::mpsc;
use session_protocol::{PinLevel, PinMode, SessionEvent};
use std::time::Duration;

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), events.next())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Poll the transport write log until `predicate` holds or the deadline
/// passes, then return the log as seen last.
async fn wait_for_writes<F>(handle: &MockTransportHandle, predicate: F) -> Vec<String>
where
    F: Fn(&[String]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let writes = handle.written_strings();
        if predicate(&writes) {
            return writes;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("write log never satisfied predicate; saw {:?}", writes);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_no_device_reports_error_without_panicking() {
    let (_session, mut events) = Session::start(MockDiscovery::new(), SessionOptions::default());

    match next_event(&mut events).await {
        SessionEvent::Error { message } => {
            assert!(message.contains("Device not found"), "got: {}", message);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dead_candidates_are_skipped() {
    let mut discovery = MockDiscovery::new();
    discovery.add_dead_candidate("/dev/ttyUSB0");
    discovery.add_dead_candidate("/dev/ttyUSB1");
    let _handle = discovery.add_working_candidate("/dev/ttyACM0");

    let (_session, mut events) = Session::start(discovery, SessionOptions::default());

    match next_event(&mut events).await {
        SessionEvent::Connected { endpoint } => assert_eq!(endpoint, "/dev/ttyACM0"),
        other => panic!("Expected Connected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let mut discovery = MockDiscovery::new();
    let mut handle = discovery.add_working_candidate("/dev/ttyACM0");

    let (session, mut events) = Session::start(discovery, SessionOptions::default());

    match next_event(&mut events).await {
        SessionEvent::Connected { endpoint } => assert_eq!(endpoint, "/dev/ttyACM0"),
        other => panic!("Expected Connected, got {:?}", other),
    }

    // First line from the device promotes the session to Ready
    handle.feed_line(b"board up");
    match next_event(&mut events).await {
        SessionEvent::Ready => {}
        other => panic!("Expected Ready, got {:?}", other),
    }
    match next_event(&mut events).await {
        SessionEvent::Data { bytes } => assert_eq!(bytes, b"board up\n"),
        other => panic!("Expected Data, got {:?}", other),
    }

    // Ready session writes go straight to the wire, framed
    session.digital_write(13, PinLevel::High).unwrap();
    wait_for_writes(&handle, |w| w.contains(&"!0113255.".to_string())).await;

    // The settle delay elapses and the handshake runs: clearing bytes
    // unframed, then a framed identify ping
    let writes = wait_for_writes(&handle, |w| w.contains(&"!9000000.".to_string())).await;
    let clear_pos = writes.iter().position(|w| w == "00000000").unwrap();
    let ping_pos = writes.iter().position(|w| w == "!9000000.").unwrap();
    assert!(clear_pos < ping_pos, "clearing bytes must precede the ping");

    session.shutdown().unwrap();
    loop {
        if matches!(next_event(&mut events).await, SessionEvent::Closed) {
            break;
        }
    }
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_commands_buffer_until_device_speaks() {
    let mut discovery = MockDiscovery::new();
    let mut handle = discovery.add_working_candidate("/dev/ttyACM0");

    let (session, mut events) = Session::start(discovery, SessionOptions::default());

    match next_event(&mut events).await {
        SessionEvent::Connected { .. } => {}
        other => panic!("Expected Connected, got {:?}", other),
    }

    // Issue commands while the device is still silent
    session.set_pin_mode(13, PinMode::Output).unwrap();
    session.digital_write(13, PinLevel::High).unwrap();

    // Nothing framed hits the wire before Ready (the 500ms handshake
    // may run, but it never flushes the pending queue)
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        handle.written_strings().is_empty(),
        "writes leaked before ready: {:?}",
        handle.written_strings()
    );

    handle.feed_line(b"hello");
    match next_event(&mut events).await {
        SessionEvent::Ready => {}
        other => panic!("Expected Ready, got {:?}", other),
    }

    // Queue flushes in issue order
    let writes =
        wait_for_writes(&handle, |w| w.contains(&"!0113255.".to_string())).await;
    let mode_pos = writes.iter().position(|w| w == "!0013001.").unwrap();
    let write_pos = writes.iter().position(|w| w == "!0113255.").unwrap();
    assert!(mode_pos < write_pos, "flush must preserve issue order");
}

#[tokio::test]
async fn test_debug_session_toggles_echo_on_and_off() {
    let mut discovery = MockDiscovery::new();
    let mut handle = discovery.add_working_candidate("/dev/ttyACM0");

    let (session, mut events) = Session::start(discovery, SessionOptions { debug: true });

    match next_event(&mut events).await {
        SessionEvent::Connected { .. } => {}
        other => panic!("Expected Connected, got {:?}", other),
    }
    handle.feed_line(b"hello");

    // Handshake turns echo on before the identify ping
    let writes = wait_for_writes(&handle, |w| w.contains(&"!9000000.".to_string())).await;
    let on_pos = writes.iter().position(|w| w == "!9900001.").unwrap();
    let ping_pos = writes.iter().position(|w| w == "!9000000.").unwrap();
    assert!(on_pos < ping_pos, "debug-on must precede the identify ping");

    // Shutdown turns echo off, waits out the grace period, then closes
    session.shutdown().unwrap();
    let writes = wait_for_writes(&handle, |w| w.contains(&"!9900000.".to_string())).await;
    assert_eq!(writes.last().map(String::as_str), Some("!9900000."));

    loop {
        if matches!(next_event(&mut events).await, SessionEvent::Closed) {
            break;
        }
    }
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_unplugged_device_surfaces_error_then_closed() {
    let mut discovery = MockDiscovery::new();
    let handle = discovery.add_working_candidate("/dev/ttyACM0");

    let (_session, mut events) = Session::start(discovery, SessionOptions::default());

    match next_event(&mut events).await {
        SessionEvent::Connected { .. } => {}
        other => panic!("Expected Connected, got {:?}", other),
    }

    // Dropping the script handle makes the next transport read fail,
    // as if the cable was pulled
    drop(handle);

    match next_event(&mut events).await {
        SessionEvent::Error { message } => {
            assert!(message.contains("Connection lost"), "got: {}", message);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
    match next_event(&mut events).await {
        SessionEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }
}
