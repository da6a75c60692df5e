//! Blink: the hardware hello-world
//!
//! Finds the first serial-attached board, configures pin 13 as an
//! output, and toggles it every 500ms until Ctrl-C, which runs the
//! orderly shutdown sequence before exiting.

use board_session::{Session, SessionOptions};
use board_transport::SerialDiscovery;
use futures::stream::StreamExt;
use session_protocol::{PinLevel, PinMode, SessionEvent, SessionError};
use std::time::Duration;

const LED_PIN: u8 = 13;

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    let (session, mut events) = Session::start(SerialDiscovery::new(), SessionOptions::default());

    // Print the session's life story; exit once the close is confirmed
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                SessionEvent::Connected { endpoint } => {
                    println!("connected to {}", endpoint);
                }
                SessionEvent::Ready => println!("device ready"),
                SessionEvent::Data { bytes } => {
                    print!("<- {}", String::from_utf8_lossy(&bytes));
                }
                SessionEvent::Error { message } => {
                    eprintln!("error: {}", message);
                }
                SessionEvent::Closed => {
                    println!("session closed");
                    std::process::exit(0);
                }
            }
        }
    });

    // Queued immediately; the session flushes it once the device is up
    session.set_pin_mode(LED_PIN, PinMode::Output)?;

    let mut level = PinLevel::High;
    let mut ticker = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.digital_write(LED_PIN, level)?;
                level = level.toggled();
            }
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                session.shutdown()?;
                // The event task exits the process on Closed; cap the
                // wait in case the port task is already gone
                tokio::time::sleep(Duration::from_secs(2)).await;
                return Ok(());
            }
        }
    }
}
