//! Delay timers for actor operations
//!
//! The session schedules its handshake, ping spacing, and shutdown
//! grace as messages posted back to itself after a delay. Timers are
//! cancellable so a state change can invalidate a pending delay.

use crate::SessionMessage;
use futures_channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handle to cancel a pending delay
///
/// When dropped or explicitly cancelled, the delay task will not send
/// its message, preventing stale timer messages after state changes.
#[derive(Clone)]
pub struct DelayHandle {
    cancelled: Arc<AtomicBool>,
}

impl DelayHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the delay, preventing its message from being sent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for DelayHandle {
    fn drop(&mut self) {
        // Auto-cancel when handle is dropped
        self.cancel();
    }
}

/// Spawn a task that sends `msg` to the session after `delay`
///
/// Returns a DelayHandle; drop it or call `cancel()` before expiry and
/// the message is never sent. Delays in this system are all well under
/// a second, so the task sleeps once and checks the flag at the end.
pub fn spawn_delay(
    session_tx: mpsc::Sender<SessionMessage>,
    msg: SessionMessage,
    delay: Duration,
) -> DelayHandle {
    let handle = DelayHandle::new();
    let cancel_flag = handle.cancelled.clone();

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        if !cancel_flag.load(Ordering::Acquire) {
            let _ = session_tx.clone().try_send(msg);
        }
    });

    handle
}
