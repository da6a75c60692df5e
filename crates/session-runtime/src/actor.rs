use futures::stream::StreamExt;
use futures_channel::mpsc;
use session_protocol::{SessionError, SessionEvent};

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially, so state is never touched from two places at
/// once.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **shutdown()** - Called when the actor is stopping
///
/// # Example
///
/// ```ignore
/// struct MyActor {
///     count: u32,
///     event_tx: mpsc::Sender<SessionEvent>,
/// }
///
/// impl Actor for MyActor {
///     type Message = MyMessage;
///
///     fn name(&self) -> &'static str {
///         "MyActor"
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), SessionError> {
///         // Process message
///         Ok(())
///     }
/// }
/// ```
#[allow(async_fn_in_trait)]
pub trait Actor: Send + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Initialize the actor before processing messages
    ///
    /// Called once when the actor starts. Use this to set up resources,
    /// restore state, or perform initial configuration.
    async fn init(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Handle a single message
    ///
    /// Called for each message received by the actor. Messages are
    /// processed sequentially in the order received.
    async fn handle(&mut self, msg: Self::Message) -> Result<(), SessionError>;

    /// Clean up before shutdown
    ///
    /// Called when the actor is stopping. Use this to close connections
    /// or release resources.
    async fn shutdown(&mut self) {}

    /// Main actor run loop (provided by runtime)
    ///
    /// This method consumes the actor and runs it to completion. It
    /// handles initialization, message processing, and shutdown. Handler
    /// errors are forwarded to the application as `Error` events rather
    /// than stopping the loop.
    ///
    /// # Arguments
    ///
    /// * `rx` - Channel to receive messages from
    /// * `event_tx` - Channel to send events to the application
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Self::Message>,
        event_tx: mpsc::Sender<SessionEvent>,
    ) where
        Self: Sized,
    {
        // Initialize
        if let Err(e) = self.init().await {
            let _ = event_tx.clone().try_send(SessionEvent::Error {
                message: format!("{} init failed: {}", self.name(), e),
            });
            return;
        }

        #[cfg(debug_assertions)]
        eprintln!("{} started", self.name());

        // Process messages
        while let Some(msg) = rx.next().await {
            if let Err(e) = self.handle(msg).await {
                let _ = event_tx.clone().try_send(SessionEvent::Error {
                    message: format!("{} error: {}", self.name(), e),
                });
            }
        }

        // Shutdown
        self.shutdown().await;

        #[cfg(debug_assertions)]
        eprintln!("{} stopped", self.name());
    }
}
