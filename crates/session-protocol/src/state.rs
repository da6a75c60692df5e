/// # Session State Machine
///
/// Unified state machine for the lifecycle of one board session. The
/// state machine prevents invalid state combinations and provides a
/// single source of truth for session status.
///
/// ## State Transition Diagram
///
/// ```text
///   ┌──────────────┐  first open   ┌───────────┐  first data  ┌───────┐
///   │ Disconnected │──────────────►│ Connected │─────────────►│ Ready │
///   └──────┬───────┘   succeeds    └─────┬─────┘   arrives    └───┬───┘
///          │                             │                        │
///          │ shutdown                    │ shutdown /             │ shutdown /
///          │                             │ transport lost         │ transport lost
///          │          ┌────────┐         │                        │
///          └─────────►│ Closed │◄────────┴────────────────────────┘
///                     └────────┘
/// ```
///
/// ## State Invariants
///
/// - **Disconnected**: no transport handle, discovery not yet succeeded
/// - **Connected**: transport open, handshake timer pending, writes buffer
/// - **Ready**: transport open, device has produced data, writes go direct
/// - **Closed**: terminal; transport released (or release in flight),
///   pending writes discarded, further writes rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    /// No transport open yet
    Disconnected,

    /// Transport open, waiting for first data from the device
    Connected,

    /// Device has spoken; fully operational
    Ready,

    /// Session torn down; terminal
    Closed,
}

impl SessionState {
    /// User-facing status text
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Disconnected => "Looking for device...",
            Self::Connected => "Connected (waiting for device)",
            Self::Ready => "Ready",
            Self::Closed => "Closed",
        }
    }

    /// Is a transport handle expected to be present in this state?
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }

    /// Validate if transition to new_state is allowed from current state
    ///
    /// Exhaustive match gives compile-time coverage plus runtime validation.
    pub fn can_transition_to(&self, new_state: SessionState) -> bool {
        use SessionState::*;

        match (self, new_state) {
            // Forward progress
            (Disconnected, Connected) => true, // First candidate opened
            (Connected, Ready) => true,        // First data observed

            // Closed is reachable from everywhere
            (Disconnected, Closed) => true, // Shutdown before a device was found
            (Connected, Closed) => true,    // Shutdown or transport lost pre-ready
            (Ready, Closed) => true,        // Shutdown or transport lost
            (Closed, Closed) => true,       // Idempotent (repeated shutdown)

            // All other transitions are invalid
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(SessionState::Disconnected.can_transition_to(SessionState::Connected));
        assert!(SessionState::Connected.can_transition_to(SessionState::Ready));
        assert!(SessionState::Ready.can_transition_to(SessionState::Closed));
        assert!(SessionState::Connected.can_transition_to(SessionState::Closed));
        assert!(SessionState::Disconnected.can_transition_to(SessionState::Closed));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot reach Ready without passing through Connected
        assert!(!SessionState::Disconnected.can_transition_to(SessionState::Ready));

        // Ready fires once; no re-entry
        assert!(!SessionState::Ready.can_transition_to(SessionState::Ready));

        // Closed is terminal
        assert!(!SessionState::Closed.can_transition_to(SessionState::Connected));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Disconnected));
    }

    #[test]
    fn test_closed_is_idempotent() {
        assert!(SessionState::Closed.can_transition_to(SessionState::Closed));
    }

    #[test]
    fn test_is_open() {
        assert!(!SessionState::Disconnected.is_open());
        assert!(SessionState::Connected.is_open());
        assert!(SessionState::Ready.is_open());
        assert!(!SessionState::Closed.is_open());
    }

    #[test]
    fn test_serialization() {
        let state = SessionState::Ready;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
