//! Centralized timing and sizing constants for the session layer
//!
//! All delay and capacity values are defined here with rationale.
//! Before changing a value, read its documentation and test against
//! real hardware; most of these exist because of device-side timing.

/// Post-connect handshake timing
pub mod handshake {
    /// Delay between opening the transport and starting the handshake
    /// (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: Opening the port asserts DTR, which resets most
    /// hobbyist boards; the firmware then takes 200-400ms to boot and
    /// configure its UART. Bytes sent earlier are simply lost. 500ms
    /// covers the reset window with margin on slow USB bridges.
    pub const POST_CONNECT_DELAY_MS: u64 = 500;

    /// Spacing between the two identify pings (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: The second ping catches devices that were still
    /// booting when the first went out. One spacing interval matches
    /// the post-connect delay; anything longer just delays readiness
    /// detection on the application side.
    pub const IDENTIFY_SPACING_MS: u64 = 500;
}

/// Shutdown timing
pub mod shutdown {
    /// Grace period between the debug-off write and releasing the
    /// transport (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: A 9-byte frame needs under 1ms on the wire at
    /// 115200 baud; the rest of the budget is for OS write buffers and
    /// the USB bridge to drain before the handle is dropped.
    pub const GRACE_MS: u64 = 100;
}

/// Channel capacities
pub mod channel {
    /// Port task mailbox capacity
    ///
    /// Writes are 8-9 byte commands drained as fast as the transport
    /// accepts them; 512 absorbs any realistic command burst.
    pub const PORT_CAPACITY: usize = 512;
}

/// Fixed baud rate for every candidate device
///
/// The device firmware configures its UART at 115200 unconditionally;
/// opening at any other rate yields framing garbage, so there is no
/// rate negotiation or probing.
pub const BAUD_RATE: u32 = 115200;
