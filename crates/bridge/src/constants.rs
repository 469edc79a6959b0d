//! Protocol bytes and timing defaults for the bridge.
//!
//! Wire constants come from the firmware's serial protocol and must not be
//! changed. Timing values are defaults for [`BridgeConfig`](crate::BridgeConfig)
//! and can be overridden per connection.

/// Bytes and tokens of the controller's serial protocol
pub mod wire {
    /// Real-time status query.
    ///
    /// Processed by the firmware as soon as it is received, without waiting
    /// for a line terminator. The bridge sends it followed by `\n`: the empty
    /// line that follows is acknowledged with `ok`, which closes the status
    /// transaction.
    pub const STATUS_QUERY: &str = "?";

    /// Soft reset (ctrl-x). Answered by a reboot banner, never by `ok`.
    pub const SOFT_RESET: u8 = 0x18;

    /// Check-mode toggle command.
    pub const CHECK_TOGGLE: &str = "$C";

    /// Feedback printed when check mode is switched on.
    pub const CHECK_ENABLED: &str = "[Enabled]";

    /// Feedback printed when check mode is switched off.
    pub const CHECK_DISABLED: &str = "[Disabled]";

    /// Acknowledgement of an accepted command.
    pub const ACK_OK: &str = "ok";

    /// Prefix of a rejected-command reply (`error:<code>`).
    pub const ACK_ERROR_PREFIX: &str = "error:";

    /// Written once after opening the port to wake the controller.
    pub const WAKEUP_SEQUENCE: &[u8] = b"\r\n\r\n";

    /// Terminator appended to every command line.
    pub const LINE_TERMINATOR: u8 = b'\n';
}

/// Connection timing defaults
pub mod timing {
    /// Pause after the wake-up sequence before the link is treated as ready
    /// (milliseconds)
    ///
    /// **Value**: 1000ms
    ///
    /// **Rationale**: opening the port toggles DTR, which resets most
    /// Arduino-based boards. The bootloader waits for a sketch upload before
    /// starting the firmware. One second covers the common bootloaders; boards
    /// without auto-reset need far less. Hardware dependent, hence configurable.
    pub const WAKEUP_SETTLE_MS: u64 = 1000;

    /// How long the console waits for the firmware banner at startup
    /// (milliseconds)
    ///
    /// **Value**: 5000ms
    ///
    /// The banner is only printed after a reset. A controller that was already
    /// running when the port opened stays silent, so the console continues
    /// after this timeout instead of hanging.
    pub const BANNER_TIMEOUT_MS: u64 = 5000;
}

/// Serial port defaults
pub mod serial {
    /// Baud rate of Grbl 0.9 and later.
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
}
