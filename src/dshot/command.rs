//! # DShot Special Commands
//!
//! Values 0-47 of a DShot frame are reserved for commands. ESC firmware does
//! not reliably latch a single command frame, so commands go out under a
//! [`CommandRepeat`] policy.

use std::time::Duration;

/// Default number of transmissions per command
pub const DEFAULT_REPEAT_COUNT: u8 = 10;

/// Default pause after each command transmission
pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// DShot special commands used by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DShotCommand {
    /// Stop the motor
    MotorStop = 0,
    /// Spin direction normal, with respect to ESC configuration
    SpinDirectionNormal = 20,
    /// Spin direction reversed, with respect to ESC configuration
    SpinDirectionReversed = 21,
}

impl DShotCommand {
    /// Frame value for this command
    #[must_use]
    pub fn value(self) -> u16 {
        self as u16
    }
}

/// Fixed-count, fixed-gap repetition of a special command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRepeat {
    /// Number of frames sent
    pub count: u8,
    /// Pause after each frame
    pub interval: Duration,
}

impl Default for CommandRepeat {
    fn default() -> Self {
        Self {
            count: DEFAULT_REPEAT_COUNT,
            interval: DEFAULT_REPEAT_INTERVAL,
        }
    }
}

impl CommandRepeat {
    #[must_use]
    pub fn new(count: u8, interval: Duration) -> Self {
        Self { count, interval }
    }

    /// Total time the transmitter is blocked by the pauses alone
    #[must_use]
    pub fn total_pause(&self) -> Duration {
        self.interval * u32::from(self.count)
    }
}
