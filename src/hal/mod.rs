//! # Hardware Abstraction Module
//!
//! GPIO and timing seams between the signal engine and the board.
//!
//! The engine addresses pins by number so the output can be reassigned at
//! runtime. Busy-wait timing goes through [`embedded_hal::delay::DelayNs`],
//! so a hardware timer implementation can be swapped in without touching
//! protocol logic.

pub mod sim;

use crate::error::{EscError, Result};

pub use embedded_hal::delay::DelayNs;

/// Highest addressable output pin
pub const MAX_PIN: u8 = 39;

/// Validated output pin identifier (0-39)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin(u8);

impl Pin {
    /// Factory default output pin
    pub const DEFAULT: Pin = Pin(5);

    /// Validate a pin number
    ///
    /// # Errors
    ///
    /// Returns `EscError::InvalidPin` if `id` is outside 0-39
    ///
    /// # Examples
    ///
    /// ```
    /// use esc_driver::hal::Pin;
    ///
    /// assert_eq!(Pin::new(5).unwrap().id(), 5);
    /// assert!(Pin::new(40).is_err());
    /// ```
    pub fn new(id: i64) -> Result<Self> {
        u8::try_from(id)
            .ok()
            .filter(|&n| n <= MAX_PIN)
            .map(Pin)
            .ok_or(EscError::InvalidPin(id))
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance, the safe state for a released pin
    Input,
    Output,
}

/// Logic level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Trait for pin-number addressed GPIO drivers
///
/// Writes are assumed to always succeed.
pub trait Gpio: Send {
    /// Configure the direction of a pin
    fn set_mode(&mut self, pin: Pin, mode: PinMode);

    /// Drive an output pin
    fn write(&mut self, pin: Pin, level: Level);
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A single recorded GPIO call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum GpioEvent {
        Mode(u8, PinMode),
        Write(u8, Level),
    }

    /// Mock GPIO recording every call
    #[derive(Clone, Default)]
    pub struct RecordingGpio {
        pub events: Arc<Mutex<Vec<GpioEvent>>>,
    }

    impl RecordingGpio {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<GpioEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.events.lock().unwrap().clear();
        }

        /// Levels written, in order, ignoring mode changes
        pub fn writes(&self) -> Vec<(u8, Level)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    GpioEvent::Write(pin, level) => Some((pin, level)),
                    GpioEvent::Mode(..) => None,
                })
                .collect()
        }

        /// Number of HIGH writes, one per emitted pulse or bit
        pub fn pulse_count(&self) -> usize {
            self.writes()
                .iter()
                .filter(|(_, level)| *level == Level::High)
                .count()
        }
    }

    impl Gpio for RecordingGpio {
        fn set_mode(&mut self, pin: Pin, mode: PinMode) {
            self.events.lock().unwrap().push(GpioEvent::Mode(pin.id(), mode));
        }

        fn write(&mut self, pin: Pin, level: Level) {
            self.events.lock().unwrap().push(GpioEvent::Write(pin.id(), level));
        }
    }

    /// A single recorded delay call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DelayEvent {
        Ns(u32),
        Us(u32),
        Ms(u32),
    }

    /// Mock delay that records instead of waiting
    #[derive(Clone, Default)]
    pub struct RecordingDelay {
        pub events: Arc<Mutex<Vec<DelayEvent>>>,
    }

    impl RecordingDelay {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<DelayEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.events.lock().unwrap().clear();
        }

        /// DShot frames rebuilt from the recorded bit timings
        ///
        /// Every bit is a HIGH/LOW `delay_ns` pair; a 1 holds HIGH longer
        /// than LOW, a 0 shorter, at every speed grade.
        pub fn dshot_frames(&self) -> Vec<u16> {
            let ns: Vec<u32> = self
                .events()
                .into_iter()
                .filter_map(|e| match e {
                    DelayEvent::Ns(ns) => Some(ns),
                    _ => None,
                })
                .collect();

            ns.chunks_exact(32)
                .map(|frame| {
                    frame
                        .chunks_exact(2)
                        .fold(0u16, |acc, bit| (acc << 1) | u16::from(bit[0] > bit[1]))
                })
                .collect()
        }
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.events.lock().unwrap().push(DelayEvent::Ns(ns));
        }

        fn delay_us(&mut self, us: u32) {
            self.events.lock().unwrap().push(DelayEvent::Us(us));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.events.lock().unwrap().push(DelayEvent::Ms(ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_range() {
        assert_eq!(Pin::new(0).unwrap().id(), 0);
        assert_eq!(Pin::new(39).unwrap().id(), 39);
        assert!(Pin::new(40).is_err());
        assert!(Pin::new(-1).is_err());
        assert!(Pin::new(300).is_err());
    }

    #[test]
    fn test_invalid_pin_error_carries_value() {
        match Pin::new(-7) {
            Err(EscError::InvalidPin(id)) => assert_eq!(id, -7),
            other => panic!("Expected InvalidPin, got: {:?}", other),
        }
    }

    #[test]
    fn test_pin_display() {
        assert_eq!(Pin::new(5).unwrap().to_string(), "GPIO5");
    }
}
