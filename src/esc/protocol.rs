//! # Signal Protocol Definitions
//!
//! Output protocols, spin directions and the throttle range each protocol accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EscError;

/// PWM pulse width at zero throttle (µs)
pub const PWM_MIN_US: u16 = 1000;

/// PWM pulse width at full throttle (µs)
pub const PWM_MAX_US: u16 = 2000;

/// PWM frame period (µs), 50 Hz
pub const PWM_PERIOD_US: u32 = 20_000;

/// Lowest DShot value (motor-stop command)
pub const DSHOT_VALUE_MIN: u16 = 0;

/// Highest DShot value (11 bits)
pub const DSHOT_VALUE_MAX: u16 = 2047;

/// Highest DShot special command value; 0..=47 is the command band
pub const DSHOT_COMMAND_MAX: u16 = 47;

/// Lowest DShot throttle-band value
pub const DSHOT_THROTTLE_MIN: u16 = 48;

/// ESC output protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Protocol {
    /// Servo-style 1000-2000 µs pulses at 50 Hz
    #[serde(rename = "PWM")]
    Pwm,
    /// DShot at 150 kbit/s
    #[serde(rename = "DSHOT150")]
    DShot150,
    /// DShot at 300 kbit/s
    #[serde(rename = "DSHOT300")]
    DShot300,
    /// DShot at 600 kbit/s
    #[serde(rename = "DSHOT600")]
    DShot600,
}

impl Protocol {
    /// All recognized protocols
    pub const ALL: [Protocol; 4] = [
        Protocol::Pwm,
        Protocol::DShot150,
        Protocol::DShot300,
        Protocol::DShot600,
    ];

    /// Persisted and wire name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Pwm => "PWM",
            Protocol::DShot150 => "DSHOT150",
            Protocol::DShot300 => "DSHOT300",
            Protocol::DShot600 => "DSHOT600",
        }
    }

    /// True for any DShot variant
    #[must_use]
    pub fn is_dshot(&self) -> bool {
        !matches!(self, Protocol::Pwm)
    }

    /// Only DShot can carry spin-direction commands
    #[must_use]
    pub fn supports_direction(&self) -> bool {
        self.is_dshot()
    }

    /// Inclusive throttle range accepted by `set_throttle`
    #[must_use]
    pub fn throttle_range(&self) -> (u16, u16) {
        match self {
            Protocol::Pwm => (PWM_MIN_US, PWM_MAX_US),
            _ => (DSHOT_VALUE_MIN, DSHOT_VALUE_MAX),
        }
    }

    /// Throttle applied on arming
    ///
    /// For DShot this is the lowest throttle-band value, never a command value.
    #[must_use]
    pub fn idle_throttle(&self) -> u16 {
        match self {
            Protocol::Pwm => PWM_MIN_US,
            _ => DSHOT_THROTTLE_MIN,
        }
    }

    /// Saturate `value` into this protocol's range
    #[must_use]
    pub fn clamp_throttle(&self, value: i64) -> u16 {
        let (min, max) = self.throttle_range();
        value.clamp(i64::from(min), i64::from(max)) as u16
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = EscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Protocol::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EscError::UnknownProtocol(s.to_string()))
    }
}

impl TryFrom<String> for Protocol {
    type Error = EscError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Motor spin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Direction {
    #[default]
    #[serde(rename = "FORWARD")]
    Forward,
    #[serde(rename = "REVERSE")]
    Reverse,
    #[serde(rename = "BRAKE")]
    Brake,
}

impl Direction {
    /// All recognized directions
    pub const ALL: [Direction; 3] = [Direction::Forward, Direction::Reverse, Direction::Brake];

    /// Persisted and wire name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Reverse => "REVERSE",
            Direction::Brake => "BRAKE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = EscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Direction::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EscError::UnknownDirection(s.to_string()))
    }
}

impl TryFrom<String> for Direction {
    type Error = EscError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
