//! # DShot Bit Timing
//!
//! Bit period and duty ratios per DShot speed grade.
//!
//! Every bit occupies one fixed period. A logic 1 is HIGH for 75% of the
//! period, a logic 0 is HIGH for 37.5%; LOW fills the remainder.

use crate::esc::protocol::Protocol;

/// Fraction of the bit period held HIGH for a logic 1
pub const ONE_HIGH_RATIO: f32 = 0.75;

/// Fraction of the bit period held HIGH for a logic 0
pub const ZERO_HIGH_RATIO: f32 = 0.375;

/// Timing constants for one DShot speed grade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitTiming {
    /// Full bit period in nanoseconds
    pub bit_period_ns: u32,
    /// HIGH ratio for a logic 1
    pub one_high_ratio: f32,
    /// HIGH ratio for a logic 0
    pub zero_high_ratio: f32,
}

impl BitTiming {
    /// Nanoseconds the line is held HIGH for `bit`
    #[must_use]
    pub fn high_ns(&self, bit: bool) -> u32 {
        let ratio = if bit { self.one_high_ratio } else { self.zero_high_ratio };
        (self.bit_period_ns as f32 * ratio).round() as u32
    }

    /// Nanoseconds the line is held LOW for `bit`
    #[must_use]
    pub fn low_ns(&self, bit: bool) -> u32 {
        self.bit_period_ns - self.high_ns(bit)
    }

    /// Duration of a complete 16-bit frame in nanoseconds
    #[must_use]
    pub fn frame_ns(&self) -> u32 {
        self.bit_period_ns * 16
    }
}

/// Resolve bit timing for a protocol
///
/// Returns `None` for PWM, which has no bit timing.
///
/// # Examples
///
/// ```
/// use esc_driver::dshot::timing::bit_timing;
/// use esc_driver::esc::protocol::Protocol;
///
/// let timing = bit_timing(Protocol::DShot600).unwrap();
/// assert_eq!(timing.bit_period_ns, 1667);
/// assert!(bit_timing(Protocol::Pwm).is_none());
/// ```
#[must_use]
pub fn bit_timing(protocol: Protocol) -> Option<BitTiming> {
    let bit_period_ns = match protocol {
        // 6.67µs per bit
        Protocol::DShot150 => 6667,
        // 3.33µs per bit
        Protocol::DShot300 => 3333,
        // 1.67µs per bit
        Protocol::DShot600 => 1667,
        Protocol::Pwm => return None,
    };

    Some(BitTiming {
        bit_period_ns,
        one_high_ratio: ONE_HIGH_RATIO,
        zero_high_ratio: ZERO_HIGH_RATIO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_periods() {
        assert_eq!(bit_timing(Protocol::DShot150).unwrap().bit_period_ns, 6667);
        assert_eq!(bit_timing(Protocol::DShot300).unwrap().bit_period_ns, 3333);
        assert_eq!(bit_timing(Protocol::DShot600).unwrap().bit_period_ns, 1667);
    }

    #[test]
    fn test_pwm_has_no_bit_timing() {
        assert_eq!(bit_timing(Protocol::Pwm), None);
    }

    #[test]
    fn test_ratios_are_fixed() {
        for protocol in [Protocol::DShot150, Protocol::DShot300, Protocol::DShot600] {
            let timing = bit_timing(protocol).unwrap();
            assert_eq!(timing.one_high_ratio, 0.75);
            assert_eq!(timing.zero_high_ratio, 0.375);
        }
    }

    #[test]
    fn test_high_low_durations() {
        let timing = bit_timing(Protocol::DShot150).unwrap();
        assert_eq!(timing.high_ns(true), 5000);
        assert_eq!(timing.low_ns(true), 1667);
        assert_eq!(timing.high_ns(false), 2500);
        assert_eq!(timing.low_ns(false), 4167);

        let timing = bit_timing(Protocol::DShot600).unwrap();
        assert_eq!(timing.high_ns(true), 1250);
        assert_eq!(timing.high_ns(false), 625);
    }

    #[test]
    fn test_high_plus_low_is_period() {
        for protocol in [Protocol::DShot150, Protocol::DShot300, Protocol::DShot600] {
            let timing = bit_timing(protocol).unwrap();
            for bit in [false, true] {
                assert_eq!(timing.high_ns(bit) + timing.low_ns(bit), timing.bit_period_ns);
            }
        }
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(bit_timing(Protocol::DShot300).unwrap().frame_ns(), 53_328);
    }
}
