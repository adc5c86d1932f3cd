//! # DShot Frame Encoder
//!
//! Builds 16-bit DShot frames.
//!
//! ```text
//! bit  15 ............ 5 | 4         | 3 .. 0
//!      value (11 bits)   | telemetry | CRC
//! ```
//!
//! The CRC XOR-folds the 12-bit packet (value + telemetry flag) over its
//! three nibbles, lowest nibble first. ESCs silently drop frames whose CRC
//! does not match.

use crate::esc::protocol::DSHOT_VALUE_MAX;

/// A single encoded DShot frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DShotFrame {
    inner: u16,
}

impl DShotFrame {
    /// Returns the raw 16-bit frame
    #[must_use]
    pub fn raw(&self) -> u16 {
        self.inner
    }

    /// Returns the 11-bit throttle/command value
    #[must_use]
    pub fn value(&self) -> u16 {
        self.inner >> 5
    }

    /// Returns whether the telemetry bit is set
    #[must_use]
    pub fn telemetry_requested(&self) -> bool {
        self.inner & 0x10 != 0
    }

    /// Returns the 4-bit checksum
    #[must_use]
    pub fn crc(&self) -> u16 {
        self.inner & 0x0F
    }

    /// Iterate the frame bits most-significant first
    #[must_use]
    pub fn bits(&self) -> impl Iterator<Item = bool> {
        let inner = self.inner;
        (0..16).rev().map(move |i| (inner >> i) & 1 == 1)
    }
}

/// Compute the DShot checksum of a 12-bit packet
///
/// # Arguments
///
/// * `packet` - Value shifted left by one, OR'd with the telemetry flag
///
/// # Returns
///
/// * `u16` - 4-bit checksum
#[must_use]
pub fn crc4(packet: u16) -> u16 {
    let mut csum: u16 = 0;
    let mut data = packet;

    for _ in 0..3 {
        csum ^= data;
        data >>= 4;
    }

    csum & 0x0F
}

/// Encode a throttle or command value into a DShot frame
///
/// The telemetry flag is always cleared. Values above 2047 are masked to
/// 11 bits; callers keep values in range.
///
/// # Examples
///
/// ```
/// use esc_driver::dshot::frame::encode_frame;
///
/// let frame = encode_frame(1046);
/// assert_eq!(frame.value(), 1046);
/// assert_eq!(frame.crc(), 0x06);
/// ```
#[must_use]
pub fn encode_frame(value: u16) -> DShotFrame {
    encode_frame_with_telemetry(value, false)
}

fn encode_frame_with_telemetry(value: u16, telemetry: bool) -> DShotFrame {
    let packet = ((value & DSHOT_VALUE_MAX) << 1) | u16::from(telemetry);
    DShotFrame {
        inner: (packet << 4) | crc4(packet),
    }
}
