//! # Signal Transmitter
//!
//! Drives the output pin to emit PWM pulses and DShot frames.
//!
//! DShot frames and PWM high pulses run inside a critical section so they
//! cannot be preempted mid-pulse. A late frame is harmless; a stretched bit
//! is a different bit.

use tracing::{debug, trace};

use crate::dshot::command::{CommandRepeat, DShotCommand};
use crate::dshot::frame::{encode_frame, DShotFrame};
use crate::dshot::timing::bit_timing;
use crate::esc::protocol::{Protocol, PWM_PERIOD_US};
use crate::hal::{DelayNs, Gpio, Level, Pin, PinMode};

/// Emits PWM and DShot waveforms on a GPIO pin
#[derive(Debug)]
pub struct SignalTransmitter<G, D> {
    gpio: G,
    delay: D,
}

impl<G: Gpio, D: DelayNs> SignalTransmitter<G, D> {
    pub fn new(gpio: G, delay: D) -> Self {
        Self { gpio, delay }
    }

    /// Access the underlying GPIO driver
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    /// Make `pin` an output held LOW
    pub fn configure_output(&mut self, pin: Pin) {
        self.gpio.set_mode(pin, PinMode::Output);
        self.gpio.write(pin, Level::Low);
        debug!("{} configured as output (LOW)", pin);
    }

    /// Drive `pin` LOW and return it to input mode
    pub fn release(&mut self, pin: Pin) {
        self.gpio.write(pin, Level::Low);
        self.gpio.set_mode(pin, PinMode::Input);
        debug!("{} released to input", pin);
    }

    /// Drive `pin` LOW immediately
    pub fn force_low(&mut self, pin: Pin) {
        self.gpio.write(pin, Level::Low);
    }

    /// Emit one 50 Hz PWM frame
    ///
    /// Holds HIGH for `pulse_width_us`, then LOW for the rest of the 20 ms
    /// period. The caller guarantees 1000 <= `pulse_width_us` <= 2000.
    pub fn send_pwm(&mut self, pin: Pin, pulse_width_us: u16) {
        let low_us = self.send_pwm_pulse(pin, pulse_width_us);
        self.delay.delay_us(low_us);
    }

    /// Emit only the HIGH part of a PWM frame
    ///
    /// The pin is left LOW. The caller owns the rest of the 20 ms period.
    ///
    /// # Returns
    ///
    /// * `u32` - Remaining LOW time of the period in µs
    pub fn send_pwm_pulse(&mut self, pin: Pin, pulse_width_us: u16) -> u32 {
        let high_us = u32::from(pulse_width_us);
        let gpio = &mut self.gpio;
        let delay = &mut self.delay;

        critical_section::with(|_| {
            gpio.write(pin, Level::High);
            delay.delay_us(high_us);
            gpio.write(pin, Level::Low);
        });

        trace!("{} PWM pulse {}us", pin, pulse_width_us);
        PWM_PERIOD_US.saturating_sub(high_us)
    }

    /// Encode `value` and emit it as one DShot frame, MSB first
    ///
    /// Nothing is sent when `protocol` is PWM.
    ///
    /// # Returns
    ///
    /// * `Option<DShotFrame>` - The frame put on the wire
    pub fn send_dshot(&mut self, pin: Pin, value: u16, protocol: Protocol) -> Option<DShotFrame> {
        let timing = bit_timing(protocol)?;
        let frame = encode_frame(value);
        let gpio = &mut self.gpio;
        let delay = &mut self.delay;

        critical_section::with(|_| {
            for bit in frame.bits() {
                gpio.write(pin, Level::High);
                delay.delay_ns(timing.high_ns(bit));
                gpio.write(pin, Level::Low);
                delay.delay_ns(timing.low_ns(bit));
            }
        });

        trace!("{} {} frame 0x{:04X}", pin, protocol, frame.raw());
        Some(frame)
    }

    /// Emit a special command under a repetition policy
    ///
    /// Blocks for the whole sequence; nothing else is transmitted in between.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of frames actually sent (0 for PWM)
    pub fn send_command(
        &mut self,
        pin: Pin,
        protocol: Protocol,
        command: DShotCommand,
        policy: CommandRepeat,
    ) -> usize {
        let pause_ms = u32::try_from(policy.interval.as_millis()).unwrap_or(u32::MAX);
        let mut sent = 0;

        for _ in 0..policy.count {
            if self.send_dshot(pin, command.value(), protocol).is_none() {
                break;
            }
            sent += 1;
            self.delay.delay_ms(pause_ms);
        }

        debug!("{} sent {:?} x{} ({})", pin, command, sent, protocol);
        sent
    }
}
