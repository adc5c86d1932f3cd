//! # ESC Controller
//!
//! Owns the ESC state and enforces every safety and range rule. All
//! external commands enter here.
//!
//! ## States
//!
//! | State | Entered by | Throttle |
//! |-------|------------|----------|
//! | Disarmed | startup, `disarm()` | 0 (pin held LOW) |
//! | Armed | `arm()` | protocol idle, then caller-set |
//!
//! No throttle signal is produced while disarmed. Direction control and
//! braking exist only under DShot.
//!
//! ## Usage
//!
//! ```
//! use esc_driver::config::EscConfig;
//! use esc_driver::dshot::command::CommandRepeat;
//! use esc_driver::esc::controller::EscController;
//! use esc_driver::hal::sim::{SimulatedGpio, SpinDelay};
//! use esc_driver::hal::Pin;
//! use esc_driver::esc::protocol::Protocol;
//! use esc_driver::store::MemoryStore;
//! use esc_driver::transmitter::SignalTransmitter;
//!
//! let transmitter = SignalTransmitter::new(SimulatedGpio::new(), SpinDelay::new());
//! let mut esc = EscController::new(
//!     transmitter,
//!     MemoryStore::new(),
//!     &EscConfig::default(),
//!     CommandRepeat::default(),
//! );
//!
//! esc.configure(Some(Pin::new(5)?), Some(Protocol::DShot300));
//! esc.arm();
//! esc.set_throttle(1500);
//!
//! let status = esc.status();
//! assert!(status.armed);
//! assert_eq!(status.throttle, 1500);
//! assert!(status.direction_supported);
//! # Ok::<(), esc_driver::error::EscError>(())
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EscConfig;
use crate::dshot::command::{CommandRepeat, DShotCommand};
use crate::error::{EscError, Result};
use crate::esc::protocol::{Direction, Protocol};
use crate::hal::{DelayNs, Gpio, Pin};
use crate::store::{keys, SettingsStore};
use crate::transmitter::SignalTransmitter;

/// Snapshot of the ESC state reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscStatus {
    pub pin: u8,
    pub protocol: Protocol,
    pub armed: bool,
    pub throttle: u16,
    pub direction: Direction,
    pub direction_supported: bool,
}

/// Signal the control loop should emit this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// PWM pulse width in µs
    Pwm(u16),
    /// DShot throttle value at the given speed grade
    DShot { value: u16, protocol: Protocol },
}

/// The single mutable ESC aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EscState {
    pin: Pin,
    protocol: Protocol,
    armed: bool,
    throttle: u16,
    direction: Direction,
}

impl EscState {
    fn direction_supported(&self) -> bool {
        self.protocol.supports_direction()
    }
}

/// Safety-gated ESC controller
pub struct EscController<G, D, S> {
    transmitter: SignalTransmitter<G, D>,
    store: S,
    repeat: CommandRepeat,
    state: EscState,
}

impl<G: Gpio, D: DelayNs, S: SettingsStore> EscController<G, D, S> {
    /// Build the controller from persisted settings
    ///
    /// Each persisted value that is missing or invalid falls back to the
    /// configured default. The output pin is configured LOW and the ESC
    /// starts disarmed.
    pub fn new(
        mut transmitter: SignalTransmitter<G, D>,
        store: S,
        defaults: &EscConfig,
        repeat: CommandRepeat,
    ) -> Self {
        let pin = store
            .load(keys::PIN)
            .and_then(|v| v.as_integer())
            .and_then(|id| Pin::new(id).ok())
            .or_else(|| Pin::new(i64::from(defaults.default_pin)).ok())
            .unwrap_or(Pin::DEFAULT);

        let protocol = store
            .load(keys::PROTOCOL)
            .and_then(|v| v.as_str().and_then(|s| s.parse::<Protocol>().ok()))
            .unwrap_or(defaults.default_protocol);

        let direction = store
            .load(keys::DIRECTION)
            .and_then(|v| v.as_str().and_then(|s| s.parse::<Direction>().ok()))
            .filter(|_| protocol.supports_direction())
            .unwrap_or_default();

        transmitter.configure_output(pin);

        let state = EscState {
            pin,
            protocol,
            armed: false,
            throttle: protocol.idle_throttle(),
            direction,
        };

        info!(
            "ESC ready on {} ({}, direction {}, disarmed)",
            pin, protocol, direction
        );

        Self {
            transmitter,
            store,
            repeat,
            state,
        }
    }

    /// Current state snapshot
    pub fn status(&self) -> EscStatus {
        EscStatus {
            pin: self.state.pin.id(),
            protocol: self.state.protocol,
            armed: self.state.armed,
            throttle: self.state.throttle,
            direction: self.state.direction,
            direction_supported: self.state.direction_supported(),
        }
    }

    /// Access the transmitter (and through it the GPIO driver)
    pub fn transmitter(&self) -> &SignalTransmitter<G, D> {
        &self.transmitter
    }

    /// Reassign the output pin and/or switch protocol
    ///
    /// Changing the pin drives the old pin LOW, releases it to input and
    /// configures the new one as a LOW output. Switching to PWM forces the
    /// direction back to forward. Switching while armed resets throttle to
    /// the new protocol's idle value; while disarmed a non-zero throttle is
    /// clamped into the new range. Changed fields are persisted.
    pub fn configure(&mut self, pin: Option<Pin>, protocol: Option<Protocol>) {
        if let Some(pin) = pin.filter(|&p| p != self.state.pin) {
            let old = self.state.pin;
            self.transmitter.release(old);
            self.transmitter.configure_output(pin);
            self.state.pin = pin;
            info!("Output moved from {} to {}", old, pin);
            self.persist(keys::PIN, toml::Value::Integer(i64::from(pin.id())));
        }

        if let Some(protocol) = protocol.filter(|&p| p != self.state.protocol) {
            let old = self.state.protocol;
            self.state.protocol = protocol;

            if !protocol.supports_direction() && self.state.direction != Direction::Forward {
                self.state.direction = Direction::Forward;
                self.persist(keys::DIRECTION, Direction::Forward.name().into());
            }

            if self.state.armed {
                self.state.throttle = protocol.idle_throttle();
            } else if self.state.throttle != 0 {
                self.state.throttle = protocol.clamp_throttle(i64::from(self.state.throttle));
            }

            info!("Protocol changed from {} to {}", old, protocol);
            self.persist(keys::PROTOCOL, protocol.name().into());
        }
    }

    /// Validate raw pin/protocol input, then [`configure`](Self::configure)
    ///
    /// # Errors
    ///
    /// Returns a validation error for an out-of-range pin or unknown
    /// protocol name; state is left untouched in either case.
    pub fn configure_raw(&mut self, pin: Option<i64>, protocol: Option<&str>) -> Result<()> {
        let pin = pin.map(Pin::new).transpose()?;
        let protocol = protocol.map(str::parse::<Protocol>).transpose()?;
        self.configure(pin, protocol);
        Ok(())
    }

    /// Store a throttle value, saturated into the active protocol's range
    pub fn set_throttle(&mut self, value: i64) {
        let clamped = self.state.protocol.clamp_throttle(value);
        if i64::from(clamped) != value {
            debug!("Throttle {} clamped to {}", value, clamped);
        }
        self.state.throttle = clamped;
    }

    /// Arm the ESC at the protocol's idle throttle
    pub fn arm(&mut self) {
        self.state.armed = true;
        self.state.throttle = self.state.protocol.idle_throttle();
        info!("ESC armed (idle throttle {})", self.state.throttle);
    }

    /// Disarm the ESC and pull the output LOW right away
    pub fn disarm(&mut self) {
        if self.state.armed {
            info!("ESC disarmed");
        }
        self.state.armed = false;
        self.state.throttle = 0;
        self.transmitter.force_low(self.state.pin);
    }

    /// Set spin direction
    ///
    /// Forward and reverse are sent to the ESC as repeated special
    /// commands. Brake is only recorded; see [`brake`](Self::brake).
    ///
    /// # Errors
    ///
    /// Returns `DirectionUnsupported` under PWM.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.require_direction_support()?;

        self.state.direction = direction;
        info!("Direction set to {}", direction);
        self.persist(keys::DIRECTION, direction.name().into());

        let command = match direction {
            Direction::Forward => DShotCommand::SpinDirectionNormal,
            Direction::Reverse => DShotCommand::SpinDirectionReversed,
            Direction::Brake => return Ok(()),
        };
        self.send_command(command);
        Ok(())
    }

    /// Parse a direction name, then [`set_direction`](Self::set_direction)
    ///
    /// # Errors
    ///
    /// Capability is checked before the name, so an unsupported protocol
    /// always reports `DirectionUnsupported`.
    pub fn set_direction_named(&mut self, direction: &str) -> Result<()> {
        self.require_direction_support()?;
        self.set_direction(direction.parse()?)
    }

    /// Stop the motor with the DShot motor-stop command
    ///
    /// # Errors
    ///
    /// Returns `DirectionUnsupported` under PWM, or `NotArmed` when disarmed.
    pub fn brake(&mut self) -> Result<()> {
        self.require_direction_support()?;
        if !self.state.armed {
            warn!("Brake rejected: ESC not armed");
            return Err(EscError::NotArmed);
        }

        self.state.direction = Direction::Brake;
        self.state.throttle = 0;
        info!("Braking");
        self.send_command(DShotCommand::MotorStop);
        Ok(())
    }

    /// Signal due this tick, if any
    ///
    /// Nothing is due while disarmed or at zero throttle.
    pub fn pending_signal(&self) -> Option<Signal> {
        if !self.state.armed || self.state.throttle == 0 {
            return None;
        }

        Some(match self.state.protocol {
            Protocol::Pwm => Signal::Pwm(self.state.throttle),
            protocol => Signal::DShot {
                value: self.state.throttle,
                protocol,
            },
        })
    }

    /// Put a signal on the wire, full PWM period included
    pub fn emit(&mut self, signal: Signal) {
        let pin = self.state.pin;
        match signal {
            Signal::Pwm(width) => self.transmitter.send_pwm(pin, width),
            Signal::DShot { value, protocol } => {
                self.transmitter.send_dshot(pin, value, protocol);
            }
        }
    }

    /// Put a signal on the wire without waiting out the PWM LOW tail
    ///
    /// For a caller that already paces frames at the PWM period, so the
    /// pin sits LOW until its next tick.
    pub fn emit_pulse(&mut self, signal: Signal) {
        let pin = self.state.pin;
        match signal {
            Signal::Pwm(width) => {
                self.transmitter.send_pwm_pulse(pin, width);
            }
            Signal::DShot { value, protocol } => {
                self.transmitter.send_dshot(pin, value, protocol);
            }
        }
    }

    fn require_direction_support(&self) -> Result<()> {
        if self.state.direction_supported() {
            Ok(())
        } else {
            warn!("Direction control rejected under {}", self.state.protocol);
            Err(EscError::DirectionUnsupported(self.state.protocol))
        }
    }

    fn send_command(&mut self, command: DShotCommand) {
        self.transmitter
            .send_command(self.state.pin, self.state.protocol, command, self.repeat);
    }

    fn persist(&mut self, key: &str, value: toml::Value) {
        if let Err(e) = self.store.save(key, value) {
            warn!("Setting '{}' not saved: {}", key, e);
        }
    }
}
