//! Host backends for running the signal engine without a board

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

use super::{DelayNs, Gpio, Level, Pin, PinMode};

#[derive(Debug, Clone, Copy)]
struct PinState {
    mode: PinMode,
    level: Level,
    rising_edges: u64,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            mode: PinMode::Input,
            level: Level::Low,
            rising_edges: 0,
        }
    }
}

/// In-memory GPIO bank
///
/// Tracks mode and level per pin and counts rising edges, which equals the
/// number of pulses (PWM) or bits (DShot) emitted on the pin.
#[derive(Debug, Default)]
pub struct SimulatedGpio {
    pins: HashMap<u8, PinState>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of a pin (LOW if never touched)
    pub fn level(&self, pin: Pin) -> Level {
        self.pins.get(&pin.id()).map_or(Level::Low, |s| s.level)
    }

    /// Current mode of a pin (Input if never touched)
    pub fn mode(&self, pin: Pin) -> PinMode {
        self.pins.get(&pin.id()).map_or(PinMode::Input, |s| s.mode)
    }

    /// Rising edges seen on a pin since startup
    pub fn rising_edges(&self, pin: Pin) -> u64 {
        self.pins.get(&pin.id()).map_or(0, |s| s.rising_edges)
    }
}

impl Gpio for SimulatedGpio {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) {
        trace!("{} mode -> {:?}", pin, mode);
        self.pins.entry(pin.id()).or_default().mode = mode;
    }

    fn write(&mut self, pin: Pin, level: Level) {
        let state = self.pins.entry(pin.id()).or_default();
        if state.mode != PinMode::Output {
            trace!("{} written while not an output", pin);
        }
        if state.level == Level::Low && level == Level::High {
            state.rising_edges += 1;
        }
        state.level = level;
    }
}

/// Busy-wait delay on the host monotonic clock
///
/// Sub-millisecond waits spin; millisecond waits sleep the thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl SpinDelay {
    pub fn new() -> Self {
        Self
    }

    fn spin(duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        Self::spin(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        Self::spin(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
