//! # Control Loop
//!
//! Periodic driver that emits the current throttle signal once per tick
//! (50 Hz by default). The loop only reads controller state; every mutation
//! goes through [`EscController`] operations.

use std::time::Duration;
use tracing::info;

use crate::esc::controller::{EscController, Signal};
use crate::hal::{DelayNs, Gpio};
use crate::store::SettingsStore;

/// Default tick rate in Hz
pub const DEFAULT_RATE_HZ: u32 = 50;

/// Number of emitted frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 250;

/// Per-tick signal dispatcher
#[derive(Debug)]
pub struct ControlLoop {
    period: Duration,
    ticks: u64,
    frames: u64,
    last_log_frames: u64,
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000 / u64::from(DEFAULT_RATE_HZ)))
    }
}

impl ControlLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticks: 0,
            frames: 0,
            last_log_frames: 0,
        }
    }

    /// Target tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Frames emitted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one tick
    ///
    /// Emits a PWM pulse or DShot frame when the ESC is armed with non-zero
    /// throttle; otherwise leaves the pin alone. The PWM LOW tail is not
    /// waited out here: the tick period keeps the pin LOW until the next
    /// pulse.
    ///
    /// # Returns
    ///
    /// * `Option<Signal>` - The signal emitted this tick
    pub fn tick<G, D, S>(&mut self, esc: &mut EscController<G, D, S>) -> Option<Signal>
    where
        G: Gpio,
        D: DelayNs,
        S: SettingsStore,
    {
        self.ticks += 1;

        let signal = esc.pending_signal()?;
        esc.emit_pulse(signal);
        self.frames += 1;

        if self.frames - self.last_log_frames >= LOG_INTERVAL_FRAMES {
            info!("Sent {} frames ({} ticks, last {:?})", self.frames, self.ticks, signal);
            self.last_log_frames = self.frames;
        }

        Some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscConfig;
    use crate::dshot::command::CommandRepeat;
    use crate::esc::protocol::Protocol;
    use crate::hal::mocks::{DelayEvent, RecordingDelay, RecordingGpio};
    use crate::hal::Level;
    use crate::store::MemoryStore;
    use crate::transmitter::SignalTransmitter;

    fn controller() -> (EscController<RecordingGpio, RecordingDelay, MemoryStore>, RecordingGpio) {
        let gpio = RecordingGpio::new();
        let transmitter = SignalTransmitter::new(gpio.clone(), RecordingDelay::new());
        let esc = EscController::new(
            transmitter,
            MemoryStore::new(),
            &EscConfig::default(),
            CommandRepeat::default(),
        );
        gpio.clear();
        (esc, gpio)
    }

    #[test]
    fn test_default_period() {
        let control = ControlLoop::default();
        assert_eq!(control.period(), Duration::from_millis(20));
    }

    #[test]
    fn test_disarmed_tick_is_silent() {
        let (mut esc, gpio) = controller();
        let mut control = ControlLoop::default();

        for _ in 0..5 {
            assert_eq!(control.tick(&mut esc), None);
        }
        assert_eq!(control.ticks(), 5);
        assert_eq!(control.frames(), 0);
        assert!(gpio.events().is_empty());
    }

    #[test]
    fn test_armed_pwm_tick_emits_pulse() {
        let gpio = RecordingGpio::new();
        let delay = RecordingDelay::new();
        let mut esc = EscController::new(
            SignalTransmitter::new(gpio.clone(), delay.clone()),
            MemoryStore::new(),
            &EscConfig::default(),
            CommandRepeat::default(),
        );
        let mut control = ControlLoop::default();
        esc.arm();
        esc.set_throttle(1600);
        gpio.clear();

        assert_eq!(control.tick(&mut esc), Some(Signal::Pwm(1600)));
        assert_eq!(gpio.writes(), vec![(5, Level::High), (5, Level::Low)]);
        // LOW tail is left to the tick period
        assert_eq!(delay.events(), vec![DelayEvent::Us(1600)]);
        assert_eq!(control.frames(), 1);
    }

    #[test]
    fn test_armed_dshot_tick_emits_frame() {
        let (mut esc, gpio) = controller();
        let mut control = ControlLoop::default();
        esc.configure(None, Some(Protocol::DShot600));
        esc.arm();
        gpio.clear();

        let signal = control.tick(&mut esc);
        assert_eq!(
            signal,
            Some(Signal::DShot { value: 48, protocol: Protocol::DShot600 })
        );
        assert_eq!(gpio.pulse_count(), 16);
    }

    #[test]
    fn test_zero_throttle_tick_is_silent() {
        let (mut esc, gpio) = controller();
        let mut control = ControlLoop::default();
        esc.configure(None, Some(Protocol::DShot300));
        esc.arm();
        esc.set_throttle(0);
        gpio.clear();

        assert_eq!(control.tick(&mut esc), None);
        assert!(gpio.events().is_empty());
    }

    #[test]
    fn test_tick_does_not_mutate_state() {
        let (mut esc, _) = controller();
        let mut control = ControlLoop::default();
        esc.arm();
        esc.set_throttle(1800);
        let before = esc.status();

        for _ in 0..LOG_INTERVAL_FRAMES + 1 {
            control.tick(&mut esc);
        }
        assert_eq!(esc.status(), before);
        assert_eq!(control.frames(), LOG_INTERVAL_FRAMES + 1);
    }

    #[test]
    fn test_disarm_stops_emission() {
        let (mut esc, gpio) = controller();
        let mut control = ControlLoop::default();
        esc.arm();
        control.tick(&mut esc);

        esc.disarm();
        gpio.clear();
        assert_eq!(control.tick(&mut esc), None);
        assert!(gpio.events().is_empty());
    }
}
