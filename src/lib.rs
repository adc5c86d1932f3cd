//! # ESC Driver Library
//!
//! Drive an Electronic Speed Controller with PWM or DShot.
//!
//! This library provides the signal engine (frame encoding, bit timing,
//! waveform transmission), the safety-gated ESC controller (arm/disarm,
//! throttle, direction, brake) and the periodic control loop that feeds it.

pub mod api;
pub mod config;
pub mod control_loop;
pub mod dshot;
pub mod error;
pub mod esc;
pub mod hal;
pub mod store;
pub mod transmitter;
