//! # DShot Protocol Module
//!
//! Implementation of the digital DShot ESC protocol.
//!
//! This module handles:
//! - Bit timing per speed grade (DShot150/300/600)
//! - 16-bit frame encoding (11-bit value, telemetry flag, 4-bit CRC)
//! - Special command codes and their repetition policy

pub mod timing;
pub mod frame;
pub mod command;
