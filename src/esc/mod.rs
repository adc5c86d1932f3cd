//! # ESC Module
//!
//! Authoritative ESC state and the safety-gated operations that mutate it.
//!
//! This module handles:
//! - Protocol and direction definitions with their throttle ranges
//! - The arm/disarm state machine
//! - Special-command dispatch (direction, brake)
//! - Persisting durable settings

pub mod protocol;
pub mod controller;
