//! Polling bus-master driver for two-wire (I2C/TWI) controllers
//!
//! This crate drives a byte-synchronous TWI controller through the
//! register contract in `twinwire-hal`:
//!
//! - Bus primitives: START/repeated START, STOP, byte transmit and
//!   receive, each bounded by a configurable poll budget
//! - Register transactions: single and multi-byte reads and writes with
//!   busy-device retry on the opening START
//! - Recovery: every failure ends with STOP, controller disable and a
//!   zero-filled read buffer
//! - `embedded-hal` 1.0 `I2c` implementation for ecosystem drivers
//! - A simulated controller for host-side tests (`sim` feature)
//!
//! Slave mode, multi-master arbitration handling and DMA are out of scope;
//! the driver is single-threaded and never suspends except in its poll
//! loops.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod config;
pub mod error;
pub mod hal_impl;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::TwiBus;
pub use config::{BusConfig, PollTimeout};
pub use error::{ConfigError, Error, Phase};
