//! Twinwire Hardware Abstraction Layer
//!
//! This crate defines the register-level contract between the two-wire bus
//! driver in `twinwire-core` and a concrete controller. Chip support crates
//! (or a PAC wrapper in the application) implement [`twi::TwiRegisters`]
//! over the memory-mapped register block; the driver never touches
//! addresses itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Peripheral drivers (EEPROM, IMU, ...)  │
//! └─────────────────────────────────────────┘
//!                     │  RegisterBus / embedded-hal I2c
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twinwire-core (TwiBus state machine)   │
//! └─────────────────────────────────────────┘
//!                     │  TwiRegisters
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twinwire-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`twi::TwiRegisters`] - Control/status/data/bit-rate register access
//! - [`twi::Status`] - Master-mode status codes
//! - [`i2c::RegisterBus`] - Register-oriented bus operations
//! - [`claim::ControllerClaim`] - Exclusive ownership of a physical controller

#![no_std]
#![deny(unsafe_code)]

pub mod claim;
pub mod i2c;
pub mod twi;

// Re-export key items at crate root for convenience
pub use claim::{ClaimGuard, ControllerClaim};
pub use i2c::{I2cConfig, RegisterBus};
pub use twi::{Direction, Status, TwiRegisters};
