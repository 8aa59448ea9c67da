//! I2C bus abstractions
//!
//! Provides the register-oriented view of an I2C master that peripheral
//! drivers program against, independent of the controller behind it.

/// Register-addressed I2C bus master
///
/// Most I2C peripherals expose a flat map of byte registers: a write sends
/// the register address followed by the data, and a read sends the register
/// address, switches direction with a repeated START and clocks the data out.
pub trait RegisterBus {
    /// Error type for bus operations
    type Error;

    /// Write consecutive registers starting at `register`
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `register` - First register to write
    /// * `data` - Bytes to write; the device auto-increments its pointer
    fn write_registers(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Read consecutive registers starting at `register`
    ///
    /// On failure the buffer is zero-filled; a partially filled buffer is
    /// never returned.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `register` - First register to read
    /// * `buf` - Buffer to read into, one byte per register
    fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write a single register
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write_registers(address, register, &[value])
    }

    /// Read a single register
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_registers(address, register, &mut buf)?;
        Ok(buf[0])
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self {
        frequency: 1_000_000,
    };
}
