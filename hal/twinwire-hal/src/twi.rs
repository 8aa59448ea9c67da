//! Two-wire interface (TWI) controller registers
//!
//! Models the classic byte-synchronous TWI block: a control register that
//! triggers each bus action, a status register holding a coded outcome
//! (with the prescaler in its low bits), a data register, and a bit-rate
//! register that sets the SCL divisor.
//!
//! # Control handshake
//!
//! Software writes the control register with `TWINT` set, which clears the
//! interrupt flag and starts the requested action. Hardware sets `TWINT`
//! again once the action completes and the status register is valid.
//! A STOP is the exception: it never sets `TWINT`, instead hardware clears
//! `TWSTO` once the STOP condition has been sent.

/// Control register bits
pub mod control {
    /// Interrupt flag, set by hardware when an action completes
    pub const TWINT: u8 = 1 << 7;
    /// Enable acknowledge, return ACK after a received byte
    pub const TWEA: u8 = 1 << 6;
    /// Generate a START (or repeated START) condition
    pub const TWSTA: u8 = 1 << 5;
    /// Generate a STOP condition
    pub const TWSTO: u8 = 1 << 4;
    /// Write collision flag
    pub const TWWC: u8 = 1 << 3;
    /// Controller enable
    pub const TWEN: u8 = 1 << 2;
    /// Interrupt enable
    pub const TWIE: u8 = 1 << 0;
}

/// Status bits of the status register; the low bits hold the prescaler
pub const STATUS_MASK: u8 = 0xF8;

/// Prescaler bits of the status register
pub const PRESCALER_MASK: u8 = 0x03;

/// Register-level access to one TWI controller
///
/// Implementations wrap the memory-mapped register block of a single
/// physical controller and must be its only owner: the driver assumes no
/// other code writes these registers while it holds the value.
///
/// All methods take `&mut self` because reading a hardware register can
/// have side effects on some parts, and a simulated controller advances
/// its state on access.
pub trait TwiRegisters {
    /// Read the control register
    fn read_control(&mut self) -> u8;

    /// Write the control register
    fn write_control(&mut self, value: u8);

    /// Read the raw status register (status code and prescaler bits)
    fn read_status(&mut self) -> u8;

    /// Write the status register; only the prescaler bits are writable
    fn write_status(&mut self, value: u8);

    /// Read the data register
    fn read_data(&mut self) -> u8;

    /// Write the data register
    fn write_data(&mut self, value: u8);

    /// Write the bit-rate (SCL divisor) register
    fn write_bit_rate(&mut self, value: u8);
}

/// Transfer direction, encoded in the least significant bit of the
/// address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    /// Master transmits
    Write = 0,
    /// Master receives
    Read = 1,
}

impl Direction {
    /// Build the address byte sent after START
    pub const fn address_byte(self, address: u8) -> u8 {
        (address << 1) | self as u8
    }

    /// Status expected once the address byte in this direction is ACKed
    pub const fn address_ack(self) -> Status {
        match self {
            Direction::Write => Status::AddressWriteAck,
            Direction::Read => Status::AddressReadAck,
        }
    }
}

/// Master-mode status codes
///
/// Values are the status register contents with the prescaler bits masked
/// off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// Illegal START or STOP detected on the bus
    BusError = 0x00,
    /// START transmitted
    Start = 0x08,
    /// Repeated START transmitted
    RepeatedStart = 0x10,
    /// Address + write transmitted, ACK received
    AddressWriteAck = 0x18,
    /// Address + write transmitted, NACK received
    AddressWriteNack = 0x20,
    /// Data transmitted, ACK received
    DataWriteAck = 0x28,
    /// Data transmitted, NACK received
    DataWriteNack = 0x30,
    /// Arbitration lost in address or data
    ArbitrationLost = 0x38,
    /// Address + read transmitted, ACK received
    AddressReadAck = 0x40,
    /// Address + read transmitted, NACK received
    AddressReadNack = 0x48,
    /// Data received, ACK returned
    DataReadAck = 0x50,
    /// Data received, NACK returned
    DataReadNack = 0x58,
    /// No relevant state information, controller idle
    Idle = 0xF8,
}

impl Status {
    /// Decode a raw status register value
    ///
    /// Returns `None` for codes that belong to slave mode.
    pub fn from_register(raw: u8) -> Option<Self> {
        match raw & STATUS_MASK {
            0x00 => Some(Status::BusError),
            0x08 => Some(Status::Start),
            0x10 => Some(Status::RepeatedStart),
            0x18 => Some(Status::AddressWriteAck),
            0x20 => Some(Status::AddressWriteNack),
            0x28 => Some(Status::DataWriteAck),
            0x30 => Some(Status::DataWriteNack),
            0x38 => Some(Status::ArbitrationLost),
            0x40 => Some(Status::AddressReadAck),
            0x48 => Some(Status::AddressReadNack),
            0x50 => Some(Status::DataReadAck),
            0x58 => Some(Status::DataReadNack),
            0xF8 => Some(Status::Idle),
            _ => None,
        }
    }

    /// Status code as it appears in the register
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Check if the addressed device did not acknowledge its address
    pub fn is_address_nack(self) -> bool {
        matches!(self, Status::AddressWriteNack | Status::AddressReadNack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_byte() {
        assert_eq!(Direction::Write.address_byte(0x50), 0xA0);
        assert_eq!(Direction::Read.address_byte(0x50), 0xA1);
        assert_eq!(Direction::Read.address_byte(0x7F), 0xFF);
    }

    #[test]
    fn test_status_ignores_prescaler_bits() {
        assert_eq!(Status::from_register(0x08), Some(Status::Start));
        assert_eq!(Status::from_register(0x0B), Some(Status::Start));
        assert_eq!(Status::from_register(0x5A), Some(Status::DataReadNack));
    }

    #[test]
    fn test_slave_codes_are_unknown() {
        // 0x60: own SLA+W received (slave receiver)
        assert_eq!(Status::from_register(0x60), None);
        assert_eq!(Status::from_register(0xA8), None);
    }

    #[test]
    fn test_codes_round_trip_through_register() {
        for status in [
            Status::BusError,
            Status::Start,
            Status::RepeatedStart,
            Status::AddressWriteAck,
            Status::DataReadNack,
            Status::Idle,
        ] {
            assert_eq!(Status::from_register(status.code()), Some(status));
        }
    }

    #[test]
    fn test_address_ack_per_direction() {
        assert_eq!(Direction::Write.address_ack(), Status::AddressWriteAck);
        assert_eq!(Direction::Read.address_ack(), Status::AddressReadAck);
        assert!(Status::AddressReadNack.is_address_nack());
        assert!(!Status::DataWriteNack.is_address_nack());
    }
}
