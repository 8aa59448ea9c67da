//! Bus error types

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use twinwire_hal::Status;

/// Bus phase in which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// START or repeated START condition
    Start,
    /// Address + direction byte
    Address,
    /// Master transmitting a data byte
    Transmit,
    /// Master receiving a data byte
    Receive,
    /// STOP condition
    Stop,
}

/// Errors from bus transactions
///
/// Whatever the variant, the controller has been stopped and disabled
/// before the error is returned, and read buffers are zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Controller did not complete the phase within the poll budget
    Timeout(Phase),
    /// Controller reported a status other than the one expected
    UnexpectedStatus {
        /// Phase being checked
        phase: Phase,
        /// Raw status code (prescaler bits masked off)
        status: u8,
    },
    /// Device NACKed its address on every START attempt
    NotReady {
        /// START attempts made
        attempts: u8,
    },
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
    /// Zero-length read requested
    EmptyBuffer,
}

impl Error {
    /// Decoded status code, if the error carries one
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::UnexpectedStatus { status, .. } => Status::from_register(*status),
            _ => None,
        }
    }

    /// Check if the device refused its address (read or write direction)
    pub fn is_address_nack(&self) -> bool {
        match self {
            Error::UnexpectedStatus {
                phase: Phase::Address,
                status,
            } => Status::from_register(*status).is_some_and(Status::is_address_nack),
            _ => false,
        }
    }

    /// Check if the error was a poll timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NotReady { .. } => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::UnexpectedStatus { .. } => match self.status() {
                Some(Status::AddressWriteNack | Status::AddressReadNack) => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                }
                Some(Status::DataWriteNack) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
                Some(Status::ArbitrationLost) => ErrorKind::ArbitrationLoss,
                Some(Status::BusError) => ErrorKind::Bus,
                _ => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }
}

/// Errors detected while creating a bus handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Bus frequency of zero
    ZeroFrequency,
    /// Bus frequency above input clock / 16
    BusFrequencyTooHigh,
    /// Bus frequency needs a divisor above 255
    BusFrequencyTooLow,
    /// Poll interval of zero
    ZeroPollInterval,
    /// START attempt bound of zero
    ZeroStartAttempts,
    /// Another handle already owns this controller
    ControllerInUse,
}
