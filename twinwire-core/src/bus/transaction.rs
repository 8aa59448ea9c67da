//! Register transactions
//!
//! Public read/write operations composed from the bus primitives. Both
//! directions open with START + address(write) + register address; reads
//! then switch direction with a repeated START.
//!
//! Any failure converges on the same path: best-effort STOP, unconditional
//! disable, and for reads a zero-filled buffer. Callers never see partial
//! data.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use twinwire_hal::twi::control::TWSTO;
use twinwire_hal::{Direction, TwiRegisters};

use super::TwiBus;
use crate::error::{Error, Phase};

/// Highest valid 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// First address probed by [`TwiBus::scan`] (0x00-0x07 are reserved)
pub const SCAN_FIRST: u8 = 0x08;

/// Last address probed by [`TwiBus::scan`] (0x78-0x7F are reserved)
pub const SCAN_LAST: u8 = 0x77;

/// Number of addresses covered by a scan
pub const SCAN_CAPACITY: usize = (SCAN_LAST - SCAN_FIRST + 1) as usize;

pub(crate) fn check_address(address: u8) -> Result<(), Error> {
    if address > MAX_ADDRESS {
        Err(Error::InvalidAddress(address))
    } else {
        Ok(())
    }
}

impl<R: TwiRegisters, D: DelayNs> TwiBus<R, D> {
    /// Write one byte to a device register
    ///
    /// Sequence: START(write) → register → data → STOP. The opening START
    /// is retried while the device is busy.
    pub fn write(&mut self, address: u8, register: u8, data: u8) -> Result<(), Error> {
        self.write_all(address, register, &[data])
    }

    /// Write consecutive device registers starting at `register`
    pub fn write_all(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        check_address(address)?;

        let result = self.write_sequence(address, register, data);
        if let Err(err) = result {
            self.fail(err);
        }
        result
    }

    fn write_sequence(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        self.start(address, Direction::Write, true)?;
        self.transmit_byte(register)?;
        for &byte in data {
            self.transmit_byte(byte)?;
        }
        self.stop()
    }

    /// Read one byte from a device register
    ///
    /// Same as [`TwiBus::read_into`] with a one-byte buffer; `dest` is set
    /// to zero on failure.
    pub fn read(&mut self, address: u8, register: u8, dest: &mut u8) -> Result<(), Error> {
        self.read_into(address, register, core::slice::from_mut(dest))
    }

    /// Read `buf.len()` consecutive registers starting at `register`
    ///
    /// Sequence: START(write) → register → repeated START(read) → receive
    /// with ACK on every byte but the last, which gets NACK → STOP. Only
    /// the opening START is retried.
    ///
    /// On failure every byte of `buf` is zero.
    pub fn read_into(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if let Err(err) = check_address(address) {
            buf.fill(0);
            return Err(err);
        }

        let result = self.read_sequence(address, register, buf);
        if let Err(err) = result {
            self.fail(err);
            buf.fill(0);
        }
        result
    }

    fn read_sequence(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.start(address, Direction::Write, true)?;
        self.transmit_byte(register)?;
        self.start(address, Direction::Read, false)?;
        self.receive_into(buf, false)?;
        self.stop()
    }

    /// Fill `buf` from the device, NACKing the final byte unless
    /// `more_follows`
    pub(crate) fn receive_into(&mut self, buf: &mut [u8], more_follows: bool) -> Result<(), Error> {
        let last = buf.len().saturating_sub(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.receive_byte(i != last || more_follows)?;
        }
        Ok(())
    }

    /// Check whether a device answers at `address`
    ///
    /// Sends START + address(write) once, without waiting for a busy
    /// device, then STOP. An address NACK is reported as `Ok(false)`;
    /// timeouts and other bus faults, including a STOP that never
    /// completes after the NACK, are errors.
    pub fn probe(&mut self, address: u8) -> Result<bool, Error> {
        check_address(address)?;

        match self.start(address, Direction::Write, false) {
            Ok(()) => match self.stop() {
                Ok(()) => Ok(true),
                Err(err) => {
                    self.fail(err);
                    Err(err)
                }
            },
            Err(err) if err.is_address_nack() => {
                // STOP was already sent by the failed START
                if !self.wait_for_flag(TWSTO, false) {
                    let err = Error::Timeout(Phase::Stop);
                    self.fail(err);
                    return Err(err);
                }
                self.disable();
                Ok(false)
            }
            Err(err) => {
                self.fail(err);
                Err(err)
            }
        }
    }

    /// Probe every non-reserved address and collect the responders
    ///
    /// Stops at the first bus fault other than an address NACK.
    pub fn scan(&mut self) -> Result<Vec<u8, SCAN_CAPACITY>, Error> {
        let mut found = Vec::new();
        for address in SCAN_FIRST..=SCAN_LAST {
            if self.probe(address)? {
                // Capacity covers the whole scan range
                let _ = found.push(address);
            }
        }
        debug!("Scan found {} devices", found.len());
        Ok(found)
    }

    pub(crate) fn fail(&mut self, err: Error) {
        warn!("Transaction failed: {}", err);
        self.recover();
    }
}
