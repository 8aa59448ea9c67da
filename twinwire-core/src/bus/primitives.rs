//! Bus primitives
//!
//! Single bus actions. Each one writes the control register, waits for the
//! controller to finish within the poll budget and checks the status code
//! for the outcome expected in that phase. None of them recovers from a
//! failure; that is left to the transaction layer.

use embedded_hal::delay::DelayNs;
use twinwire_hal::twi::control::{TWEA, TWEN, TWINT, TWSTA, TWSTO};
use twinwire_hal::twi::STATUS_MASK;
use twinwire_hal::{Direction, Status, TwiRegisters};

use super::TwiBus;
use crate::error::{Error, Phase};

impl<R: TwiRegisters, D: DelayNs> TwiBus<R, D> {
    /// Poll a control register flag until it reads `set`
    ///
    /// Returns `false` once the poll budget is exhausted. This is the only
    /// place the driver blocks.
    pub(crate) fn wait_for_flag(&mut self, flag: u8, set: bool) -> bool {
        for _ in 0..self.limits.max_polls {
            if (self.regs.read_control() & flag != 0) == set {
                return true;
            }
            self.delay.delay_ns(self.limits.poll_interval_ns);
        }
        false
    }

    fn wait_complete(&mut self, phase: Phase) -> Result<(), Error> {
        if self.wait_for_flag(TWINT, true) {
            Ok(())
        } else {
            trace!("{} timed out", phase);
            Err(Error::Timeout(phase))
        }
    }

    fn expect_status(&mut self, phase: Phase, expected: &[Status]) -> Result<Status, Error> {
        let raw = self.regs.read_status() & STATUS_MASK;
        match Status::from_register(raw) {
            Some(status) if expected.contains(&status) => Ok(status),
            _ => {
                trace!("{}: unexpected status {=u8:#x}", phase, raw);
                Err(Error::UnexpectedStatus { phase, status: raw })
            }
        }
    }

    /// Send START (or repeated START) followed by the address byte
    ///
    /// With `wait_ready` set, a failed attempt issues STOP and the whole
    /// sequence is retried up to the configured attempt bound, giving a
    /// device time to finish an internal operation. Without it a single
    /// failure is final; that form is used for the repeated START inside
    /// an open transaction, where a retry would hide a bus fault.
    ///
    /// Exhausted retries report [`Error::NotReady`] only when the last
    /// attempt ended in an address NACK. Any other last failure (a timeout
    /// on a wedged bus, a bus error) is returned as is.
    pub(crate) fn start(
        &mut self,
        address: u8,
        direction: Direction,
        wait_ready: bool,
    ) -> Result<(), Error> {
        let attempts = if wait_ready {
            self.limits.start_attempts
        } else {
            1
        };

        let mut last = Error::NotReady { attempts };
        for attempt in 1..=attempts {
            match self.start_once(address, direction) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    trace!("START attempt {} to {=u8:#x} failed", attempt, address);
                    // Release the bus before retrying or handing back
                    let _ = self.stop();
                    last = err;
                }
            }
        }

        if wait_ready && last.is_address_nack() {
            warn!("Device {=u8:#x} not ready after {} attempts", address, attempts);
            Err(Error::NotReady { attempts })
        } else {
            Err(last)
        }
    }

    fn start_once(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        self.regs.write_control(TWINT | TWSTA | TWEN);
        self.wait_complete(Phase::Start)?;
        self.expect_status(Phase::Start, &[Status::Start, Status::RepeatedStart])?;

        self.regs.write_data(direction.address_byte(address));
        self.regs.write_control(TWINT | TWEN);
        self.wait_complete(Phase::Address)?;
        self.expect_status(Phase::Address, &[direction.address_ack()])?;
        Ok(())
    }

    /// Send STOP and wait for the controller to clear the stop flag
    pub(crate) fn stop(&mut self) -> Result<(), Error> {
        self.regs.write_control(TWINT | TWSTO | TWEN);
        if self.wait_for_flag(TWSTO, false) {
            Ok(())
        } else {
            trace!("STOP timed out");
            Err(Error::Timeout(Phase::Stop))
        }
    }

    /// Transmit one data byte and require an ACK
    pub(crate) fn transmit_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.regs.write_data(byte);
        self.regs.write_control(TWINT | TWEN);
        self.wait_complete(Phase::Transmit)?;
        self.expect_status(Phase::Transmit, &[Status::DataWriteAck])?;
        Ok(())
    }

    /// Receive one data byte
    ///
    /// `ack` returns ACK to the device (more bytes follow); otherwise NACK
    /// marks this byte as the last of the transfer.
    pub(crate) fn receive_byte(&mut self, ack: bool) -> Result<u8, Error> {
        let ea = if ack { TWEA } else { 0 };
        self.regs.write_control(TWINT | TWEN | ea);
        self.wait_complete(Phase::Receive)?;
        self.expect_status(Phase::Receive, &[Status::DataReadAck, Status::DataReadNack])?;
        Ok(self.regs.read_data())
    }

    /// Disable the controller, aborting anything in flight
    ///
    /// The next START re-enables it. Only needed after a failure; every
    /// transaction already calls it on its error path.
    pub fn disable(&mut self) {
        self.regs.write_control(0);
    }

    /// Best-effort STOP followed by an unconditional disable
    pub(crate) fn recover(&mut self) {
        debug!("Recovering bus: STOP + disable");
        let _ = self.stop();
        self.disable();
    }
}
