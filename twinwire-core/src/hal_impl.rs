//! Trait implementations for peripheral drivers
//!
//! - [`RegisterBus`] maps straight onto the register transactions.
//! - [`embedded_hal::i2c::I2c`] lets drivers from the wider ecosystem run
//!   on top of [`TwiBus`]. Its transactions follow the same rules as the
//!   register ones: only the opening START waits for a busy device, a
//!   repeated START is issued only when the direction changes, and a
//!   failure stops, disables and zero-fills every read buffer.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use twinwire_hal::{Direction, RegisterBus, TwiRegisters};

use crate::bus::transaction::check_address;
use crate::bus::TwiBus;
use crate::error::Error;

impl<R: TwiRegisters, D: DelayNs> RegisterBus for TwiBus<R, D> {
    type Error = Error;

    fn write_registers(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        self.write_all(address, register, data)
    }

    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.read_into(address, register, buf)
    }
}

impl<R, D> ErrorType for TwiBus<R, D> {
    type Error = Error;
}

impl<R: TwiRegisters, D: DelayNs> I2c<SevenBitAddress> for TwiBus<R, D> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        if operations
            .iter()
            .any(|op| matches!(op, Operation::Read(buf) if buf.is_empty()))
        {
            return Err(Error::EmptyBuffer);
        }
        if let Err(err) = check_address(address) {
            zero_reads(operations);
            return Err(err);
        }
        if operations.is_empty() {
            return Ok(());
        }

        let result = self.run_operations(address, operations);
        if let Err(err) = result {
            self.fail(err);
            zero_reads(operations);
        }
        result
    }
}

impl<R: TwiRegisters, D: DelayNs> TwiBus<R, D> {
    fn run_operations(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Error> {
        let mut current: Option<Direction> = None;
        let mut ops = operations.iter_mut().peekable();

        while let Some(op) = ops.next() {
            let next_is_read = matches!(ops.peek(), Some(Operation::Read(_)));
            match op {
                Operation::Write(bytes) => {
                    if current != Some(Direction::Write) {
                        self.start(address, Direction::Write, current.is_none())?;
                        current = Some(Direction::Write);
                    }
                    for &byte in bytes.iter() {
                        self.transmit_byte(byte)?;
                    }
                }
                Operation::Read(buf) => {
                    if current != Some(Direction::Read) {
                        self.start(address, Direction::Read, current.is_none())?;
                        current = Some(Direction::Read);
                    }
                    self.receive_into(buf, next_is_read)?;
                }
            }
        }

        self.stop()
    }
}

fn zero_reads(operations: &mut [Operation<'_>]) {
    for op in operations {
        if let Operation::Read(buf) = op {
            buf.fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::sim::{BusEvent, SimController, SimDelay, SimDevice};
    use BusEvent::*;

    fn bus_with(device: SimDevice) -> TwiBus<SimController, SimDelay> {
        let controller = SimController::new().with_device(device);
        TwiBus::new(controller, SimDelay::default(), BusConfig::default()).unwrap()
    }

    #[test]
    fn test_write_read_matches_register_read() {
        let device = SimDevice::new(0x68).with_registers(0x3B, &[0x01, 0x02]);
        let mut bus = bus_with(device);

        let mut buf = [0u8; 2];
        I2c::write_read(&mut bus, 0x68, &[0x3B], &mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02]);
        assert_eq!(
            bus.registers().events(),
            &[
                Start,
                Address(0xD0),
                Transmit(0x3B),
                Start,
                Address(0xD1),
                Receive { ack: true },
                Receive { ack: false },
                Stop
            ]
        );
    }

    #[test]
    fn test_adjacent_operations_merge() {
        let mut bus = bus_with(SimDevice::new(0x50));

        let mut ops = [
            Operation::Write(&[0x00]),
            Operation::Write(&[0xAA, 0xBB]),
        ];
        bus.transaction(0x50, &mut ops).unwrap();
        assert_eq!(
            bus.registers().events(),
            &[
                Start,
                Address(0xA0),
                Transmit(0x00),
                Transmit(0xAA),
                Transmit(0xBB),
                Stop
            ]
        );
    }

    #[test]
    fn test_consecutive_reads_ack_across_boundary() {
        let device = SimDevice::new(0x50).with_registers(0x00, &[1, 2, 3]);
        let mut bus = bus_with(device);

        let mut first = [0u8; 2];
        let mut second = [0u8; 1];
        let mut ops = [Operation::Read(&mut first), Operation::Read(&mut second)];
        bus.transaction(0x50, &mut ops).unwrap();

        assert_eq!(first, [1, 2]);
        assert_eq!(second, [3]);
        assert_eq!(
            bus.registers().events(),
            &[
                Start,
                Address(0xA1),
                Receive { ack: true },
                Receive { ack: true },
                Receive { ack: false },
                Stop
            ]
        );
    }

    #[test]
    fn test_failed_transaction_zero_fills() {
        let device = SimDevice::new(0x50)
            .with_registers(0x00, &[7, 7])
            .nack_read_address();
        let mut bus = bus_with(device);

        let mut buf = [0xAA; 2];
        let err = I2c::write_read(&mut bus, 0x50, &[0x00], &mut buf).unwrap_err();
        assert_eq!(err.status(), Some(twinwire_hal::Status::AddressReadNack));
        assert_eq!(buf, [0, 0]);
        assert_eq!(bus.registers().events().last(), Some(&Disable));
    }

    #[test]
    fn test_empty_transaction_is_noop() {
        let mut bus = bus_with(SimDevice::new(0x50));
        bus.transaction(0x50, &mut []).unwrap();
        assert!(bus.registers().events().is_empty());
    }

    #[test]
    fn test_empty_read_rejected() {
        let mut bus = bus_with(SimDevice::new(0x50));
        assert_eq!(I2c::read(&mut bus, 0x50, &mut []), Err(Error::EmptyBuffer));
        assert!(bus.registers().events().is_empty());
    }

    #[test]
    fn test_register_bus_defaults() {
        let mut bus = bus_with(SimDevice::new(0x50));
        bus.write_register(0x50, 0x05, 0x99).unwrap();
        assert_eq!(bus.read_register(0x50, 0x05), Ok(0x99));
    }
}
