//! Simulated TWI controller
//!
//! A software model of the controller's master-mode state machine with a
//! single register-mapped device attached. It reacts to control register
//! writes the way the hardware does (set `TWINT` and a status code once an
//! action completes, clear `TWSTO` once STOP has been sent) and records
//! every bus action in an event trace, so host tests can check exact
//! protocol sequences.
//!
//! Faults can be injected on both sides: a device that is busy, refuses
//! reads or refuses data, and a controller whose interrupt or stop flag
//! never changes, from the start or partway through a read.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use twinwire_hal::twi::control::{TWEA, TWEN, TWINT, TWSTA, TWSTO};
use twinwire_hal::twi::PRESCALER_MASK;
use twinwire_hal::{Direction, Status, TwiRegisters};

/// Maximum number of events kept in the trace
pub const EVENT_CAPACITY: usize = 512;

/// Bus action observed by the simulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// START or repeated START
    Start,
    /// Address byte (address and direction bit)
    Address(u8),
    /// Data byte transmitted by the master
    Transmit(u8),
    /// Data byte received by the master, with the acknowledge it returned
    Receive { ack: bool },
    /// STOP
    Stop,
    /// Control register cleared
    Disable,
}

/// Register-mapped device on the simulated bus
///
/// Behaves like a typical EEPROM or sensor: the first byte written after
/// the address sets the register pointer, later bytes are stored there,
/// and the pointer auto-increments on every access.
#[derive(Debug, Clone)]
pub struct SimDevice {
    address: u8,
    registers: [u8; 256],
    busy_for: u8,
    nack_read_address: bool,
    nack_data: bool,
}

impl SimDevice {
    /// Create a responsive device with all registers zero
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            busy_for: 0,
            nack_read_address: false,
            nack_data: false,
        }
    }

    /// Preload registers starting at `start`
    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (offset, &value) in values.iter().enumerate() {
            let index = (start as usize + offset) % self.registers.len();
            self.registers[index] = value;
        }
        self
    }

    /// NACK the next `count` address phases, as during a write cycle
    pub fn busy_for(mut self, count: u8) -> Self {
        self.busy_for = count;
        self
    }

    /// NACK every address phase in read direction
    pub fn nack_read_address(mut self) -> Self {
        self.nack_read_address = true;
        self
    }

    /// NACK every data byte after the register pointer
    pub fn nack_data(mut self) -> Self {
        self.nack_data = true;
        self
    }

    /// Current value of a register
    pub fn register(&self, index: u8) -> u8 {
        self.registers[index as usize]
    }

    /// 7-bit address the device answers to
    pub fn address(&self) -> u8 {
        self.address
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusState {
    Idle,
    AddressPending,
    Transmitting { pointer_set: bool },
    Receiving,
    Refused,
}

/// Simulated controller implementing [`TwiRegisters`]
#[derive(Debug, Clone)]
pub struct SimController {
    control: u8,
    status: Status,
    prescaler: u8,
    data: u8,
    bit_rate: u8,
    state: BusState,
    in_transaction: bool,
    pointer: u8,
    device: Option<SimDevice>,
    events: Vec<BusEvent, EVENT_CAPACITY>,
    control_reads: u32,
    stuck_interrupt: bool,
    stuck_stop: bool,
    receives_before_stall: Option<u32>,
}

impl Default for SimController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimController {
    /// Create an idle controller with nothing on the bus
    pub fn new() -> Self {
        Self {
            control: 0,
            status: Status::Idle,
            prescaler: 0,
            data: 0,
            bit_rate: 0,
            state: BusState::Idle,
            in_transaction: false,
            pointer: 0,
            device: None,
            events: Vec::new(),
            control_reads: 0,
            stuck_interrupt: false,
            stuck_stop: false,
            receives_before_stall: None,
        }
    }

    /// Attach a device to the bus
    pub fn with_device(mut self, device: SimDevice) -> Self {
        self.device = Some(device);
        self
    }

    /// Never set `TWINT`, as with SCL held low by a wedged device
    pub fn stuck_interrupt(mut self) -> Self {
        self.stuck_interrupt = true;
        self
    }

    /// Stop setting `TWINT` after `count` received bytes, as with a device
    /// that holds SCL low in the middle of a read
    pub fn stall_receive_after(mut self, count: u32) -> Self {
        self.receives_before_stall = Some(count);
        self
    }

    /// Never clear `TWSTO` after a STOP request
    pub fn stuck_stop(mut self) -> Self {
        self.stuck_stop = true;
        self
    }

    /// Recorded bus actions, oldest first
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded bus actions
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Attached device, if any
    pub fn device(&self) -> Option<&SimDevice> {
        self.device.as_ref()
    }

    /// Current control register value
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Current status code (prescaler bits excluded)
    pub fn status_code(&self) -> u8 {
        self.status.code()
    }

    /// Value last written to the bit-rate register
    pub fn bit_rate(&self) -> u8 {
        self.bit_rate
    }

    /// Prescaler bits of the status register
    pub fn prescaler(&self) -> u8 {
        self.prescaler
    }

    /// Number of control register reads, i.e. flag polls
    pub fn control_reads(&self) -> u32 {
        self.control_reads
    }

    fn record(&mut self, event: BusEvent) {
        // Trace is diagnostic only; drop events beyond capacity
        let _ = self.events.push(event);
    }

    fn complete(&mut self, status: Status) {
        self.status = status;
        if !self.stuck_interrupt {
            self.control |= TWINT;
        }
    }

    fn address_phase(&mut self) -> Status {
        let byte = self.data;
        self.record(BusEvent::Address(byte));

        let direction = if byte & 1 == 0 {
            Direction::Write
        } else {
            Direction::Read
        };

        let acked = match self.device.as_mut() {
            Some(device) if device.address == byte >> 1 => {
                if device.busy_for > 0 {
                    device.busy_for -= 1;
                    false
                } else {
                    !(direction == Direction::Read && device.nack_read_address)
                }
            }
            _ => false,
        };

        if !acked {
            self.state = BusState::Refused;
            return match direction {
                Direction::Write => Status::AddressWriteNack,
                Direction::Read => Status::AddressReadNack,
            };
        }

        self.state = match direction {
            Direction::Write => BusState::Transmitting { pointer_set: false },
            Direction::Read => BusState::Receiving,
        };
        direction.address_ack()
    }

    fn transmit_phase(&mut self, pointer_set: bool) -> Status {
        let byte = self.data;
        self.record(BusEvent::Transmit(byte));

        let Some(device) = self.device.as_mut() else {
            return Status::DataWriteNack;
        };

        if !pointer_set {
            self.pointer = byte;
            self.state = BusState::Transmitting { pointer_set: true };
            return Status::DataWriteAck;
        }

        if device.nack_data {
            return Status::DataWriteNack;
        }

        device.registers[self.pointer as usize] = byte;
        self.pointer = self.pointer.wrapping_add(1);
        Status::DataWriteAck
    }

    fn receive_phase(&mut self, ack: bool) -> Status {
        self.record(BusEvent::Receive { ack });

        match self.receives_before_stall {
            Some(0) => self.stuck_interrupt = true,
            Some(n) => self.receives_before_stall = Some(n - 1),
            None => {}
        }

        if let Some(device) = self.device.as_ref() {
            self.data = device.registers[self.pointer as usize];
        }
        self.pointer = self.pointer.wrapping_add(1);

        if ack {
            Status::DataReadAck
        } else {
            Status::DataReadNack
        }
    }
}

impl TwiRegisters for SimController {
    fn read_control(&mut self) -> u8 {
        self.control_reads += 1;
        self.control
    }

    fn write_control(&mut self, value: u8) {
        if value == 0 {
            self.control = 0;
            self.status = Status::Idle;
            self.state = BusState::Idle;
            self.in_transaction = false;
            self.record(BusEvent::Disable);
            return;
        }

        // Writing one to TWINT clears the flag and starts the action
        self.control = value & !TWINT;
        if value & TWINT == 0 || value & TWEN == 0 {
            return;
        }

        if value & TWSTA != 0 {
            self.record(BusEvent::Start);
            let status = if self.in_transaction {
                Status::RepeatedStart
            } else {
                Status::Start
            };
            self.in_transaction = true;
            self.state = BusState::AddressPending;
            self.complete(status);
        } else if value & TWSTO != 0 {
            self.record(BusEvent::Stop);
            self.in_transaction = false;
            self.state = BusState::Idle;
            self.status = Status::Idle;
            if !self.stuck_stop {
                self.control &= !TWSTO;
            }
        } else {
            let status = match self.state {
                BusState::AddressPending => self.address_phase(),
                BusState::Transmitting { pointer_set } => self.transmit_phase(pointer_set),
                BusState::Receiving => self.receive_phase(value & TWEA != 0),
                BusState::Idle | BusState::Refused => Status::BusError,
            };
            self.complete(status);
        }
    }

    fn read_status(&mut self) -> u8 {
        self.status.code() | self.prescaler
    }

    fn write_status(&mut self, value: u8) {
        self.prescaler = value & PRESCALER_MASK;
    }

    fn read_data(&mut self) -> u8 {
        self.data
    }

    fn write_data(&mut self, value: u8) {
        self.data = value;
    }

    fn write_bit_rate(&mut self, value: u8) {
        self.bit_rate = value;
    }
}

/// Delay provider that only counts what it was asked to wait
#[derive(Debug, Clone, Copy, Default)]
pub struct SimDelay {
    /// Number of delay calls
    pub calls: u32,
    /// Sum of requested delays (ns)
    pub total_ns: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_repeated_start() {
        let mut sim = SimController::new();
        sim.write_control(TWINT | TWSTA | TWEN);
        assert_eq!(sim.status_code(), Status::Start.code());
        assert_ne!(sim.control() & TWINT, 0);

        sim.write_control(TWINT | TWSTA | TWEN);
        assert_eq!(sim.status_code(), Status::RepeatedStart.code());
    }

    #[test]
    fn test_stop_clears_flag_without_interrupt() {
        let mut sim = SimController::new();
        sim.write_control(TWINT | TWSTO | TWEN);
        assert_eq!(sim.control() & (TWSTO | TWINT), 0);
        assert_eq!(sim.status_code(), Status::Idle.code());
    }

    #[test]
    fn test_status_keeps_prescaler_bits() {
        let mut sim = SimController::new();
        sim.write_status(0xFF);
        assert_eq!(sim.prescaler(), 0x03);
        assert_eq!(sim.read_status(), 0xFB);
    }

    #[test]
    fn test_data_outside_transaction_is_bus_error() {
        let mut sim = SimController::new();
        sim.write_data(0x42);
        sim.write_control(TWINT | TWEN);
        assert_eq!(sim.status_code(), Status::BusError.code());
    }

    #[test]
    fn test_receive_stalls_after_count() {
        let device = SimDevice::new(0x50).with_registers(0x00, &[0x11, 0x22]);
        let mut sim = SimController::new()
            .with_device(device)
            .stall_receive_after(1);

        sim.write_control(TWINT | TWSTA | TWEN);
        sim.write_data(0xA1);
        sim.write_control(TWINT | TWEN);

        sim.write_control(TWINT | TWEA | TWEN);
        assert_ne!(sim.control() & TWINT, 0);
        assert_eq!(sim.read_data(), 0x11);

        sim.write_control(TWINT | TWEA | TWEN);
        assert_eq!(sim.control() & TWINT, 0);
    }

    #[test]
    fn test_busy_device_recovers() {
        let mut sim = SimController::new().with_device(SimDevice::new(0x50).busy_for(1));

        sim.write_control(TWINT | TWSTA | TWEN);
        sim.write_data(0xA0);
        sim.write_control(TWINT | TWEN);
        assert_eq!(sim.status_code(), Status::AddressWriteNack.code());

        sim.write_control(TWINT | TWSTO | TWEN);
        sim.write_control(TWINT | TWSTA | TWEN);
        sim.write_data(0xA0);
        sim.write_control(TWINT | TWEN);
        assert_eq!(sim.status_code(), Status::AddressWriteAck.code());
    }
}
