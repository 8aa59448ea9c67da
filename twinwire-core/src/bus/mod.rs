//! Two-wire bus handle
//!
//! [`TwiBus`] owns the register set of one controller. It is layered in
//! three parts:
//!
//! - Initialization (this module): prescaler and bit-rate setup
//! - Bus primitives ([`primitives`]): START, STOP, byte transmit/receive,
//!   each gated by a bounded flag poll
//! - Transactions ([`transaction`]): register reads and writes composed
//!   from the primitives, with recovery on any failure
//!
//! Only the primitive layer touches the registers after initialization.
//! Every transaction leaves the controller either idle after a STOP or
//! fully disabled.

use embedded_hal::delay::DelayNs;
use twinwire_hal::{ClaimGuard, ControllerClaim, TwiRegisters};

use crate::config::{BusConfig, ValidatedConfig};
use crate::error::ConfigError;

pub mod primitives;
pub mod transaction;

/// Bus master handle for one TWI controller
///
/// The handle is a capability: it exclusively owns the register set and
/// must not be aliased. Operations block until they complete or their
/// poll budget runs out; there is no cancellation.
///
/// # Example
/// ```
/// use twinwire_core::sim::{SimController, SimDelay, SimDevice};
/// use twinwire_core::{BusConfig, TwiBus};
///
/// let controller = SimController::new().with_device(SimDevice::new(0x50));
/// let mut bus = TwiBus::new(controller, SimDelay::default(), BusConfig::default()).unwrap();
///
/// bus.write(0x50, 0x10, 0xAB).unwrap();
/// let mut value = 0;
/// bus.read(0x50, 0x10, &mut value).unwrap();
/// assert_eq!(value, 0xAB);
/// ```
pub struct TwiBus<R, D> {
    regs: R,
    delay: D,
    config: BusConfig,
    limits: ValidatedConfig,
    _claim: Option<ClaimGuard>,
}

impl<R: TwiRegisters, D: DelayNs> TwiBus<R, D> {
    /// Create a bus handle and initialize the controller
    ///
    /// The caller guarantees that `regs` is the only handle to this
    /// controller, typically because it was taken from a PAC singleton.
    /// Use [`TwiBus::new_exclusive`] to have aliasing checked.
    pub fn new(regs: R, delay: D, config: BusConfig) -> Result<Self, ConfigError> {
        Self::build(regs, delay, config, None)
    }

    /// Create a bus handle that holds the controller's claim flag
    ///
    /// Fails with [`ConfigError::ControllerInUse`] while another handle
    /// holds the same claim. The claim is released when the handle is
    /// dropped or freed.
    pub fn new_exclusive(
        regs: R,
        delay: D,
        config: BusConfig,
        claim: &'static ControllerClaim,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let guard = claim.try_claim().ok_or(ConfigError::ControllerInUse)?;
        Self::build(regs, delay, config, Some(guard))
    }

    fn build(
        regs: R,
        delay: D,
        config: BusConfig,
        claim: Option<ClaimGuard>,
    ) -> Result<Self, ConfigError> {
        let limits = config.validate()?;
        let mut bus = Self {
            regs,
            delay,
            config,
            limits,
            _claim: claim,
        };
        bus.init();
        Ok(bus)
    }

    /// Program prescaler and bit-rate registers
    ///
    /// Runs once at construction; calling it again rewrites the same values.
    pub fn init(&mut self) {
        // No prescaling
        self.regs.write_status(0);
        self.regs.write_bit_rate(self.limits.divisor);
        debug!(
            "TWI init: divisor {}, {} polls per wait",
            self.limits.divisor,
            self.limits.max_polls
        );
    }

    /// Configuration the handle was created with
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Shared access to the register set
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Release the register set and delay provider
    pub fn free(self) -> (R, D) {
        (self.regs, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimController, SimDelay};
    use twinwire_hal::I2cConfig;

    #[test]
    fn test_init_programs_divisor() {
        let bus = TwiBus::new(SimController::new(), SimDelay::default(), BusConfig::default())
            .unwrap();
        assert_eq!(bus.registers().bit_rate(), 72);
        assert_eq!(bus.registers().prescaler(), 0);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = BusConfig::new(16_000_000, I2cConfig::FAST);
        let mut bus = TwiBus::new(SimController::new(), SimDelay::default(), config).unwrap();
        bus.init();
        bus.init();
        assert_eq!(bus.registers().bit_rate(), 12);
        assert_eq!(bus.registers().prescaler(), 0);
        assert!(bus.registers().events().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BusConfig::new(1_000_000, I2cConfig::FAST);
        let result = TwiBus::new(SimController::new(), SimDelay::default(), config);
        assert!(matches!(result, Err(ConfigError::BusFrequencyTooHigh)));
    }

    #[test]
    fn test_exclusive_handles_cannot_alias() {
        static TWI0: ControllerClaim = ControllerClaim::new();

        let first = TwiBus::new_exclusive(
            SimController::new(),
            SimDelay::default(),
            BusConfig::default(),
            &TWI0,
        );
        assert!(first.is_ok());

        let second = TwiBus::new_exclusive(
            SimController::new(),
            SimDelay::default(),
            BusConfig::default(),
            &TWI0,
        );
        assert!(matches!(second, Err(ConfigError::ControllerInUse)));

        let (_regs, _delay) = first.unwrap().free();
        assert!(!TWI0.is_claimed());
    }

    #[test]
    fn test_invalid_config_does_not_claim() {
        static TWI1: ControllerClaim = ControllerClaim::new();

        let config = BusConfig::default().with_start_attempts(0);
        let result = TwiBus::new_exclusive(SimController::new(), SimDelay::default(), config, &TWI1);
        assert!(matches!(result, Err(ConfigError::ZeroStartAttempts)));
        assert!(!TWI1.is_claimed());
    }
}
