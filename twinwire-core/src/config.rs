//! Bus configuration
//!
//! Board-specific values (input clock, target bus speed, timeout budget)
//! collected into one structure that is validated once when the bus handle
//! is created.

use twinwire_hal::I2cConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default controller input clock (16 MHz)
pub const DEFAULT_INPUT_CLOCK_HZ: u32 = 16_000_000;

/// Default number of START attempts before a device is reported not ready
pub const DEFAULT_START_ATTEMPTS: u8 = 10;

/// Smallest clock ratio the divisor formula accepts (divisor of zero)
const MIN_CLOCK_RATIO: u32 = 16;

/// Bounded wait applied to every flag poll
///
/// The poll count is `max_wait_ns / poll_interval_ns`, at least one.
/// The default (500 ns × 200 polls) reproduces a 200-iteration busy loop
/// with a known wall-clock ceiling of 100 µs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollTimeout {
    /// Delay between two reads of the flag (ns)
    pub poll_interval_ns: u32,
    /// Total time to wait before giving up (ns)
    pub max_wait_ns: u32,
}

impl Default for PollTimeout {
    fn default() -> Self {
        Self {
            poll_interval_ns: 500,
            max_wait_ns: 100_000,
        }
    }
}

impl PollTimeout {
    /// Number of flag reads before the wait times out
    pub fn max_polls(&self) -> Result<u32, ConfigError> {
        if self.poll_interval_ns == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok((self.max_wait_ns / self.poll_interval_ns).max(1))
    }
}

/// Two-wire bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Target SCL frequency in Hz
    pub bus_frequency_hz: u32,
    /// Controller input clock in Hz (CPU clock on most AVR parts)
    pub input_clock_hz: u32,
    /// Flag poll budget
    pub timeout: PollTimeout,
    /// START attempts while waiting for a busy device
    ///
    /// Devices such as EEPROMs NACK their address during an internal
    /// write cycle. Only the opening START of a transaction is retried.
    pub start_attempts: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus_frequency_hz: I2cConfig::STANDARD.frequency,
            input_clock_hz: DEFAULT_INPUT_CLOCK_HZ,
            timeout: PollTimeout::default(),
            start_attempts: DEFAULT_START_ATTEMPTS,
        }
    }
}

impl BusConfig {
    /// Create a configuration for the given input clock and bus speed
    pub fn new(input_clock_hz: u32, bus: I2cConfig) -> Self {
        Self {
            bus_frequency_hz: bus.frequency,
            input_clock_hz,
            ..Default::default()
        }
    }

    /// Replace the poll budget
    pub fn with_timeout(mut self, timeout: PollTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the START attempt bound
    pub fn with_start_attempts(mut self, attempts: u8) -> Self {
        self.start_attempts = attempts;
        self
    }

    /// Compute the bit-rate register value
    ///
    /// `divisor = ((input_clock / bus_frequency) - 16) / 2`, with no
    /// prescaling.
    pub fn divisor(&self) -> Result<u8, ConfigError> {
        if self.bus_frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }

        let ratio = self.input_clock_hz / self.bus_frequency_hz;
        if ratio < MIN_CLOCK_RATIO {
            return Err(ConfigError::BusFrequencyTooHigh);
        }

        u8::try_from((ratio - MIN_CLOCK_RATIO) / 2).map_err(|_| ConfigError::BusFrequencyTooLow)
    }

    /// Check every field and return the derived register values
    pub(crate) fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.start_attempts == 0 {
            return Err(ConfigError::ZeroStartAttempts);
        }

        Ok(ValidatedConfig {
            divisor: self.divisor()?,
            max_polls: self.timeout.max_polls()?,
            poll_interval_ns: self.timeout.poll_interval_ns,
            start_attempts: self.start_attempts,
        })
    }
}

/// Register values and loop bounds derived from a checked [`BusConfig`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValidatedConfig {
    pub divisor: u8,
    pub max_polls: u32,
    pub poll_interval_ns: u32,
    pub start_attempts: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_divisor() {
        // (16 MHz / 100 kHz - 16) / 2 = 72
        assert_eq!(BusConfig::default().divisor(), Ok(72));
    }

    #[test]
    fn test_fast_mode_divisor() {
        let config = BusConfig::new(16_000_000, I2cConfig::FAST);
        assert_eq!(config.bus_frequency_hz, I2cConfig::FAST.frequency);
        assert_eq!(config.divisor(), Ok(12));
    }

    #[test]
    fn test_ratio_of_sixteen_gives_zero() {
        let config = BusConfig::new(1_600_000, I2cConfig::STANDARD);
        assert_eq!(config.divisor(), Ok(0));
    }

    #[test]
    fn test_frequency_out_of_range() {
        let too_fast = BusConfig::new(8_000_000, I2cConfig::FAST_PLUS);
        assert_eq!(too_fast.divisor(), Err(ConfigError::BusFrequencyTooHigh));

        // 20 MHz / 10 kHz = 2000 -> divisor 992, does not fit 8 bits
        let too_slow = BusConfig::new(20_000_000, I2cConfig { frequency: 10_000 });
        assert_eq!(too_slow.divisor(), Err(ConfigError::BusFrequencyTooLow));

        let zero = BusConfig::new(16_000_000, I2cConfig { frequency: 0 });
        assert_eq!(zero.divisor(), Err(ConfigError::ZeroFrequency));
    }

    #[test]
    fn test_default_poll_budget() {
        assert_eq!(PollTimeout::default().max_polls(), Ok(200));
    }

    #[test]
    fn test_poll_budget_at_least_one() {
        let timeout = PollTimeout {
            poll_interval_ns: 1_000,
            max_wait_ns: 10,
        };
        assert_eq!(timeout.max_polls(), Ok(1));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let config = BusConfig::default().with_start_attempts(0);
        assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroStartAttempts);

        let config = BusConfig::default().with_timeout(PollTimeout {
            poll_interval_ns: 0,
            max_wait_ns: 1_000,
        });
        assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroPollInterval);
    }
}
