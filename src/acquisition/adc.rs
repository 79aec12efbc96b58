//! ADC interface for the pressure transducer
//!
//! [`PressureAdc`] is the hardware seam the sampler reads through, enabling
//! both the real converter and mock hardware for testing. The real
//! implementation is [`Ads1115`], a single-shot driver for the TI ADS1115
//! 16-bit converter, generic over any [`embedded_hal::i2c::I2c`] bus (the
//! binary feeds it a `linux_embedded_hal::I2cdev`).

use crate::error::{PressureLinkError, Result};
use crate::types::RawSample;
use embedded_hal::i2c::I2c;
use std::time::Duration;

/// Unified interface to the analog converter
///
/// One invocation returns one fresh code; implementations must not cache.
/// Failures map to [`PressureLinkError::HardwareRead`] and are fatal to the
/// current sample cycle only.
pub trait PressureAdc: Send {
    /// Read one raw code from the given single-ended channel at the given
    /// programmable gain setting
    fn read_raw(&mut self, channel: u8, gain: u8) -> Result<RawSample>;
}

/// Conversion result register
const REG_CONVERSION: u8 = 0x00;

/// Configuration register
const REG_CONFIG: u8 = 0x01;

/// OS bit: begin a single conversion (write) / conversion idle (read)
const CONFIG_OS: u16 = 0x8000;

/// Single-shot mode
const CONFIG_MODE_SINGLE: u16 = 0x0100;

/// 128 samples per second
const CONFIG_DR_128SPS: u16 = 0x0080;

/// Comparator disabled
const CONFIG_COMP_DISABLE: u16 = 0x0003;

/// Polling attempts before a conversion is declared stuck
const CONVERSION_POLL_LIMIT: u32 = 25;

/// PGA bits for the Adafruit-compatible gain codes (0 = 2/3x full-scale
/// 6.144 V, 1 = 4.096 V, 2 = 2.048 V, 4, 8, 16). Unknown codes fall back
/// to 4.096 V.
fn pga_bits(gain: u8) -> u16 {
    match gain {
        0 => 0b000,
        1 => 0b001,
        2 => 0b010,
        4 => 0b011,
        8 => 0b100,
        16 => 0b101,
        _ => 0b001,
    }
}

/// Build the config word for a single-shot read on a single-ended channel
fn config_word(channel: u8, gain: u8) -> u16 {
    let mux = 0b100 | (channel & 0b11) as u16;
    CONFIG_OS
        | (mux << 12)
        | (pga_bits(gain) << 9)
        | CONFIG_MODE_SINGLE
        | CONFIG_DR_128SPS
        | CONFIG_COMP_DISABLE
}

/// Single-shot driver for the ADS1115 converter
pub struct Ads1115<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ads1115<I2C> {
    /// Create a driver for the converter at the given I2C address
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Trigger one conversion and read back the signed 16-bit result
    pub fn read_single_shot(&mut self, channel: u8, gain: u8) -> Result<i16> {
        let config = config_word(channel, gain);
        self.i2c
            .write(
                self.address,
                &[REG_CONFIG, (config >> 8) as u8, config as u8],
            )
            .map_err(bus_error)?;

        // Wait for the OS bit to signal the conversion is done (~8 ms at 128 SPS)
        let mut buf = [0u8; 2];
        let mut polls = 0;
        loop {
            self.i2c
                .write_read(self.address, &[REG_CONFIG], &mut buf)
                .map_err(bus_error)?;
            if buf[0] & 0x80 != 0 {
                break;
            }
            polls += 1;
            if polls >= CONVERSION_POLL_LIMIT {
                return Err(PressureLinkError::HardwareRead(
                    "conversion never completed".to_string(),
                ));
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        self.i2c
            .write_read(self.address, &[REG_CONVERSION], &mut buf)
            .map_err(bus_error)?;
        Ok(i16::from_be_bytes(buf))
    }
}

fn bus_error(e: impl core::fmt::Debug) -> PressureLinkError {
    PressureLinkError::HardwareRead(format!("{:?}", e))
}

impl<I2C: I2c + Send> PressureAdc for Ads1115<I2C> {
    fn read_raw(&mut self, channel: u8, gain: u8) -> Result<RawSample> {
        Ok(self.read_single_shot(channel, gain)? as RawSample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};
    use std::convert::Infallible;

    #[test]
    fn test_pga_bits_mapping() {
        assert_eq!(pga_bits(0), 0b000);
        assert_eq!(pga_bits(1), 0b001);
        assert_eq!(pga_bits(2), 0b010);
        assert_eq!(pga_bits(4), 0b011);
        assert_eq!(pga_bits(8), 0b100);
        assert_eq!(pga_bits(16), 0b101);
        // unknown codes fall back to 4.096 V
        assert_eq!(pga_bits(3), 0b001);
    }

    #[test]
    fn test_config_word_layout() {
        let config = config_word(0, 1);
        // OS set, single-ended AIN0 mux, single-shot, 128 SPS, comparator off
        assert_eq!(config & CONFIG_OS, CONFIG_OS);
        assert_eq!((config >> 12) & 0b111, 0b100);
        assert_eq!((config >> 9) & 0b111, 0b001);
        assert_eq!(config & CONFIG_MODE_SINGLE, CONFIG_MODE_SINGLE);
        assert_eq!(config & CONFIG_COMP_DISABLE, CONFIG_COMP_DISABLE);

        let config_ch3 = config_word(3, 1);
        assert_eq!((config_ch3 >> 12) & 0b111, 0b111);
    }

    /// Minimal register-level bus model: remembers the addressed register
    /// and serves the config register with the OS bit set and a fixed
    /// conversion result.
    struct FakeBus {
        conversion: i16,
        last_register: u8,
        config_writes: Vec<u16>,
    }

    impl FakeBus {
        fn new(conversion: i16) -> Self {
            Self {
                conversion,
                last_register: REG_CONVERSION,
                config_writes: Vec::new(),
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = Infallible;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> std::result::Result<(), Infallible> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        self.last_register = bytes[0];
                        if bytes.len() == 3 && bytes[0] == REG_CONFIG {
                            self.config_writes
                                .push(u16::from_be_bytes([bytes[1], bytes[2]]));
                        }
                    }
                    Operation::Read(buf) => {
                        let value = match self.last_register {
                            REG_CONFIG => 0x8000u16, // conversion complete
                            _ => self.conversion as u16,
                        };
                        buf[0] = (value >> 8) as u8;
                        buf[1] = value as u8;
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_single_shot_read() {
        let mut adc = Ads1115::new(FakeBus::new(12345), 0x48);
        assert_eq!(adc.read_single_shot(0, 1).unwrap(), 12345);
        assert_eq!(adc.i2c.config_writes.len(), 1);
        assert_eq!(adc.i2c.config_writes[0], config_word(0, 1));
    }

    #[test]
    fn test_negative_codes_survive() {
        let mut adc = Ads1115::new(FakeBus::new(-42), 0x48);
        assert_eq!(adc.read_single_shot(1, 1).unwrap(), -42);
        assert_eq!(adc.read_raw(1, 1).unwrap(), -42.0);
    }
}
