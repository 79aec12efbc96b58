//! Sampler: one fresh raw code per cycle, converted and timestamped
//!
//! Owns the ADC seam and the calibration, and stamps each reading with the
//! elapsed time since the session started. A failed hardware read propagates
//! out and is fatal to the current cycle only — the loop retries next cycle.

use crate::acquisition::adc::PressureAdc;
use crate::acquisition::converter::Calibration;
use crate::config::AdcConfig;
use crate::error::Result;
use crate::types::Reading;
use std::time::Instant;

/// Pulls one raw sample per invocation and converts it into a [`Reading`]
pub struct Sampler {
    adc: Box<dyn PressureAdc>,
    adc_config: AdcConfig,
    calibration: Calibration,
    started: Instant,
}

impl Sampler {
    /// Create a sampler; the elapsed clock starts now
    pub fn new(adc: Box<dyn PressureAdc>, adc_config: AdcConfig, calibration: Calibration) -> Self {
        Self {
            adc,
            adc_config,
            calibration,
            started: Instant::now(),
        }
    }

    /// Restart the elapsed clock (aligns readings with a new log session)
    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    /// Blocking read of one fresh sample, converted to a reading
    pub fn sample(&mut self) -> Result<Reading> {
        let raw = self
            .adc
            .read_raw(self.adc_config.channel, self.adc_config.gain)?;
        let (pressure_si, pressure_mmhg) = self.calibration.convert(raw);

        Ok(Reading {
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            pressure_si,
            pressure_mmhg,
        })
    }
}
