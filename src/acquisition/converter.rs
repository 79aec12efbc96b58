//! Analog-to-physical conversion chain
//!
//! Pure mapping from a raw converter code to a pressure reading in SI
//! (kPa-equivalent) units and mmHg. The raw code is taken through a clamped
//! two-point interpolation into the voltage domain, then through the
//! transducer's transfer function:
//!
//! ```text
//! v           = interp(raw, [raw_low, raw_high] -> [v_low, v_high])   (clamped)
//! pressure_si = (v / supply_voltage - offset) / scale
//! mmHg        = pressure_si * 760 / 101.3
//! ```
//!
//! There are no error paths here: the result is always numeric, and garbage
//! calibration yields garbage pressure (a configuration problem, caught by
//! [`Calibration::validate`] at startup where detectable).

use crate::error::{PressureLinkError, Result};
use crate::types::RawSample;
use serde::{Deserialize, Serialize};

/// One standard atmosphere in mmHg
const STANDARD_ATMOSPHERE_MMHG: f64 = 760.0;

/// One standard atmosphere in kPa
const STANDARD_ATMOSPHERE_KPA: f64 = 101.3;

/// Transducer calibration: interpolation table endpoints plus the transfer
/// function constants
///
/// The defaults are the shipped device calibration; all values are
/// configurable through the `[calibration]` config section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Calibration {
    /// Supply voltage feeding the pressure sensor
    #[serde(default = "default_supply_voltage")]
    pub supply_voltage: f64,

    /// Transfer function offset
    #[serde(default = "default_offset")]
    pub offset: f64,

    /// Transfer function scale
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Raw code at the low end of the interpolation table
    #[serde(default = "default_raw_low")]
    pub raw_low: f64,

    /// Raw code at the high end of the interpolation table
    #[serde(default = "default_raw_high")]
    pub raw_high: f64,

    /// Voltage mapped to `raw_low`
    #[serde(default = "default_v_low")]
    pub v_low: f64,

    /// Voltage mapped to `raw_high`
    #[serde(default = "default_v_high")]
    pub v_high: f64,
}

fn default_supply_voltage() -> f64 {
    3.3
}

fn default_offset() -> f64 {
    0.04
}

fn default_scale() -> f64 {
    0.018
}

fn default_raw_low() -> f64 {
    1235.0
}

fn default_raw_high() -> f64 {
    19279.4116
}

fn default_v_low() -> f64 {
    0.16
}

fn default_v_high() -> f64 {
    2.41
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            supply_voltage: default_supply_voltage(),
            offset: default_offset(),
            scale: default_scale(),
            raw_low: default_raw_low(),
            raw_high: default_raw_high(),
            v_low: default_v_low(),
            v_high: default_v_high(),
        }
    }
}

impl Calibration {
    /// Map a raw code into the voltage domain through the two-point table.
    ///
    /// Codes outside `[raw_low, raw_high]` saturate to the nearest table
    /// endpoint; the table is never extrapolated.
    pub fn code_to_voltage(&self, raw: RawSample) -> f64 {
        if raw <= self.raw_low {
            return self.v_low;
        }
        if raw >= self.raw_high {
            return self.v_high;
        }
        let t = (raw - self.raw_low) / (self.raw_high - self.raw_low);
        self.v_low + t * (self.v_high - self.v_low)
    }

    /// Convert a raw code to `(pressure_si, pressure_mmhg)`
    pub fn convert(&self, raw: RawSample) -> (f64, f64) {
        let v = self.code_to_voltage(raw);
        let pressure_si = (v / self.supply_voltage - self.offset) / self.scale;
        let pressure_mmhg = pressure_si * STANDARD_ATMOSPHERE_MMHG / STANDARD_ATMOSPHERE_KPA;
        (pressure_si, pressure_mmhg)
    }

    /// Reject calibrations the conversion chain cannot evaluate
    pub fn validate(&self) -> Result<()> {
        if self.raw_low >= self.raw_high {
            return Err(PressureLinkError::Config(format!(
                "calibration table endpoints must be increasing (raw_low={}, raw_high={})",
                self.raw_low, self.raw_high
            )));
        }
        if self.supply_voltage <= 0.0 {
            return Err(PressureLinkError::Config(
                "supply_voltage must be positive".to_string(),
            ));
        }
        if self.scale == 0.0 {
            return Err(PressureLinkError::Config(
                "calibration scale must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{} !~ {}", a, b);
    }

    #[test]
    fn test_low_endpoint() {
        let calib = Calibration::default();
        let (si, mmhg) = calib.convert(1235.0);

        // V_digital = 0.16 -> si = (0.16/3.3 - 0.04)/0.018
        let expected_si = (0.16 / 3.3 - 0.04) / 0.018;
        assert_close(si, expected_si, 1e-9);
        assert_close(mmhg, expected_si * 760.0 / 101.3, 1e-9);
    }

    #[test]
    fn test_high_endpoint() {
        let calib = Calibration::default();
        let (si, mmhg) = calib.convert(19279.4116);

        // V_digital = 2.41 at the opposite table endpoint
        let expected_si = (2.41 / 3.3 - 0.04) / 0.018;
        assert_close(si, expected_si, 1e-9);
        assert_close(mmhg, expected_si * 760.0 / 101.3, 1e-9);
    }

    #[test]
    fn test_saturates_below_table() {
        let calib = Calibration::default();
        assert_eq!(calib.code_to_voltage(0.0), 0.16);
        assert_eq!(calib.code_to_voltage(-5000.0), 0.16);
        assert_eq!(calib.convert(0.0), calib.convert(1235.0));
    }

    #[test]
    fn test_saturates_above_table() {
        let calib = Calibration::default();
        assert_eq!(calib.code_to_voltage(32767.0), 2.41);
        assert_eq!(calib.convert(32767.0), calib.convert(19279.4116));
    }

    #[test]
    fn test_midpoint_interpolates() {
        let calib = Calibration::default();
        let mid = (1235.0 + 19279.4116) / 2.0;
        assert_close(calib.code_to_voltage(mid), (0.16 + 2.41) / 2.0, 1e-9);
    }

    #[test]
    fn test_validate_rejects_equal_endpoints() {
        let calib = Calibration {
            raw_high: 1235.0,
            ..Calibration::default()
        };
        assert!(calib.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_supply() {
        let calib = Calibration {
            supply_voltage: 0.0,
            ..Calibration::default()
        };
        assert!(calib.validate().is_err());
    }

    proptest! {
        #[test]
        fn convert_is_monotonic_in_raw(
            a in 1235.0f64..19279.4116,
            b in 1235.0f64..19279.4116,
        ) {
            let calib = Calibration::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (si_lo, mmhg_lo) = calib.convert(lo);
            let (si_hi, mmhg_hi) = calib.convert(hi);
            prop_assert!(si_lo <= si_hi);
            prop_assert!(mmhg_lo <= mmhg_hi);
        }

        #[test]
        fn convert_is_reproducible(raw in -1000.0f64..40000.0) {
            let calib = Calibration::default();
            prop_assert_eq!(calib.convert(raw), calib.convert(raw));
        }
    }
}
