//! Core data types for the acquisition loop
//!
//! This module contains the fundamental data structures shared across the
//! crate: pressure readings, the trigger and link state enums, the playback
//! commands emitted on band crossings, and the loop statistics published to
//! observers.

use serde::{Deserialize, Serialize};

/// A raw analog code from the converter hardware.
///
/// Carried as `f64` because the calibration table endpoints are fractional
/// codes; the ADC itself produces signed 16-bit values.
pub type RawSample = f64;

/// One timestamped pressure measurement in SI (kPa-equivalent) and mmHg units.
///
/// Derived deterministically from one [`RawSample`] plus a fixed calibration;
/// immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the acquisition session started
    pub elapsed_seconds: f64,
    /// Pressure in SI units (kPa-equivalent)
    pub pressure_si: f64,
    /// Pressure in millimeters of mercury
    pub pressure_mmhg: f64,
}

impl Reading {
    /// Create a new reading
    pub fn new(elapsed_seconds: f64, pressure_si: f64, pressure_mmhg: f64) -> Self {
        Self {
            elapsed_seconds,
            pressure_si,
            pressure_mmhg,
        }
    }
}

/// Playback state of the paired device, driven by the pressure band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TriggerState {
    /// Normal playback outside the pressure band
    #[default]
    Normal,
    /// Simulation playback while pressure stays inside the band
    Simulation,
}

impl std::fmt::Display for TriggerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerState::Normal => write!(f, "Normal"),
            TriggerState::Simulation => write!(f, "Simulation"),
        }
    }
}

/// Control commands for the paired device, emitted on band crossings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Switch the device into simulation playback
    StartSimulation,
    /// Return the device to normal playback
    StopSimulation,
}

impl std::fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackCommand::StartSimulation => write!(f, "StartSimulation"),
            PlaybackCommand::StopSimulation => write!(f, "StopSimulation"),
        }
    }
}

/// Connection lifecycle of the paired-device link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LinkState {
    /// No session with the device
    #[default]
    Closed,
    /// Session being established
    Opening,
    /// Session established; status/send operations are valid
    Open,
    /// Session lost and not recovered
    Failed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Closed => write!(f, "Closed"),
            LinkState::Opening => write!(f, "Opening"),
            LinkState::Open => write!(f, "Open"),
            LinkState::Failed => write!(f, "Failed"),
        }
    }
}

/// Statistics for the acquisition loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquisitionStats {
    /// Total number of successful ADC reads
    pub successful_reads: u64,
    /// Total number of failed ADC reads (each one skipped a cycle)
    pub failed_reads: u64,
    /// Records appended to the pressure log
    pub records_logged: u64,
    /// Trigger state transitions observed
    pub trigger_transitions: u64,
    /// Link close+reopen recoveries performed
    pub link_reconnects: u64,
    /// Observer messages dropped because the channel was full
    pub dropped_messages: u64,
}

impl AcquisitionStats {
    /// Calculate read success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_reads + self.failed_reads;
        if total == 0 {
            100.0
        } else {
            (self.successful_reads as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_construction() {
        let r = Reading::new(1.5, 0.47, 3.54);
        assert_eq!(r.elapsed_seconds, 1.5);
        assert_eq!(r.pressure_si, 0.47);
        assert_eq!(r.pressure_mmhg, 3.54);
    }

    #[test]
    fn test_trigger_state_default() {
        assert_eq!(TriggerState::default(), TriggerState::Normal);
    }

    #[test]
    fn test_success_rate() {
        let mut stats = AcquisitionStats::default();
        assert_eq!(stats.success_rate(), 100.0);

        stats.successful_reads = 3;
        stats.failed_reads = 1;
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LinkState::Open.to_string(), "Open");
        assert_eq!(TriggerState::Simulation.to_string(), "Simulation");
        assert_eq!(PlaybackCommand::StartSimulation.to_string(), "StartSimulation");
    }
}
