//! Throttled pressure logger
//!
//! Appends formatted records to the session's log file no more often than the
//! configured interval, independent of the sample rate — sampling can run much
//! faster than logging to keep the trigger responsive while keeping log volume
//! bounded. Throttling keys off the reading's own elapsed time, which makes the
//! monotonic-record invariant structural.

use crate::config::LoggingConfig;
use crate::error::{PressureLinkError, Result};
use crate::session::SessionMetadata;
use crate::types::Reading;
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Throttled sink appending readings to one log session
pub struct PressureLogger {
    file: File,
    path: PathBuf,
    interval_secs: f64,
    last_logged: Option<f64>,
    records: u64,
}

impl PressureLogger {
    /// Create the session: ensure the directory, write the header block and
    /// the metadata sidecar
    pub fn create(config: &LoggingConfig, stethoscope_id: &str) -> Result<Self> {
        std::fs::create_dir_all(&config.directory).map_err(PressureLinkError::LogWrite)?;

        let path = config.log_path();
        let mut file = File::create(&path).map_err(PressureLinkError::LogWrite)?;
        let started = Local::now();

        write!(
            file,
            "Date/Time: {}\n\
             Scenario: #{}\n\
             Device Name: {}\n\
             Stethoscope ID: {}\n\
             Units: seconds, kPa, mmHg\n",
            started.format("%Y-%m-%d %H:%M:%S"),
            config.scenario,
            config.device_name,
            stethoscope_id,
        )
        .map_err(PressureLinkError::LogWrite)?;

        let metadata = SessionMetadata {
            scenario: config.scenario,
            device_name: config.device_name.clone(),
            stethoscope_id: stethoscope_id.to_string(),
            started,
            log_path: path.clone(),
        };
        metadata.save(path.with_extension("json"))?;

        tracing::info!("log session created at {:?}", path);
        Ok(Self {
            file,
            path,
            interval_secs: config.log_interval_secs,
            last_logged: None,
            records: 0,
        })
    }

    /// Append the reading iff the log interval has elapsed since the last
    /// record; `Ok(true)` when a record was written
    pub fn maybe_log(&mut self, reading: &Reading) -> Result<bool> {
        if let Some(last) = self.last_logged {
            if reading.elapsed_seconds <= last
                || reading.elapsed_seconds - last < self.interval_secs
            {
                return Ok(false);
            }
        }

        writeln!(
            self.file,
            "{:.2}, {:.2}, {:.2}",
            reading.elapsed_seconds, reading.pressure_si, reading.pressure_mmhg
        )
        .map_err(PressureLinkError::LogWrite)?;
        self.file.flush().map_err(PressureLinkError::LogWrite)?;

        self.last_logged = Some(reading.elapsed_seconds);
        self.records += 1;
        Ok(true)
    }

    /// Change the throttle interval
    pub fn set_interval(&mut self, interval_secs: f64) {
        self.interval_secs = interval_secs;
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the session
    pub fn finish(mut self) -> Result<()> {
        self.file.flush().map_err(PressureLinkError::LogWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &Path, interval: f64) -> LoggingConfig {
        LoggingConfig {
            directory: dir.to_path_buf(),
            filename: "output.txt".to_string(),
            log_interval_secs: interval,
            scenario: 1,
            device_name: "ABPC".to_string(),
        }
    }

    fn reading(elapsed: f64) -> Reading {
        Reading::new(elapsed, 0.47, 3.54)
    }

    #[test]
    fn test_header_block() {
        let dir = tempfile::tempdir().unwrap();
        let logger =
            PressureLogger::create(&test_config(dir.path(), 1.0), "00:06:66:D0:E4:94").unwrap();
        logger.finish().unwrap();

        let content = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
        assert!(content.starts_with("Date/Time: "));
        assert!(content.contains("Scenario: #1\n"));
        assert!(content.contains("Device Name: ABPC\n"));
        assert!(content.contains("Stethoscope ID: 00:06:66:D0:E4:94\n"));
        assert!(content.contains("Units: seconds, kPa, mmHg\n"));
    }

    #[test]
    fn test_metadata_sidecar_written() {
        let dir = tempfile::tempdir().unwrap();
        let _logger =
            PressureLogger::create(&test_config(dir.path(), 1.0), "00:06:66:D0:E4:94").unwrap();
        assert!(dir.path().join("output.json").exists());
    }

    #[test]
    fn test_burst_yields_at_most_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger =
            PressureLogger::create(&test_config(dir.path(), 1.0), "addr").unwrap();

        // 10 readings inside half a second
        for i in 0..10 {
            logger.maybe_log(&reading(i as f64 * 0.05)).unwrap();
        }
        assert_eq!(logger.records(), 1);
    }

    #[test]
    fn test_spaced_readings_each_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger =
            PressureLogger::create(&test_config(dir.path(), 1.0), "addr").unwrap();

        for i in 0..5 {
            assert!(logger.maybe_log(&reading(i as f64 * 2.0)).unwrap());
        }
        assert_eq!(logger.records(), 5);
    }

    #[test]
    fn test_record_format_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger =
            PressureLogger::create(&test_config(dir.path(), 0.0), "addr").unwrap();
        logger
            .maybe_log(&Reading::new(1.234, 0.4713, 3.5365))
            .unwrap();
        logger.finish().unwrap();

        let content = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
        let last_line = content.lines().last().unwrap();
        assert_eq!(last_line, "1.23, 0.47, 3.54");
    }

    #[test]
    fn test_non_increasing_elapsed_never_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger =
            PressureLogger::create(&test_config(dir.path(), 0.0), "addr").unwrap();

        assert!(logger.maybe_log(&reading(1.0)).unwrap());
        assert!(!logger.maybe_log(&reading(1.0)).unwrap());
        assert!(!logger.maybe_log(&reading(0.5)).unwrap());
        assert!(logger.maybe_log(&reading(1.5)).unwrap());
        assert_eq!(logger.records(), 2);
    }
}
