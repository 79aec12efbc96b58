//! Persisted pressure log sessions
//!
//! A log session is one append-only text file per acquisition run: a header
//! block identifying the run, then comma-separated pressure records throttled
//! to the configured log interval. A JSON metadata sidecar is written next to
//! the log for downstream tooling.

pub mod logger;

pub use logger::PressureLogger;

use crate::error::{PressureLinkError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata describing one log session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Scenario number for the run
    pub scenario: u32,

    /// Name of the acquisition device
    pub device_name: String,

    /// Address of the paired stethoscope
    pub stethoscope_id: String,

    /// When the session started
    pub started: DateTime<Local>,

    /// Path of the pressure log file
    pub log_path: PathBuf,
}

impl SessionMetadata {
    /// Save metadata as a JSON sidecar
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PressureLinkError::LogWrite(std::io::Error::other(e)))?;
        std::fs::write(path.as_ref(), content).map_err(PressureLinkError::LogWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_roundtrip() {
        let meta = SessionMetadata {
            scenario: 1,
            device_name: "ABPC".to_string(),
            stethoscope_id: "00:06:66:D0:E4:94".to_string(),
            started: Local::now(),
            log_path: PathBuf::from("dataOutput/output.txt"),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let parsed: SessionMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scenario, 1);
        assert_eq!(parsed.stethoscope_id, meta.stethoscope_id);
    }
}
