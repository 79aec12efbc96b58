//! Error handling for the pressure acquisition core
//!
//! This module defines the crate error type and a Result alias. The taxonomy
//! encodes the recovery policy: hardware reads are retried next cycle, log
//! write failures are reported without stopping acquisition, and link faults
//! are either recovered with a single reopen or declared unrecoverable.

use thiserror::Error;

/// Main error type for acquisition operations
#[derive(Error, Debug)]
pub enum PressureLinkError {
    /// ADC read failure; transient, the loop retries on the next cycle
    #[error("Hardware read error: {0}")]
    HardwareRead(String),

    /// Failure to open the link to the paired device
    #[error("Failed to open link to {address}: {message}")]
    LinkOpen { address: String, message: String },

    /// Link I/O failure while the session is open (candidate for recovery)
    #[error("Link I/O error: {0}")]
    LinkIo(String),

    /// Link I/O failed and the single reconnect attempt did not restore it
    #[error("Link unrecoverable: {0}")]
    LinkUnrecoverable(String),

    /// Failure to append to the pressure log
    #[error("Log write error: {0}")]
    LogWrite(#[source] std::io::Error),

    /// Errors related to configuration loading/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serial transport errors
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PressureLinkError>,
    },
}

impl PressureLinkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PressureLinkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for faults the acquisition loop survives without degrading
    /// (everything except open/unrecoverable link faults and config errors).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PressureLinkError::HardwareRead(_)
                | PressureLinkError::LogWrite(_)
                | PressureLinkError::LinkIo(_)
        )
    }
}

/// Result type alias for acquisition operations
pub type Result<T> = std::result::Result<T, PressureLinkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PressureLinkError::HardwareRead("bus fault".to_string());
        assert_eq!(err.to_string(), "Hardware read error: bus fault");
    }

    #[test]
    fn test_error_with_context() {
        let err = PressureLinkError::Config("bad interval".to_string());
        let with_ctx = err.with_context("Failed to start");
        assert!(with_ctx.to_string().contains("Failed to start"));
    }

    #[test]
    fn test_link_open_error() {
        let err = PressureLinkError::LinkOpen {
            address: "00:06:66:D0:E4:94".to_string(),
            message: "no route".to_string(),
        };
        assert!(err.to_string().contains("00:06:66:D0:E4:94"));
        assert!(err.to_string().contains("no route"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(PressureLinkError::HardwareRead("x".into()).is_transient());
        assert!(PressureLinkError::LinkIo("x".into()).is_transient());
        assert!(!PressureLinkError::LinkUnrecoverable("x".into()).is_transient());
        assert!(!PressureLinkError::Config("x".into()).is_transient());
    }
}
