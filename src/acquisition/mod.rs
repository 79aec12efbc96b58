//! Acquisition module: the sample-convert-trigger-log-link loop
//!
//! This module runs all hardware I/O in a separate thread to keep the
//! observer responsive. It uses crossbeam channels for thread-safe
//! communication with the presentation layer.
//!
//! # Architecture
//!
//! The loop runs in its own thread, communicating via channels:
//!
//! - [`AcquisitionCommand`] - messages sent from the observer to the loop
//!   (device address, interval changes, stop)
//! - [`AcquisitionMessage`] - messages sent from the loop to the observer
//!   (readings, link/trigger status, errors, stats)
//! - [`ObserverHandle`] - observer-side handle for sending commands and
//!   receiving messages
//! - [`AcquisitionBackend`] - entry point that owns the channels and runs the
//!   worker
//!
//! # Components
//!
//! - [`converter::Calibration`] - pure raw-to-pressure conversion chain
//! - [`adc::PressureAdc`] / [`adc::Ads1115`] - converter seam and real driver
//! - [`sampler::Sampler`] - one fresh reading per cycle
//! - [`trigger::ThresholdTrigger`] - edge-triggered simulation band
//! - [`link::LinkManager`] - paired-device session lifecycle and recovery
//! - [`worker::AcquisitionWorker`] - the loop itself
//!
//! # Example
//!
//! ```ignore
//! use pressurelink_rs::acquisition::AcquisitionBackend;
//! use pressurelink_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let (backend, observer) = AcquisitionBackend::new(config, adc, link);
//!
//! std::thread::spawn(move || backend.run());
//!
//! observer.set_device_address("00:06:66:D0:E4:94".to_string());
//! for msg in observer.drain() {
//!     // handle readings, status, errors
//! }
//! ```

pub mod adc;
pub mod converter;
pub mod link;
#[cfg(any(test, feature = "mock-hardware"))]
pub mod mock;
pub mod sampler;
pub mod serial_link;
pub mod trigger;
pub mod worker;

pub use adc::{Ads1115, PressureAdc};
pub use converter::Calibration;
pub use link::{LinkManager, StethoscopeLink};
#[cfg(any(test, feature = "mock-hardware"))]
pub use mock::{LinkEvent, MockAdc, MockLink, MockWaveform};
pub use sampler::Sampler;
pub use serial_link::SerialStethoscopeLink;
pub use trigger::{PressureBand, ThresholdTrigger};
pub use worker::AcquisitionWorker;

use crate::config::AppConfig;
use crate::types::{AcquisitionStats, LinkState, Reading, TriggerState};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Message sent from the observer to the acquisition loop
#[derive(Debug, Clone)]
pub enum AcquisitionCommand {
    /// Assign the paired device address; acquisition is suspended until the
    /// first assignment, a later one re-opens the link
    SetDeviceAddress(String),
    /// Change the minimum duration between sample cycles
    SetSampleInterval(Duration),
    /// Change the minimum duration between log records, in seconds
    SetLogInterval(f64),
    /// Request an immediate statistics message
    RequestStats,
    /// Stop acquisition and run the shutdown sequence
    Stop,
}

/// Message sent from the acquisition loop to the observer
#[derive(Debug, Clone)]
pub enum AcquisitionMessage {
    /// New pressure reading (published every cycle)
    Reading(Reading),
    /// Link lifecycle change
    LinkStatus(LinkState),
    /// Link fault, already classified and handled by the loop
    LinkError(String),
    /// Trigger state change
    TriggerChanged(TriggerState),
    /// Log session created at the given path
    LogSessionStarted(PathBuf),
    /// Log write fault; acquisition continues
    LogError(String),
    /// Statistics update
    Stats(AcquisitionStats),
    /// The loop has finished its shutdown sequence
    Shutdown,
}

/// Observer-side handle to the acquisition loop
pub struct ObserverHandle {
    /// Receiver for loop messages
    pub receiver: Receiver<AcquisitionMessage>,
    /// Sender for commands to the loop
    pub command_sender: Sender<AcquisitionCommand>,
}

impl ObserverHandle {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<AcquisitionMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<AcquisitionMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the loop
    pub fn send_command(&self, cmd: AcquisitionCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Assign the paired device address
    pub fn set_device_address(&self, address: String) {
        let _ = self
            .command_sender
            .send(AcquisitionCommand::SetDeviceAddress(address));
    }

    /// Change the sample interval
    pub fn set_sample_interval(&self, interval: Duration) {
        let _ = self
            .command_sender
            .send(AcquisitionCommand::SetSampleInterval(interval));
    }

    /// Change the log interval
    pub fn set_log_interval(&self, secs: f64) {
        let _ = self
            .command_sender
            .send(AcquisitionCommand::SetLogInterval(secs));
    }

    /// Request an immediate statistics message
    pub fn request_stats(&self) {
        let _ = self.command_sender.send(AcquisitionCommand::RequestStats);
    }

    /// Request a stop; the loop answers with [`AcquisitionMessage::Shutdown`]
    /// once the shutdown sequence finished
    pub fn stop(&self) {
        let _ = self.command_sender.send(AcquisitionCommand::Stop);
    }
}

/// The acquisition backend that runs in a separate thread
pub struct AcquisitionBackend {
    /// Configuration
    config: AppConfig,
    /// Hardware seam: the analog converter
    adc: Box<dyn PressureAdc>,
    /// Hardware seam: the paired-device transport
    link: Box<dyn StethoscopeLink>,
    /// Receiver for observer commands
    command_receiver: Receiver<AcquisitionCommand>,
    /// Sender for loop messages
    message_sender: Sender<AcquisitionMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl AcquisitionBackend {
    /// Create a new backend over the given hardware seams, with communication
    /// channels for one observer
    pub fn new(
        config: AppConfig,
        adc: Box<dyn PressureAdc>,
        link: Box<dyn StethoscopeLink>,
    ) -> (Self, ObserverHandle) {
        let (cmd_tx, cmd_rx) = bounded(64);
        // Bounded for backpressure - at the default 100 Hz sample rate this
        // holds ~10 seconds of readings if the observer stalls
        let (msg_tx, msg_rx) = bounded(1024);

        let backend = Self {
            config,
            adc,
            link,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let observer = ObserverHandle {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, observer)
    }

    /// Run the acquisition loop until a stop request
    pub fn run(self) {
        let mut worker = AcquisitionWorker::new(
            self.config,
            self.adc,
            self.link,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::mock::{MockAdc, MockLink, MockWaveform};
    use std::sync::atomic::Ordering;

    fn test_backend() -> (AcquisitionBackend, ObserverHandle) {
        AcquisitionBackend::new(
            AppConfig::default(),
            Box::new(MockAdc::new(MockWaveform::Constant(6000.0))),
            Box::new(MockLink::new()),
        )
    }

    #[test]
    fn test_backend_creation() {
        let (backend, observer) = test_backend();

        assert!(backend.running.load(Ordering::SeqCst));
        assert!(observer.send_command(AcquisitionCommand::Stop));
    }

    #[test]
    fn test_observer_commands() {
        let (_backend, observer) = test_backend();

        observer.set_device_address("00:06:66:D0:E4:94".to_string());
        observer.set_sample_interval(Duration::from_millis(20));
        observer.set_log_interval(1.0);
        observer.request_stats();
        observer.stop();
    }

    #[test]
    fn test_observer_drain_empty() {
        let (_backend, observer) = test_backend();
        assert!(observer.drain().is_empty());
        assert!(observer.try_recv().is_none());
    }
}
