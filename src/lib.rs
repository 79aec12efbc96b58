//! # pressurelink-rs: pressure acquisition with stethoscope-simulator control
//!
//! Continuously samples a pressure transducer through an I2C ADC, converts
//! raw codes into SI (kPa-equivalent) and mmHg pressure readings, persists
//! throttled timestamped records to a log session, and drives a two-state
//! simulation trigger on a paired stethoscope device over a resilient serial
//! link.
//!
//! ## Architecture
//!
//! - **Acquisition**: the sample-convert-trigger-log-link loop runs on its own
//!   thread ([`acquisition::AcquisitionWorker`])
//! - **Hardware seams**: [`acquisition::PressureAdc`] and
//!   [`acquisition::StethoscopeLink`] traits separate the loop from the real
//!   ADS1115 driver and serial transport (and from mock hardware in tests)
//! - **Session**: append-only pressure log with a header block and a JSON
//!   metadata sidecar ([`session::PressureLogger`])
//! - **Communication**: crossbeam channels between the loop and its observer
//!
//! ## Degradation model
//!
//! A failed hardware read skips one cycle; a link fault triggers one
//! close-then-reopen recovery before remote commands are disabled; log write
//! faults are reported without stopping acquisition. Only an explicit stop
//! request ends the loop.
//!
//! ## Example
//!
//! ```ignore
//! use pressurelink_rs::{
//!     acquisition::{AcquisitionBackend, AcquisitionMessage, Ads1115, SerialStethoscopeLink},
//!     config::AppConfig,
//! };
//! use linux_embedded_hal::I2cdev;
//!
//! let config = AppConfig::load_or_default("pressurelink.toml");
//! config.validate()?;
//!
//! let i2c = I2cdev::new(&config.adc.i2c_bus)?;
//! let adc = Ads1115::new(i2c, config.adc.i2c_address);
//! let link = SerialStethoscopeLink::new(&config.link.port, config.link.baud_rate, config.link.timeout());
//!
//! let (backend, observer) = AcquisitionBackend::new(config.clone(), Box::new(adc), Box::new(link));
//! std::thread::spawn(move || backend.run());
//!
//! if let Some(address) = config.link.device_address.clone() {
//!     observer.set_device_address(address);
//! }
//!
//! loop {
//!     for msg in observer.drain() {
//!         if let AcquisitionMessage::Reading(reading) = msg {
//!             println!("{:.2} mmHg", reading.pressure_mmhg);
//!         }
//!     }
//! }
//! ```

pub mod acquisition;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use acquisition::{
    AcquisitionBackend, AcquisitionCommand, AcquisitionMessage, Calibration, ObserverHandle,
};
pub use config::AppConfig;
pub use error::{PressureLinkError, Result};
pub use session::PressureLogger;
pub use types::{AcquisitionStats, LinkState, Reading, TriggerState};
