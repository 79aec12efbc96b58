//! Mock hardware for running the loop without a transducer or paired device
//!
//! [`MockAdc`] generates raw codes from a configurable waveform and can inject
//! periodic read faults; [`MockLink`] records every operation into a shared
//! event list and can inject connect/send faults, which is what the recovery
//! tests script against.
//!
//! Enabled for unit tests automatically and for binaries/integration tests via
//! the `mock-hardware` feature:
//!
//! ```bash
//! cargo test --features mock-hardware
//! ```

use crate::acquisition::adc::PressureAdc;
use crate::acquisition::converter::Calibration;
use crate::acquisition::link::StethoscopeLink;
use crate::error::{PressureLinkError, Result};
use crate::types::{PlaybackCommand, RawSample};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Pattern for generating mock raw codes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockWaveform {
    /// Fixed raw code
    Constant(RawSample),
    /// Sine between two raw codes
    Sine {
        low: RawSample,
        high: RawSample,
        period_secs: f64,
    },
    /// Linear ramp from low to high that resets each period
    Sweep {
        low: RawSample,
        high: RawSample,
        period_secs: f64,
    },
}

/// Raw code that converts to the given mmHg pressure (inverse of the
/// conversion chain; handy for steering mock scenarios into or out of the
/// trigger band)
pub fn raw_for_mmhg(calib: &Calibration, mmhg: f64) -> RawSample {
    let pressure_si = mmhg * 101.3 / 760.0;
    let v = (pressure_si * calib.scale + calib.offset) * calib.supply_voltage;
    calib.raw_low + (v - calib.v_low) / (calib.v_high - calib.v_low)
        * (calib.raw_high - calib.raw_low)
}

/// Mock converter generating codes from a waveform
pub struct MockAdc {
    waveform: MockWaveform,
    started: Instant,
    fail_every: Option<u64>,
    reads: u64,
}

impl MockAdc {
    /// Create a mock converter with the given waveform
    pub fn new(waveform: MockWaveform) -> Self {
        Self {
            waveform,
            started: Instant::now(),
            fail_every: None,
            reads: 0,
        }
    }

    /// Make every n-th read fail with a hardware error (n = 1 fails all)
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }
}

impl PressureAdc for MockAdc {
    fn read_raw(&mut self, _channel: u8, _gain: u8) -> Result<RawSample> {
        self.reads += 1;
        if let Some(n) = self.fail_every {
            if self.reads % n == 0 {
                return Err(PressureLinkError::HardwareRead(
                    "injected read fault".to_string(),
                ));
            }
        }

        let t = self.started.elapsed().as_secs_f64();
        Ok(match self.waveform {
            MockWaveform::Constant(code) => code,
            MockWaveform::Sine {
                low,
                high,
                period_secs,
            } => {
                let mid = (low + high) / 2.0;
                let amplitude = (high - low) / 2.0;
                mid + amplitude * (2.0 * std::f64::consts::PI * t / period_secs).sin()
            }
            MockWaveform::Sweep {
                low,
                high,
                period_secs,
            } => {
                let phase = (t % period_secs) / period_secs;
                low + phase * (high - low)
            }
        })
    }
}

/// Operations observed by [`MockLink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected(String),
    Disconnected,
    Enquired,
    Sent(PlaybackCommand),
    StartedRecording(String),
    StoppedRecording,
}

/// Shared event list for assertions after the link has been boxed away
pub type SharedEvents = Arc<Mutex<Vec<LinkEvent>>>;

/// Mock link recording every operation, with fault injection
pub struct MockLink {
    events: SharedEvents,
    connected: bool,
    enquiry_online: bool,
    fail_connects: u32,
    fail_sends: u32,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// Create a well-behaved link that reports the device online
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            connected: false,
            enquiry_online: true,
            fail_connects: 0,
            fail_sends: 0,
        }
    }

    /// Handle to the recorded operations
    pub fn events(&self) -> SharedEvents {
        Arc::clone(&self.events)
    }

    /// Answer the status enquiry with the given readiness
    pub fn with_enquiry(mut self, online: bool) -> Self {
        self.enquiry_online = online;
        self
    }

    /// Fail the next `n` connect attempts
    pub fn fail_next_connects(mut self, n: u32) -> Self {
        self.fail_connects = n;
        self
    }

    /// Fail the next `n` send attempts
    pub fn fail_next_sends(mut self, n: u32) -> Self {
        self.fail_sends = n;
        self
    }

    fn record(&self, event: LinkEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn guard_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(PressureLinkError::LinkIo("no open session".to_string()))
        }
    }
}

impl StethoscopeLink for MockLink {
    fn connect(&mut self, address: &str) -> Result<()> {
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(PressureLinkError::LinkIo(
                "injected connect fault".to_string(),
            ));
        }
        self.connected = true;
        self.record(LinkEvent::Connected(address.to_string()));
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.record(LinkEvent::Disconnected);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn enquire(&mut self) -> Result<bool> {
        self.guard_connected()?;
        self.record(LinkEvent::Enquired);
        Ok(self.enquiry_online)
    }

    fn send(&mut self, command: PlaybackCommand) -> Result<()> {
        self.guard_connected()?;
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(PressureLinkError::LinkIo("injected send fault".to_string()));
        }
        self.record(LinkEvent::Sent(command));
        Ok(())
    }

    fn start_recording(&mut self, session_name: &str) -> Result<()> {
        self.guard_connected()?;
        self.record(LinkEvent::StartedRecording(session_name.to_string()));
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.guard_connected()?;
        self.record(LinkEvent::StoppedRecording);
        Ok(())
    }
}
