//! Serial transport for the stethoscope link
//!
//! The pairing layer (an external collaborator) binds the stethoscope's
//! wireless address to a local RFCOMM device node; this transport opens that
//! node and speaks the firmware's single-opcode exchanges. The wire detail is
//! private to this module — everything above it works in terms of
//! [`StethoscopeLink`] operations.

use crate::acquisition::link::StethoscopeLink;
use crate::error::{PressureLinkError, Result};
use crate::types::PlaybackCommand;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Control opcodes understood by the stethoscope firmware
mod opcode {
    /// Status enquiry
    pub const ENQ: u8 = 0x05;
    /// Positive acknowledgement
    pub const ACK: u8 = 0x06;
    /// Switch to simulation playback
    pub const START_SIM: u8 = 0x0B;
    /// Return to normal playback
    pub const STOP_SIM: u8 = 0x0C;
    /// Start recording; followed by a length-prefixed session name
    pub const START_REC: u8 = 0x0D;
    /// Stop recording
    pub const STOP_REC: u8 = 0x0E;
}

/// Serial link to the paired stethoscope
pub struct SerialStethoscopeLink {
    port_path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialStethoscopeLink {
    /// Create a transport over the given device node
    pub fn new(port_path: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port_path: port_path.into(),
            baud_rate,
            timeout,
            port: None,
        }
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| PressureLinkError::LinkIo("no open session".to_string()))
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(frame).map_err(io_error)?;
        port.flush().map_err(io_error)?;
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> PressureLinkError {
    PressureLinkError::LinkIo(e.to_string())
}

impl StethoscopeLink for SerialStethoscopeLink {
    fn connect(&mut self, address: &str) -> Result<()> {
        self.disconnect();

        let port = serialport::new(self.port_path.as_str(), self.baud_rate)
            .timeout(self.timeout)
            .open()?;

        tracing::info!(
            "opened {} for stethoscope {} at {} baud",
            self.port_path,
            address,
            self.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) {
        // dropping the handle releases the device node
        if self.port.take().is_some() {
            tracing::debug!("released {}", self.port_path);
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn enquire(&mut self) -> Result<bool> {
        self.write_frame(&[opcode::ENQ])?;

        let mut response = [0u8; 1];
        self.port_mut()?
            .read_exact(&mut response)
            .map_err(|e| PressureLinkError::LinkIo(format!("enquiry got no response: {}", e)))?;
        Ok(response[0] == opcode::ACK)
    }

    fn send(&mut self, command: PlaybackCommand) -> Result<()> {
        let op = match command {
            PlaybackCommand::StartSimulation => opcode::START_SIM,
            PlaybackCommand::StopSimulation => opcode::STOP_SIM,
        };
        self.write_frame(&[op])
    }

    fn start_recording(&mut self, session_name: &str) -> Result<()> {
        let name = session_name.as_bytes();
        let len = name.len().min(u8::MAX as usize);

        let mut frame = Vec::with_capacity(2 + len);
        frame.push(opcode::START_REC);
        frame.push(len as u8);
        frame.extend_from_slice(&name[..len]);
        self.write_frame(&frame)
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.write_frame(&[opcode::STOP_REC])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected() {
        let link = SerialStethoscopeLink::new("/dev/rfcomm0", 115_200, Duration::from_secs(1));
        assert!(!link.is_connected());
    }

    #[test]
    fn test_operations_fail_without_session() {
        let mut link = SerialStethoscopeLink::new("/dev/rfcomm0", 115_200, Duration::from_secs(1));
        assert!(link.enquire().is_err());
        assert!(link.send(PlaybackCommand::StartSimulation).is_err());
        assert!(link.stop_recording().is_err());
    }

    #[test]
    fn test_disconnect_without_session_is_noop() {
        let mut link = SerialStethoscopeLink::new("/dev/rfcomm0", 115_200, Duration::from_secs(1));
        link.disconnect();
        assert!(!link.is_connected());
    }
}
