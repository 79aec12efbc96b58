//! Link manager for the paired stethoscope device
//!
//! [`StethoscopeLink`] is the transport seam: a session-oriented interface to
//! the device that can be backed by the real serial transport or by a mock.
//! [`LinkManager`] owns the session lifecycle on top of it — open, status
//! enquiry, command delivery, remote recording control, close — and the
//! recovery policy: any I/O failure while the session is open causes one
//! close-then-reopen of the same address with one retry of the failed
//! operation; a second consecutive failure surfaces
//! [`PressureLinkError::LinkUnrecoverable`] without another reopen.

use crate::error::{PressureLinkError, Result};
use crate::types::{LinkState, PlaybackCommand};

#[cfg(test)]
use mockall::automock;

/// Session-oriented interface to the paired device
///
/// Implementations hold the transport handle internally; at most one session
/// is open at a time, and `connect` on an already-open transport must tear the
/// old session down first. Implementations must be `Send` so the link can live
/// on the acquisition thread.
#[cfg_attr(test, automock)]
pub trait StethoscopeLink: Send {
    /// Establish a session with the device at `address`
    fn connect(&mut self, address: &str) -> Result<()>;

    /// Tear the session down; safe to call at any time
    fn disconnect(&mut self);

    /// Check whether a session is currently held
    fn is_connected(&self) -> bool;

    /// Status enquiry exchange; `Ok(false)` means the device answered but is
    /// not ready, an error means no or garbled response
    fn enquire(&mut self) -> Result<bool>;

    /// Deliver a playback command
    fn send(&mut self, command: PlaybackCommand) -> Result<()>;

    /// Ask the device to start recording under the given session name
    fn start_recording(&mut self, session_name: &str) -> Result<()>;

    /// Ask the device to stop recording
    fn stop_recording(&mut self) -> Result<()>;
}

/// Owns the connection lifecycle to the paired device
pub struct LinkManager {
    transport: Box<dyn StethoscopeLink>,
    state: LinkState,
    address: Option<String>,
    reconnects: u64,
}

impl LinkManager {
    /// Create a manager over the given transport; starts Closed
    pub fn new(transport: Box<dyn StethoscopeLink>) -> Self {
        Self {
            transport,
            state: LinkState::Closed,
            address: None,
            reconnects: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of close+reopen recoveries performed so far
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Open a session with the device at `address`
    ///
    /// Valid from any state; an existing session is torn down first. On
    /// failure the manager lands in `Failed` and returns
    /// [`PressureLinkError::LinkOpen`].
    pub fn open(&mut self, address: &str) -> Result<()> {
        if self.state == LinkState::Open {
            self.transport.disconnect();
        }
        self.state = LinkState::Opening;
        tracing::info!("opening link to {}", address);

        match self.transport.connect(address) {
            Ok(()) => {
                self.state = LinkState::Open;
                self.address = Some(address.to_string());
                tracing::info!("link to {} open", address);
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Failed;
                Err(PressureLinkError::LinkOpen {
                    address: address.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Query whether the remote device is online; valid only while Open
    pub fn status(&mut self) -> Result<bool> {
        self.guard_open()?;
        self.with_recovery(|t| t.enquire())
    }

    /// Deliver a playback command; valid only while Open
    pub fn send(&mut self, command: PlaybackCommand) -> Result<()> {
        self.guard_open()?;
        self.with_recovery(move |t| t.send(command))
    }

    /// Start remote recording under `session_name`; valid only while Open
    pub fn start_recording(&mut self, session_name: &str) -> Result<()> {
        self.guard_open()?;
        self.with_recovery(move |t| t.start_recording(session_name))
    }

    /// Stop remote recording; valid only while Open
    pub fn stop_recording(&mut self) -> Result<()> {
        self.guard_open()?;
        self.with_recovery(|t| t.stop_recording())
    }

    /// Close the session
    ///
    /// Valid from any state and idempotent; always safe during shutdown.
    pub fn close(&mut self) {
        if self.state != LinkState::Closed {
            self.transport.disconnect();
            self.state = LinkState::Closed;
            tracing::info!("link closed");
        }
    }

    fn guard_open(&self) -> Result<()> {
        if self.state == LinkState::Open {
            Ok(())
        } else {
            Err(PressureLinkError::LinkIo(format!(
                "link is {} (operation requires Open)",
                self.state
            )))
        }
    }

    /// Run an operation with the close-then-reopen-once recovery policy.
    ///
    /// The channel can desync; closing and reopening resynchronizes it, so a
    /// single failure is treated as recoverable. Exactly one reopen is
    /// attempted per failed operation, and a second consecutive failure is
    /// surfaced as unrecoverable.
    fn with_recovery<T>(
        &mut self,
        op: impl Fn(&mut dyn StethoscopeLink) -> Result<T>,
    ) -> Result<T> {
        match op(self.transport.as_mut()) {
            Ok(v) => Ok(v),
            Err(first) => {
                let address = match self.address.clone() {
                    Some(a) => a,
                    None => {
                        self.state = LinkState::Failed;
                        return Err(PressureLinkError::LinkUnrecoverable(first.to_string()));
                    }
                };

                tracing::warn!("link I/O failed ({}), closing and reopening", first);
                self.transport.disconnect();

                if let Err(reopen) = self.transport.connect(&address) {
                    self.state = LinkState::Failed;
                    return Err(PressureLinkError::LinkUnrecoverable(format!(
                        "reopen of {} failed: {}",
                        address, reopen
                    )));
                }
                self.reconnects += 1;
                tracing::info!("link to {} reopened", address);

                match op(self.transport.as_mut()) {
                    Ok(v) => Ok(v),
                    Err(second) => {
                        self.transport.disconnect();
                        self.state = LinkState::Failed;
                        Err(PressureLinkError::LinkUnrecoverable(second.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn io_err() -> PressureLinkError {
        PressureLinkError::LinkIo("broken pipe".to_string())
    }

    fn open_manager(mock: MockStethoscopeLink) -> LinkManager {
        let mut manager = LinkManager::new(Box::new(mock));
        manager.open("00:06:66:D0:E4:94").unwrap();
        manager
    }

    #[test]
    fn test_open_failure_lands_in_failed() {
        let mut mock = MockStethoscopeLink::new();
        mock.expect_connect()
            .times(1)
            .returning(|_| Err(io_err()));

        let mut manager = LinkManager::new(Box::new(mock));
        let result = manager.open("00:06:66:D0:E4:94");

        assert!(matches!(result, Err(PressureLinkError::LinkOpen { .. })));
        assert_eq!(manager.state(), LinkState::Failed);
    }

    #[test]
    fn test_operations_require_open() {
        let mock = MockStethoscopeLink::new();
        let mut manager = LinkManager::new(Box::new(mock));

        assert!(manager.status().is_err());
        assert!(manager.send(PlaybackCommand::StartSimulation).is_err());
        assert!(manager.stop_recording().is_err());
    }

    #[test]
    fn test_single_failure_triggers_one_reopen() {
        let mut seq = Sequence::new();
        let mut mock = MockStethoscopeLink::new();

        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io_err()));
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut manager = open_manager(mock);
        assert!(manager.send(PlaybackCommand::StartSimulation).is_ok());
        assert_eq!(manager.reconnects(), 1);
        assert_eq!(manager.state(), LinkState::Open);
    }

    #[test]
    fn test_second_consecutive_failure_is_unrecoverable() {
        let mut seq = Sequence::new();
        let mut mock = MockStethoscopeLink::new();

        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io_err()));
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io_err()));
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut manager = open_manager(mock);
        let result = manager.send(PlaybackCommand::StartSimulation);

        // no further reopen is attempted after the retried send fails
        assert!(matches!(
            result,
            Err(PressureLinkError::LinkUnrecoverable(_))
        ));
        assert_eq!(manager.state(), LinkState::Failed);
        assert_eq!(manager.reconnects(), 1);
    }

    #[test]
    fn test_failed_reopen_is_unrecoverable() {
        let mut seq = Sequence::new();
        let mut mock = MockStethoscopeLink::new();

        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_enquire()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(io_err()));
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io_err()));

        let mut manager = open_manager(mock);
        let result = manager.status();

        assert!(matches!(
            result,
            Err(PressureLinkError::LinkUnrecoverable(_))
        ));
        assert_eq!(manager.reconnects(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut mock = MockStethoscopeLink::new();
        mock.expect_connect().times(1).returning(|_| Ok(()));
        // exactly one disconnect despite two close calls
        mock.expect_disconnect().times(1).return_const(());

        let mut manager = open_manager(mock);
        manager.close();
        manager.close();
        assert_eq!(manager.state(), LinkState::Closed);
    }

    #[test]
    fn test_close_from_closed_is_noop() {
        let mock = MockStethoscopeLink::new();
        let mut manager = LinkManager::new(Box::new(mock));
        manager.close();
        assert_eq!(manager.state(), LinkState::Closed);
    }
}
