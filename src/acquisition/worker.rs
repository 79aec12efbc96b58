//! Acquisition worker thread implementation
//!
//! This module contains the main loop that runs in a separate thread and
//! drives the sample-convert-trigger-log-link cycle. It communicates with the
//! observer (display, operator console) through crossbeam channels.
//!
//! # Responsibilities
//!
//! The worker thread handles:
//!
//! - **Command processing**: responds to observer commands (device address,
//!   interval changes, stop)
//! - **Steady-state cycling**: one raw sample per cycle, converted, evaluated
//!   against the trigger band, throttled into the log, and published
//! - **Link control**: opens the paired-device session when an address is
//!   assigned, runs the status enquiry, starts remote recording, and delivers
//!   edge-triggered playback commands
//! - **Degradation**: a hardware read fault skips one cycle; an unrecoverable
//!   link fault disables remote commands but local sampling and logging
//!   continue; only an explicit stop request ends the loop
//!
//! # Rate limiting
//!
//! The loop sleeps between cycles to hold the configured sample interval, and
//! blocks on the command channel while no device address is assigned — the
//! suspension points are real waits, never busy-spins.

use crate::acquisition::adc::PressureAdc;
use crate::acquisition::link::{LinkManager, StethoscopeLink};
use crate::acquisition::sampler::Sampler;
use crate::acquisition::trigger::{PressureBand, ThresholdTrigger};
use crate::acquisition::{AcquisitionCommand, AcquisitionMessage};
use crate::config::AppConfig;
use crate::error::{PressureLinkError, ResultExt};
use crate::session::PressureLogger;
use crate::types::{AcquisitionStats, LinkState};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often stats are pushed to the observer while sampling
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Wake-up cadence while suspended waiting for a device address
const ADDRESS_WAIT: Duration = Duration::from_millis(100);

/// The worker that runs the acquisition loop
pub struct AcquisitionWorker {
    /// Application configuration
    config: AppConfig,
    /// Command receiver from the observer
    command_rx: Receiver<AcquisitionCommand>,
    /// Message sender to the observer
    message_tx: Sender<AcquisitionMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Sample source (ADC seam + conversion)
    sampler: Sampler,
    /// Simulation band state machine
    trigger: ThresholdTrigger,
    /// Paired-device link lifecycle
    link: LinkManager,
    /// Active log session, created when an address is assigned
    logger: Option<PressureLogger>,
    /// Address of the paired device, once assigned
    device_address: Option<String>,
    /// Whether trigger commands are routed to the link
    remote_enabled: bool,
    /// Whether the steady-state cycle is active
    sampling: bool,
    /// Minimum duration between cycles
    sample_interval: Duration,
    /// Statistics
    stats: AcquisitionStats,
    /// Last cycle time for rate limiting
    last_cycle: Instant,
    /// Last time stats were sent to the observer
    last_stats: Instant,
}

impl AcquisitionWorker {
    /// Create a new worker over the given hardware seams
    pub fn new(
        config: AppConfig,
        adc: Box<dyn PressureAdc>,
        link: Box<dyn StethoscopeLink>,
        command_rx: Receiver<AcquisitionCommand>,
        message_tx: Sender<AcquisitionMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let sampler = Sampler::new(adc, config.adc.clone(), config.calibration);
        let trigger = ThresholdTrigger::new(PressureBand::new(
            config.trigger.band_low_mmhg,
            config.trigger.band_high_mmhg,
        ));
        let sample_interval = config.acquisition.sample_interval();

        Self {
            config,
            command_rx,
            message_tx,
            running,
            sampler,
            trigger,
            link: LinkManager::new(link),
            logger: None,
            device_address: None,
            remote_enabled: false,
            sampling: false,
            sample_interval,
            stats: AcquisitionStats::default(),
            last_cycle: Instant::now(),
            last_stats: Instant::now(),
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("acquisition worker started");

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();

            // a stop request is observed between cycles, never mid-cycle
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            if self.sampling {
                self.cycle();

                if self.last_stats.elapsed() >= STATS_INTERVAL {
                    self.send_stats();
                    self.last_stats = Instant::now();
                }

                self.rate_limit();
            } else {
                self.wait_for_address();
            }
        }

        self.shutdown();
        let _ = self.message_tx.send(AcquisitionMessage::Shutdown);
        tracing::info!("acquisition worker stopped");
    }

    /// Process pending commands from the observer
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Suspension point: block on the command channel until a device address
    /// arrives (or a stop request)
    fn wait_for_address(&mut self) {
        match self.command_rx.recv_timeout(ADDRESS_WAIT) {
            Ok(cmd) => self.handle_command(cmd),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: AcquisitionCommand) {
        match cmd {
            AcquisitionCommand::SetDeviceAddress(address) => {
                if self.sampling {
                    // manual reconnect against a running session
                    self.device_address = Some(address);
                    self.open_link();
                } else {
                    self.begin_session(address);
                }
            }
            AcquisitionCommand::SetSampleInterval(interval) => {
                self.sample_interval = interval.max(Duration::from_millis(1));
            }
            AcquisitionCommand::SetLogInterval(secs) => {
                if let Some(logger) = self.logger.as_mut() {
                    logger.set_interval(secs);
                }
                self.config.logging.log_interval_secs = secs;
            }
            AcquisitionCommand::RequestStats => {
                self.send_stats();
            }
            AcquisitionCommand::Stop => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Start a session against the newly assigned device address
    fn begin_session(&mut self, address: String) {
        tracing::info!("device {} selected, starting acquisition", address);
        self.device_address = Some(address.clone());

        match PressureLogger::create(&self.config.logging, &address).context("creating log session")
        {
            Ok(logger) => {
                self.try_send(AcquisitionMessage::LogSessionStarted(
                    logger.path().to_path_buf(),
                ));
                self.logger = Some(logger);
            }
            Err(e) => {
                // acquisition proceeds without persistence
                tracing::error!("{}", e);
                self.try_send(AcquisitionMessage::LogError(e.to_string()));
            }
        }

        self.sampler.restart();
        self.open_link();
        self.sampling = true;
        self.last_cycle = Instant::now();
    }

    /// Open the link, run the status enquiry, and start remote recording
    fn open_link(&mut self) {
        let Some(address) = self.device_address.clone() else {
            return;
        };
        self.remote_enabled = false;
        self.publish_link_state(LinkState::Opening);

        match self.link.open(&address) {
            Ok(()) => {
                // the device needs a beat after connecting
                std::thread::sleep(self.config.link.settle());

                match self.link.status() {
                    Ok(online) => {
                        self.publish_link_state(LinkState::Open);
                        self.remote_enabled = true;

                        if online {
                            let session = self.config.logging.session_name();
                            match self.link.start_recording(&session) {
                                Ok(()) => {
                                    tracing::info!("remote recording started as {:?}", session)
                                }
                                Err(e) => self.report_link_error(e),
                            }
                        } else {
                            tracing::warn!("device answered the enquiry but is not ready");
                        }
                    }
                    Err(e) => self.report_link_error(e),
                }
            }
            Err(e) => {
                self.publish_link_state(LinkState::Failed);
                tracing::error!("{}", e);
                self.try_send(AcquisitionMessage::LinkError(e.to_string()));
            }
        }
    }

    /// One steady-state cycle: sample, trigger, log, publish
    fn cycle(&mut self) {
        let reading = match self.sampler.sample() {
            Ok(r) => {
                self.stats.successful_reads += 1;
                r
            }
            Err(e) => {
                // fatal to this cycle only; downstream steps are skipped
                self.stats.failed_reads += 1;
                tracing::warn!("sample failed, retrying next cycle: {}", e);
                return;
            }
        };

        if let Some(command) = self.trigger.update(reading.pressure_mmhg) {
            self.stats.trigger_transitions += 1;
            self.try_send(AcquisitionMessage::TriggerChanged(self.trigger.state()));
            tracing::debug!(
                "pressure {:.1} mmHg crossed the band, now {}",
                reading.pressure_mmhg,
                self.trigger.state()
            );

            if self.remote_enabled {
                // the state transition stands whether or not delivery succeeds
                if let Err(e) = self.link.send(command) {
                    self.report_link_error(e);
                }
            }
        }

        if let Some(logger) = self.logger.as_mut() {
            match logger.maybe_log(&reading) {
                Ok(true) => self.stats.records_logged += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("log write failed: {}", e);
                    self.try_send(AcquisitionMessage::LogError(e.to_string()));
                }
            }
        }

        self.try_send(AcquisitionMessage::Reading(reading));
    }

    /// Classify a link fault: unrecoverable faults disable remote commands,
    /// everything else is reported and retried organically
    fn report_link_error(&mut self, e: PressureLinkError) {
        if !e.is_transient() {
            self.remote_enabled = false;
            self.publish_link_state(LinkState::Failed);
            tracing::error!("remote commands disabled: {}", e);
        } else {
            tracing::warn!("{}", e);
        }
        self.try_send(AcquisitionMessage::LinkError(e.to_string()));
    }

    /// Sleep out the remainder of the sample interval
    fn rate_limit(&mut self) {
        if self.sample_interval.is_zero() {
            std::thread::yield_now();
        } else {
            let elapsed = self.last_cycle.elapsed();
            if elapsed < self.sample_interval {
                std::thread::sleep(self.sample_interval - elapsed);
            }
        }
        self.last_cycle = Instant::now();
    }

    /// Shutdown sequence: stop remote recording, wait the grace period, then
    /// close the link unconditionally and finish the log session
    fn shutdown(&mut self) {
        if self.link.state() == LinkState::Open {
            tracing::info!("stopping remote recording");
            if let Err(e) = self.link.stop_recording() {
                tracing::warn!("stop recording failed: {}", e);
            }
            std::thread::sleep(self.config.link.shutdown_grace());
        }

        // cleanup must not depend on the remote device's cooperation
        self.link.close();
        self.publish_link_state(LinkState::Closed);

        if let Some(logger) = self.logger.take() {
            tracing::info!("log session closed with {} records", logger.records());
            if let Err(e) = logger.finish() {
                tracing::warn!("closing log session failed: {}", e);
            }
        }
    }

    fn publish_link_state(&mut self, state: LinkState) {
        self.try_send(AcquisitionMessage::LinkStatus(state));
    }

    /// Send statistics to the observer
    fn send_stats(&mut self) {
        self.stats.link_reconnects = self.link.reconnects();
        self.try_send(AcquisitionMessage::Stats(self.stats.clone()));
    }

    /// Try to send a message, counting drops if the channel is full
    ///
    /// Uses try_send() to avoid blocking the loop on a slow observer.
    fn try_send(&mut self, msg: AcquisitionMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_messages += 1;
        }
    }
}
