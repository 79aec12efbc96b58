//! Pressure dial gauge - main entry point
//!
//! Headless acquisition daemon: samples the pressure transducer, logs
//! readings, and drives the paired stethoscope. Readings and status go to
//! stdout; a small operator console on stdin stands in for the graphical
//! dial (`address <id>`, `rate <ms>`, `log <secs>`, `stop`).

use anyhow::Context;
use linux_embedded_hal::I2cdev;
use pressurelink_rs::{
    acquisition::{
        AcquisitionBackend, AcquisitionCommand, AcquisitionMessage, Ads1115, PressureAdc,
        SerialStethoscopeLink, StethoscopeLink,
    },
    config::{AppConfig, DEFAULT_CONFIG_FILE},
};
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the console prints a dial line when readings stream in
const DISPLAY_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    // Initialize logging: console plus a daily-rolling diagnostic file
    let file_appender = tracing_appender::rolling::daily("logs", "pressurelink.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pressurelink_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!("Starting pressure dial gauge");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let use_mock = args.iter().any(|a| a == "--mock");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let config = AppConfig::load_or_default(&config_path);
    config.validate().context("invalid configuration")?;

    let (adc, link) = build_hardware(&config, use_mock)?;
    let (backend, observer) = AcquisitionBackend::new(config.clone(), adc, link);
    let worker = std::thread::spawn(move || backend.run());

    if let Some(address) = config.link.device_address.clone() {
        tracing::info!("using configured stethoscope {}", address);
        observer.set_device_address(address);
    } else {
        println!("no stethoscope configured; enter `address <id>` to start");
    }

    spawn_console(observer.command_sender.clone());

    // Display observer: surface readings and status until the loop shuts down
    let mut last_print = Instant::now();
    'display: loop {
        for msg in observer.drain() {
            match msg {
                AcquisitionMessage::Reading(reading) => {
                    if last_print.elapsed() >= DISPLAY_INTERVAL {
                        println!(
                            "{:8.2} s  {:7.2} kPa  {:7.2} mmHg",
                            reading.elapsed_seconds, reading.pressure_si, reading.pressure_mmhg
                        );
                        last_print = Instant::now();
                    }
                }
                AcquisitionMessage::LinkStatus(state) => println!("link: {}", state),
                AcquisitionMessage::TriggerChanged(state) => println!("playback: {}", state),
                AcquisitionMessage::LogSessionStarted(path) => {
                    println!("logging to {}", path.display())
                }
                AcquisitionMessage::LinkError(e) => eprintln!("link error: {}", e),
                AcquisitionMessage::LogError(e) => eprintln!("log error: {}", e),
                AcquisitionMessage::Stats(stats) => tracing::debug!(
                    "reads ok/failed {}/{} ({:.1}%), {} records, {} reconnects, {} dropped",
                    stats.successful_reads,
                    stats.failed_reads,
                    stats.success_rate(),
                    stats.records_logged,
                    stats.link_reconnects,
                    stats.dropped_messages,
                ),
                AcquisitionMessage::Shutdown => break 'display,
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let _ = worker.join();
    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Construct the hardware seams: the real ADS1115 + serial transport, or mock
/// hardware with `--mock` (requires the `mock-hardware` feature)
fn build_hardware(
    config: &AppConfig,
    use_mock: bool,
) -> anyhow::Result<(Box<dyn PressureAdc>, Box<dyn StethoscopeLink>)> {
    if use_mock {
        #[cfg(feature = "mock-hardware")]
        {
            use pressurelink_rs::acquisition::{MockAdc, MockLink, MockWaveform};
            tracing::info!("using mock hardware");
            let adc = MockAdc::new(MockWaveform::Sine {
                low: config.calibration.raw_low,
                high: config.calibration.raw_high,
                period_secs: 30.0,
            });
            return Ok((Box::new(adc), Box::new(MockLink::new())));
        }
        #[cfg(not(feature = "mock-hardware"))]
        anyhow::bail!("--mock requires a build with the mock-hardware feature");
    }

    let i2c = I2cdev::new(&config.adc.i2c_bus)
        .with_context(|| format!("opening I2C bus {}", config.adc.i2c_bus))?;
    let adc = Ads1115::new(i2c, config.adc.i2c_address);
    let link = SerialStethoscopeLink::new(
        config.link.port.clone(),
        config.link.baud_rate,
        config.link.timeout(),
    );
    Ok((Box::new(adc), Box::new(link)))
}

/// Operator console on stdin, standing in for the dial GUI
fn spawn_console(commands: crossbeam_channel::Sender<AcquisitionCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("address") => {
                    if let Some(addr) = parts.next() {
                        let _ = commands
                            .send(AcquisitionCommand::SetDeviceAddress(addr.to_string()));
                    } else {
                        eprintln!("usage: address <id>");
                    }
                }
                Some("rate") => {
                    if let Some(ms) = parts.next().and_then(|v| v.parse().ok()) {
                        let _ = commands
                            .send(AcquisitionCommand::SetSampleInterval(Duration::from_millis(ms)));
                    } else {
                        eprintln!("usage: rate <milliseconds>");
                    }
                }
                Some("log") => {
                    if let Some(secs) = parts.next().and_then(|v| v.parse().ok()) {
                        let _ = commands.send(AcquisitionCommand::SetLogInterval(secs));
                    } else {
                        eprintln!("usage: log <seconds>");
                    }
                }
                Some("stop") | Some("quit") | Some("exit") => {
                    let _ = commands.send(AcquisitionCommand::Stop);
                    return;
                }
                Some(other) => eprintln!("unknown command: {}", other),
                None => {}
            }
        }
        // stdin closed; request a clean stop
        let _ = commands.send(AcquisitionCommand::Stop);
    });
}
