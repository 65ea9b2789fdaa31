//! Headless telemetry monitor
//!
//! Connects to the instrument on a named serial port, starts continuous
//! telemetry, and logs the latest sample at the configured poll cadence.
//! With no port argument it lists the ports visible on this machine.
//!
//! ```bash
//! daqlink /dev/ttyUSB0 [--record] [--seconds N]
//! ```
//!
//! `--record` runs a recording session for the duration of the run and
//! writes the CSV on exit. With the `mock-link` feature the port name
//! `mock` drives the monitor from a synthetic signal generator instead
//! of real hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use daqlink::config::AppConfig;
use daqlink::link::{condition_channel, ConditionReporter, LinkDriver, Transport};
use daqlink::protocol::Command;
use daqlink::session::RecordingSession;
use daqlink::state::new_shared;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = AppConfig::load_or_default("daqlink.toml");

    let mut port_name: Option<String> = None;
    let mut record = false;
    let mut run_for: Option<Duration> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--record" => record = true,
            "--seconds" => {
                let value = iter.next().context("--seconds takes a whole number")?;
                run_for = Some(Duration::from_secs(
                    value.parse().context("--seconds takes a whole number")?,
                ));
            }
            other => port_name = Some(other.to_string()),
        }
    }

    let Some(port_name) = port_name else {
        let ports = daqlink::link::list_ports().context("listing serial ports")?;
        if ports.is_empty() {
            println!("no serial ports found");
        } else {
            println!("available ports:");
            for port in ports {
                println!("  {port}");
            }
        }
        return Ok(());
    };
    let port_name = port_name.as_str();

    let shared = new_shared();
    let (condition_tx, condition_rx) = condition_channel();

    let lost = Arc::new(AtomicBool::new(false));
    let lost_flag = lost.clone();
    let reporter = ConditionReporter::spawn(condition_rx, config.reporting.interval(), move |c| {
        tracing::error!("{c}");
        lost_flag.store(true, Ordering::SeqCst);
    });

    let transport = open_transport(port_name, &config)?;
    let mut link = LinkDriver::new(shared.clone(), condition_tx);
    link.open(transport)
        .with_context(|| format!("opening link on {port_name}"))?;
    link.send(Command::StartStream).context("starting telemetry")?;

    let mut session = RecordingSession::new(shared.clone(), &config.recording.output_dir);
    if record {
        session.start(&link);
    }

    tracing::info!("monitoring {port_name}; poll interval {:?}", config.sampling.poll_interval());
    let started = Instant::now();
    while !lost.load(Ordering::SeqCst) {
        if run_for.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        std::thread::sleep(config.sampling.poll_interval());

        let snapshot = shared.lock().unwrap().store.pull();
        if let Some((t, values)) = snapshot.latest() {
            tracing::info!(
                "t={t:8.3}s  {}",
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("CH{}={v:.4}", i + 1))
                    .collect::<Vec<_>>()
                    .join("  ")
            );
        }
    }

    if session.is_active() {
        match session.stop(&link) {
            Ok(Some(path)) => tracing::info!("session written to {}", path.display()),
            Ok(None) => tracing::info!("nothing recorded"),
            Err(e) => tracing::error!("failed to persist session: {e}"),
        }
    }

    // Best effort: the device may already be gone
    let _ = link.send(Command::StopStream);
    link.close();
    reporter.stop();
    Ok(())
}

/// Open the transport for the named port
fn open_transport(port_name: &str, config: &AppConfig) -> anyhow::Result<Box<dyn Transport>> {
    #[cfg(feature = "mock-link")]
    if port_name == "mock" {
        let mock = daqlink::link::mock::MockTransport::new();
        let _ = daqlink::link::mock::spawn_signal_generator(mock.clone());
        return Ok(Box::new(mock));
    }

    let transport = daqlink::link::SerialTransport::open(
        port_name,
        config.serial.baud_rate,
        config.serial.read_timeout(),
    )
    .with_context(|| format!("opening {port_name}"))?;
    Ok(Box::new(transport))
}
