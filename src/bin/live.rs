//! live - periodic capture → detect → overlay loop.
//!
//! Captures a frame every interval from the configured source, sends it to the
//! detection service (one request at a time) and writes each annotated frame
//! to the output directory. Runs until `--seconds` elapse or Ctrl-C.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use insulator_inspect::{
    live::{DirectorySink, LiveConfig, LiveDetection},
    open_source, InspectorConfig, ServiceRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "live", about = "Run live insulator fault detection on a frame source")]
struct Args {
    /// Frame source: stub://<name> or a local image path
    #[arg(long, value_name = "URI")]
    source: Option<String>,

    /// Directory for annotated frames
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Capture interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Detection service to use (mock-upload, mock-webcam, http)
    #[arg(long)]
    service: Option<String>,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long, value_name = "SECS")]
    seconds: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = InspectorConfig::load()?;
    if let Some(source) = args.source {
        config.live.source = source;
    }
    if let Some(out) = args.out {
        config.live.out_dir = out;
    }
    if let Some(ms) = args.interval_ms {
        config.live.interval = Duration::from_millis(ms);
    }
    if let Some(service) = args.service {
        config.service.default = service;
    }

    let registry = ServiceRegistry::from_settings(&config.service)?;
    let service = registry
        .default_service()
        .ok_or_else(|| anyhow::anyhow!("no detection service registered"))?;
    let source = open_source(&config.live.source, config.live.width, config.live.height)?;
    let sink = DirectorySink::new(&config.live.out_dir)?;
    log::info!(
        "live: source={} service={} out={}",
        config.live.source,
        config.service.default,
        config.live.out_dir.display()
    );

    let live = LiveDetection::new(
        LiveConfig {
            interval: config.live.interval,
            encoding: config.live.encoding,
        },
        source,
        service,
        config.overlay()?,
        sink,
    );
    let handle = live.spawn()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    match args.seconds {
        Some(secs) => {
            log::info!("live: running for {}s (Ctrl-C to stop early)", secs);
            let _ = rx.recv_timeout(Duration::from_secs(secs));
        }
        None => {
            log::info!("live: waiting for shutdown signal (Ctrl-C)...");
            let _ = rx.recv();
        }
    }

    log::info!("stopping capture loop...");
    let stats = handle.stop()?;
    println!(
        "frames captured: {}  presented: {}  ticks dropped: {}  detection failures: {}  stale: {}",
        stats.frames_captured,
        stats.frames_presented,
        stats.ticks_dropped,
        stats.detection_failures,
        stats.stale_discarded
    );
    if let Some(latest) = live.slot().latest() {
        println!("last overlay: frame #{} {}", latest.seq, latest.status());
    }
    Ok(())
}
