//! detect_api - HTTP detection service.
//!
//! Serves `POST /api/detect` (upload preset) and `POST /api/webcam-detect`
//! (webcam preset) plus `GET /health` until Ctrl-C.

use anyhow::Result;
use std::sync::{mpsc, Arc};

use insulator_inspect::{
    api::{ApiConfig, ApiServer},
    InspectorConfig, ServiceRegistry,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = InspectorConfig::load()?;
    let registry = Arc::new(ServiceRegistry::from_settings(&config.service)?);
    log::info!("detection services: {}", registry.list().join(", "));

    let api_handle = ApiServer::new(ApiConfig::from(&config.api), registry).spawn()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("detect_api waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
