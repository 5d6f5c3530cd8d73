//! Camwatch daemon
//!
//! Main entry point: seeds the camera directory, wires the component
//! graph and runs until interrupted.

use camwatch::capture::{MarkerDetector, SimulatedFrameSource};
use camwatch::config::AppConfig;
use camwatch::models::Camera;
use camwatch::state::AppState;
use camwatch::store::{MemoryStore, Store};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Camera seed file entry
#[derive(Debug, Deserialize)]
struct CameraSeed {
    id: String,
    name: String,
    ip: String,
    #[serde(default)]
    location: String,
}

/// Load cameras from the seed file, if present
async fn seed_cameras(store: &dyn Store, path: &Path) -> camwatch::Result<usize> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Camera seed file not found, starting empty");
        return Ok(0);
    }

    let raw = tokio::fs::read_to_string(path).await?;
    let seeds: Vec<CameraSeed> = serde_json::from_str(&raw)?;

    let count = seeds.len();
    for seed in seeds {
        let camera = Camera::new(seed.id, seed.name, seed.ip, seed.location);
        store.save_camera(&camera).await?;
    }

    Ok(count)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Camwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        max_streams = config.max_streams,
        max_detection_cameras = config.max_detection_cameras,
        max_workers = config.max_workers,
        tick_interval_secs = config.tick_interval.as_secs(),
        batch_timeout_secs = config.batch_timeout.as_secs(),
        cameras_json_file = %config.cameras_json_file.display(),
        "Configuration loaded"
    );

    // Initialize components
    let store = Arc::new(MemoryStore::new());
    let seeded = seed_cameras(store.as_ref(), &config.cameras_json_file).await?;
    tracing::info!(cameras = seeded, "Camera directory seeded");

    let state = AppState::new(
        config,
        store,
        Arc::new(SimulatedFrameSource::new()),
        Arc::new(MarkerDetector),
    );
    tracing::info!("Component graph initialized");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    // Close every open stream before exiting
    let stopped = state.admission.stop_all().await?;
    tracing::info!(streams_stopped = stopped, "Camwatch stopped");

    Ok(())
}
