//! Application configuration
//!
//! All knobs are read from the environment with sensible defaults.
//! `.env` loading (dotenvy) happens in `main.rs`.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum cameras streaming at once
    pub max_streams: usize,
    /// Maximum cameras per detection schedule
    pub max_detection_cameras: usize,
    /// Detection worker pool size (process-wide, shared by all schedules)
    pub max_workers: usize,
    /// Interval between detection sweeps within a schedule
    pub tick_interval: Duration,
    /// Deadline for one detection batch
    pub batch_timeout: Duration,
    /// TTL for the camera directory listing
    pub cameras_ttl: Duration,
    /// TTL for per-camera detail entries
    pub camera_detail_ttl: Duration,
    /// TTL for paginated detection listings
    pub detections_ttl: Duration,
    /// TTL for the active-stream set
    pub streams_ttl: Duration,
    /// Default page size for detection listings
    pub pagination_per_page: u32,
    /// Camera seed file loaded at startup (if present)
    pub cameras_json_file: PathBuf,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_streams: env_u64("MAX_CAMERAS_STREAM", 20) as usize,
            max_detection_cameras: env_u64("MAX_CAMERAS_DETECTION", 20) as usize,
            max_workers: env_u64("MAX_WORKERS", 4) as usize,
            tick_interval: Duration::from_secs(env_u64("TICK_INTERVAL_SECS", 2)),
            batch_timeout: Duration::from_secs(env_u64("FACE_DETECTION_TIMEOUT", 30)),
            cameras_ttl: Duration::from_secs(env_u64("CACHE_CAMERAS_TIMEOUT", 300)),
            camera_detail_ttl: Duration::from_secs(env_u64("CACHE_CAMERA_DETAIL_TIMEOUT", 600)),
            detections_ttl: Duration::from_secs(env_u64("CACHE_DETECTIONS_TIMEOUT", 120)),
            streams_ttl: Duration::from_secs(env_u64("CACHE_STREAMS_TIMEOUT", 60)),
            pagination_per_page: env_u64("PAGINATION_PER_PAGE", 20) as u32,
            cameras_json_file: std::env::var("CAMERAS_JSON_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cameras.json")),
        }
    }
}
