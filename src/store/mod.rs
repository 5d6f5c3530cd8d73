//! Store - Source of Truth Interface
//!
//! ## Responsibilities
//!
//! - Durable access to cameras, sessions, detections and schedules
//! - Conditional schedule status writes (terminal states are sinks)
//!
//! Durable backends live behind this trait and are out of core scope;
//! the crate ships an in-memory implementation for the daemon and tests.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{Camera, DetectionResult, DetectionSchedule, ScheduleStatus, StreamSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source-of-truth interface consumed by the core
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a camera by ID
    async fn get_camera(&self, camera_id: &str) -> Result<Option<Camera>>;

    /// List all cameras
    async fn list_cameras(&self) -> Result<Vec<Camera>>;

    /// Insert or replace a camera
    async fn save_camera(&self, camera: &Camera) -> Result<()>;

    /// Delete a camera
    async fn delete_camera(&self, camera_id: &str) -> Result<()>;

    /// Append a detection result (never mutated afterwards)
    async fn save_detection(&self, result: &DetectionResult) -> Result<()>;

    /// List detections newest-first with pagination; returns (items, total)
    async fn list_detections(&self, page: u32, per_page: u32) -> Result<(Vec<DetectionResult>, u64)>;

    /// Record a newly opened stream session
    async fn open_session(&self, session: &StreamSession) -> Result<()>;

    /// Close all open sessions for a camera; returns how many were closed
    async fn close_sessions(&self, camera_id: &str) -> Result<usize>;

    /// Persist a new schedule
    async fn save_schedule(&self, schedule: &DetectionSchedule) -> Result<()>;

    /// Get a schedule by ID
    async fn get_schedule(&self, schedule_id: &str) -> Result<Option<DetectionSchedule>>;

    /// Conditionally transition a schedule out of `Active`.
    ///
    /// Returns `Ok(true)` if the write took effect, `Ok(false)` if the
    /// schedule was missing or already terminal. This is the only way any
    /// caller writes a terminal status, so races between the owning loop
    /// and an external cancel resolve to exactly one terminal state.
    async fn set_schedule_status(
        &self,
        schedule_id: &str,
        status: ScheduleStatus,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<bool>;
}
