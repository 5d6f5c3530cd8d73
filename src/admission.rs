//! AdmissionController - Stream Slot Gating
//!
//! ## Responsibilities
//!
//! - Gate concurrent camera streams against a fixed capacity
//! - Open/close stream session records alongside slot changes
//! - Keep the cached active-stream set consistent
//!
//! The active set lives behind one mutex and check-and-reserve happens in
//! a single critical section, so the observed active count never exceeds
//! capacity and never goes negative under any interleaving.

use crate::cache::{keys, CacheAside};
use crate::error::{Error, Result};
use crate::models::StreamSession;
use crate::store::Store;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// AdmissionController instance
pub struct AdmissionController {
    max_streams: usize,
    active: Mutex<HashSet<String>>,
    store: Arc<dyn Store>,
    cache: Arc<CacheAside>,
}

impl AdmissionController {
    /// Create a new controller with the given stream capacity
    pub fn new(max_streams: usize, store: Arc<dyn Store>, cache: Arc<CacheAside>) -> Self {
        Self {
            max_streams,
            active: Mutex::new(HashSet::new()),
            store,
            cache,
        }
    }

    /// Start streaming a camera.
    ///
    /// Idempotent for a camera that already holds a slot (no second
    /// session is opened). Fails with `NotFound` for unknown cameras and
    /// `AdmissionDenied` at capacity, leaving state unchanged.
    pub async fn start_stream(&self, camera_id: &str) -> Result<()> {
        if self.store.get_camera(camera_id).await?.is_none() {
            return Err(Error::NotFound(format!("Camera {camera_id} not found")));
        }

        {
            // Check-and-reserve plus session creation under one lock
            let mut active = self.active.lock().await;

            if active.contains(camera_id) {
                tracing::debug!(camera_id = %camera_id, "Stream already active, idempotent start");
                return Ok(());
            }

            if active.len() >= self.max_streams {
                tracing::warn!(
                    camera_id = %camera_id,
                    active = active.len(),
                    max_streams = self.max_streams,
                    "Stream admission denied"
                );
                return Err(Error::AdmissionDenied(format!(
                    "Cannot stream more than {} cameras at once",
                    self.max_streams
                )));
            }

            active.insert(camera_id.to_string());

            let session = StreamSession::open(camera_id);
            if let Err(e) = self.store.open_session(&session).await {
                // Roll the slot back so capacity stays accurate
                active.remove(camera_id);
                return Err(e);
            }

            tracing::info!(
                camera_id = %camera_id,
                session_id = %session.session_id,
                active = active.len(),
                "Stream started"
            );
        }

        self.cache.invalidate(keys::ACTIVE_STREAMS).await;
        Ok(())
    }

    /// Stop streaming a camera. Always succeeds; stopping a camera that
    /// is not streaming is a no-op.
    pub async fn stop_stream(&self, camera_id: &str) -> Result<()> {
        let held = {
            let mut active = self.active.lock().await;
            active.remove(camera_id)
        };

        let closed = self.store.close_sessions(camera_id).await?;
        if held || closed > 0 {
            tracing::info!(
                camera_id = %camera_id,
                sessions_closed = closed,
                "Stream stopped"
            );
            self.cache.invalidate(keys::ACTIVE_STREAMS).await;
        }

        Ok(())
    }

    /// Stop every active stream; returns how many were stopped
    pub async fn stop_all(&self) -> Result<usize> {
        let camera_ids = self.get_active().await;
        for camera_id in &camera_ids {
            self.stop_stream(camera_id).await?;
        }
        tracing::info!(count = camera_ids.len(), "All streams stopped");
        Ok(camera_ids.len())
    }

    /// Snapshot of the active camera set, detached from internal state
    pub async fn get_active(&self) -> Vec<String> {
        let active = self.active.lock().await;
        let mut ids: Vec<String> = active.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of cameras currently streaming
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }
}
