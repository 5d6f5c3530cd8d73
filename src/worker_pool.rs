//! DetectionWorkerPool - Bounded Per-Camera Detection Batches
//!
//! ## Responsibilities
//!
//! - Run one detection task per camera with bounded parallelism
//! - Isolate per-camera failures from the rest of the batch
//! - Enforce an overall batch deadline
//!
//! The semaphore is process-wide and shared by every schedule, so total
//! detection concurrency stays bounded no matter how many schedules run.
//! Deadline handling is best-effort abandonment: the batch stops waiting
//! and aborts outstanding tasks, but an in-flight blocking detector call
//! is not forcibly interrupted.

use crate::capture::{Detector, FrameSource};
use crate::models::DetectionResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

/// Shared detection worker pool
pub struct DetectionWorkerPool {
    semaphore: Arc<Semaphore>,
    frame_source: Arc<dyn FrameSource>,
    detector: Arc<dyn Detector>,
    batch_timeout: Duration,
}

impl DetectionWorkerPool {
    /// Create a pool with `max_workers` concurrent detection tasks
    pub fn new(
        max_workers: usize,
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            frame_source,
            detector,
            batch_timeout,
        }
    }

    /// Run one detection sweep over the given cameras.
    ///
    /// The returned vector has the same length and order as the input.
    /// A slot is `Some` only when the camera's frame produced at least one
    /// face before the batch deadline; capture failures, detector
    /// failures, empty frames and deadline-abandoned tasks all yield
    /// `None` without affecting other slots.
    pub async fn run_batch(
        &self,
        camera_ids: &[String],
        schedule_id: Option<&str>,
    ) -> Vec<Option<DetectionResult>> {
        let slots: Arc<Mutex<Vec<Option<DetectionResult>>>> =
            Arc::new(Mutex::new(vec![None; camera_ids.len()]));

        let mut handles = Vec::with_capacity(camera_ids.len());
        for (idx, camera_id) in camera_ids.iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let frame_source = Arc::clone(&self.frame_source);
            let detector = Arc::clone(&self.detector);
            let slots = Arc::clone(&slots);
            let camera_id = camera_id.clone();
            let schedule_id = schedule_id.map(str::to_string);

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                if let Some(result) =
                    sweep_camera(&*frame_source, &*detector, &camera_id, schedule_id.as_deref())
                        .await
                {
                    slots.lock().await[idx] = Some(result);
                }
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        if tokio::time::timeout(self.batch_timeout, futures::future::join_all(handles))
            .await
            .is_err()
        {
            // Stop waiting; tasks past the deadline keep their slot at None
            for abort in abort_handles {
                abort.abort();
            }
            tracing::warn!(
                cameras = camera_ids.len(),
                timeout_secs = self.batch_timeout.as_secs_f64(),
                "Detection batch hit its deadline, abandoning outstanding tasks"
            );
        }

        let mut slots = slots.lock().await;
        std::mem::take(&mut *slots)
    }
}

/// One camera's sweep: capture, detect, build a result on a hit.
/// Failures are logged and isolated to this camera.
async fn sweep_camera(
    frame_source: &dyn FrameSource,
    detector: &dyn Detector,
    camera_id: &str,
    schedule_id: Option<&str>,
) -> Option<DetectionResult> {
    let frame = match frame_source.capture(camera_id).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(camera_id = %camera_id, error = %e, "Frame capture failed");
            return None;
        }
    };

    let faces = match detector.detect(&frame).await {
        Ok(faces) => faces,
        Err(e) => {
            tracing::warn!(camera_id = %camera_id, error = %e, "Face detection failed");
            return None;
        }
    };

    if faces.is_empty() {
        return None;
    }

    let result = DetectionResult::from_sweep(
        camera_id,
        chrono::Utc::now().timestamp(),
        faces.len() as u32,
        schedule_id,
    );

    tracing::info!(
        camera_id = %camera_id,
        faces_count = result.faces_count,
        schedule_id = ?schedule_id,
        "Faces detected"
    );

    Some(result)
}
