//! DetectionScheduler - Schedule Lifecycle and Tick Loop
//!
//! ## Responsibilities
//!
//! - Validate and persist detection schedules
//! - Drive one independent tick loop per schedule
//! - Persist batch results, invalidate listings, publish events
//! - Own the `active -> completed/error` transitions
//!
//! State machine per schedule: `ACTIVE -> {COMPLETED | ERROR | CANCELLED}`.
//! Terminal writes go through the store's conditional status update, so
//! the owning loop and an external cancel can race and exactly one
//! terminal status wins. Cancellation is observed at tick boundaries
//! only; worst-case latency is one tick interval.

use crate::cache::{keys, CacheAside};
use crate::error::{Error, Result};
use crate::events::{DetectionEvent, EventSink};
use crate::models::{DetectionResult, DetectionSchedule, ScheduleStatus};
use crate::store::Store;
use crate::worker_pool::DetectionWorkerPool;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Schedule duration bounds in minutes
const MIN_DURATION_MINUTES: u32 = 1;
const MAX_DURATION_MINUTES: u32 = 120;

/// DetectionScheduler instance
pub struct DetectionScheduler {
    store: Arc<dyn Store>,
    cache: Arc<CacheAside>,
    pool: Arc<DetectionWorkerPool>,
    events: Arc<dyn EventSink>,
    max_detection_cameras: usize,
    tick_interval: Duration,
}

impl DetectionScheduler {
    /// Create a new scheduler
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<CacheAside>,
        pool: Arc<DetectionWorkerPool>,
        events: Arc<dyn EventSink>,
        max_detection_cameras: usize,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            pool,
            events,
            max_detection_cameras,
            tick_interval,
        }
    }

    /// Create a schedule and start its detection loop.
    ///
    /// Validates the camera set and duration, checks every camera against
    /// the source of truth (not the cache, which could reject on stale
    /// data), persists the schedule and spawns its loop. Returns as soon
    /// as the schedule is persisted; the caller never blocks on ticks.
    pub async fn create_schedule(
        self: &Arc<Self>,
        camera_ids: Vec<String>,
        duration_minutes: u32,
    ) -> Result<String> {
        if camera_ids.is_empty() {
            return Err(Error::Validation(
                "At least one camera must be selected".to_string(),
            ));
        }
        if camera_ids.len() > self.max_detection_cameras {
            return Err(Error::Validation(format!(
                "Cannot schedule more than {} cameras at once",
                self.max_detection_cameras
            )));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(Error::Validation(format!(
                "Duration must be {MIN_DURATION_MINUTES}-{MAX_DURATION_MINUTES} minutes"
            )));
        }

        for camera_id in &camera_ids {
            if self.store.get_camera(camera_id).await?.is_none() {
                return Err(Error::Validation(format!(
                    "Camera {camera_id} does not exist"
                )));
            }
        }

        let schedule = DetectionSchedule::new(camera_ids, duration_minutes);
        self.store.save_schedule(&schedule).await?;

        tracing::info!(
            schedule_id = %schedule.id,
            cameras = schedule.camera_ids.len(),
            duration_minutes = duration_minutes,
            "Detection schedule created"
        );

        let scheduler = Arc::clone(self);
        let schedule_id = schedule.id.clone();
        tokio::spawn(async move {
            scheduler.run_loop(schedule).await;
        });

        Ok(schedule_id)
    }

    /// Cancel an active schedule.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidState` once the
    /// schedule is terminal. The owning loop discovers the cancellation
    /// at its next tick; in-flight batch work is not interrupted.
    pub async fn cancel_schedule(&self, schedule_id: &str) -> Result<()> {
        let Some(schedule) = self.store.get_schedule(schedule_id).await? else {
            return Err(Error::NotFound(format!(
                "Schedule {schedule_id} not found"
            )));
        };

        if schedule.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "Schedule {schedule_id} is already {}",
                schedule.status
            )));
        }

        // Conditional write; a concurrent completion may win the race
        let cancelled = self
            .store
            .set_schedule_status(schedule_id, ScheduleStatus::Cancelled, Some(Utc::now()))
            .await?;

        if cancelled {
            tracing::info!(schedule_id = %schedule_id, "Detection schedule cancelled");
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "Schedule {schedule_id} already finished"
            )))
        }
    }

    /// Look up a schedule
    pub async fn get_schedule(&self, schedule_id: &str) -> Result<DetectionSchedule> {
        self.store
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Schedule {schedule_id} not found")))
    }

    /// Tick loop for one schedule. Ticks are strictly sequential: the
    /// next sweep never starts before the previous batch resolved.
    async fn run_loop(&self, schedule: DetectionSchedule) {
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(u64::from(schedule.duration_minutes) * 60);

        tracing::info!(
            schedule_id = %schedule.id,
            cameras = schedule.camera_ids.len(),
            duration_minutes = schedule.duration_minutes,
            "Detection loop started"
        );

        while tokio::time::Instant::now() < deadline {
            // Re-read from the source of truth; an external cancel ends
            // the loop without another status write
            match self.store.get_schedule(&schedule.id).await {
                Ok(Some(current)) if current.status == ScheduleStatus::Active => {}
                Ok(_) => {
                    tracing::info!(
                        schedule_id = %schedule.id,
                        "Schedule no longer active, stopping loop"
                    );
                    return;
                }
                Err(e) => {
                    self.fail_schedule(&schedule.id, &e).await;
                    return;
                }
            }

            let results = self
                .pool
                .run_batch(&schedule.camera_ids, Some(&schedule.id))
                .await;

            for result in results.into_iter().flatten() {
                if let Err(e) = self.record_detection(&result).await {
                    self.fail_schedule(&schedule.id, &e).await;
                    return;
                }
            }

            tokio::time::sleep(self.tick_interval).await;
        }

        // Duration elapsed; the write loses silently if a cancel beat it
        match self
            .store
            .set_schedule_status(&schedule.id, ScheduleStatus::Completed, Some(Utc::now()))
            .await
        {
            Ok(true) => {
                tracing::info!(schedule_id = %schedule.id, "Detection schedule completed");
            }
            Ok(false) => {
                tracing::debug!(
                    schedule_id = %schedule.id,
                    "Schedule already terminal at completion"
                );
            }
            Err(e) => {
                tracing::error!(
                    schedule_id = %schedule.id,
                    error = %e,
                    "Failed to record schedule completion"
                );
            }
        }
    }

    /// Persist one detection, refresh listings, notify subscribers.
    /// Cache invalidation runs after the write so a following read never
    /// sees pre-write data for the invalidated keys.
    async fn record_detection(&self, result: &DetectionResult) -> Result<()> {
        self.store.save_detection(result).await?;

        self.cache
            .invalidate_prefix(keys::DETECTION_RESULTS_PREFIX)
            .await;
        self.cache.invalidate(keys::DETECTION_COUNT).await;

        self.events.publish(DetectionEvent::from(result)).await;
        Ok(())
    }

    /// Unrecoverable loop failure: terminal `error` status, results
    /// already persisted stay untouched, the process keeps running.
    async fn fail_schedule(&self, schedule_id: &str, cause: &Error) {
        tracing::error!(
            schedule_id = %schedule_id,
            error = %cause,
            "Detection loop failed, marking schedule as error"
        );

        match self
            .store
            .set_schedule_status(schedule_id, ScheduleStatus::Error, Some(Utc::now()))
            .await
        {
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    schedule_id = %schedule_id,
                    error = %e,
                    "Failed to record schedule error status"
                );
            }
        }
    }
}
