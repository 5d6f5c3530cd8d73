//! In-memory Store implementation
//!
//! Backs the daemon and the test suite. Tables live under RwLocks; the
//! conditional schedule status write is a single critical section.

use super::Store;
use crate::error::{Error, Result};
use crate::models::{
    Camera, DetectionResult, DetectionSchedule, ScheduleStatus, SessionStatus, StreamSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory source of truth
#[derive(Default)]
pub struct MemoryStore {
    cameras: RwLock<HashMap<String, Camera>>,
    sessions: RwLock<Vec<StreamSession>>,
    detections: RwLock<Vec<DetectionResult>>,
    schedules: RwLock<HashMap<String, DetectionSchedule>>,
    /// Test switch: make detection writes fail with a persistence error
    fail_detection_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `save_detection` calls fail (persistence-failure tests)
    pub fn fail_detection_writes(&self, fail: bool) {
        self.fail_detection_writes.store(fail, Ordering::Release);
    }

    /// All sessions recorded for a camera, in open order
    pub async fn sessions_for(&self, camera_id: &str) -> Vec<StreamSession> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.camera_id == camera_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_camera(&self, camera_id: &str) -> Result<Option<Camera>> {
        Ok(self.cameras.read().await.get(camera_id).cloned())
    }

    async fn list_cameras(&self) -> Result<Vec<Camera>> {
        let mut cameras: Vec<Camera> = self.cameras.read().await.values().cloned().collect();
        cameras.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cameras)
    }

    async fn save_camera(&self, camera: &Camera) -> Result<()> {
        self.cameras
            .write()
            .await
            .insert(camera.id.clone(), camera.clone());
        Ok(())
    }

    async fn delete_camera(&self, camera_id: &str) -> Result<()> {
        self.cameras.write().await.remove(camera_id);
        Ok(())
    }

    async fn save_detection(&self, result: &DetectionResult) -> Result<()> {
        if self.fail_detection_writes.load(Ordering::Acquire) {
            return Err(Error::Persistence("detection write refused".to_string()));
        }
        self.detections.write().await.push(result.clone());
        Ok(())
    }

    async fn list_detections(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<DetectionResult>, u64)> {
        let detections = self.detections.read().await;
        let total = detections.len() as u64;

        // Newest first; widen before multiplying so huge page numbers
        // yield an empty page instead of overflowing
        let page = page.max(1);
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let items = detections
            .iter()
            .rev()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn open_session(&self, session: &StreamSession) -> Result<()> {
        self.sessions.write().await.push(session.clone());
        Ok(())
    }

    async fn close_sessions(&self, camera_id: &str) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let mut closed = 0;
        for session in sessions
            .iter_mut()
            .filter(|s| s.camera_id == camera_id && s.status == SessionStatus::Active)
        {
            session.status = SessionStatus::Stopped;
            session.ended_at = Some(now);
            closed += 1;
        }
        Ok(closed)
    }

    async fn save_schedule(&self, schedule: &DetectionSchedule) -> Result<()> {
        self.schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, schedule_id: &str) -> Result<Option<DetectionSchedule>> {
        Ok(self.schedules.read().await.get(schedule_id).cloned())
    }

    async fn set_schedule_status(
        &self,
        schedule_id: &str,
        status: ScheduleStatus,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut schedules = self.schedules.write().await;
        match schedules.get_mut(schedule_id) {
            Some(schedule) if schedule.status == ScheduleStatus::Active => {
                schedule.status = status;
                schedule.end_time = end_time;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detection_pagination_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let result = DetectionResult::from_sweep("cam_1", 1_700_000_000 + i, 1, None);
            store.save_detection(&result).await.unwrap();
        }

        let (items, total) = store.list_detections(1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].timestamp, 1_700_000_004);
        assert_eq!(items[1].timestamp, 1_700_000_003);

        let (items, _) = store.list_detections(3, 2).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_pagination_past_the_end_is_empty() {
        let store = MemoryStore::new();
        let result = DetectionResult::from_sweep("cam_1", 1_700_000_000, 1, None);
        store.save_detection(&result).await.unwrap();

        let (items, total) = store.list_detections(u32::MAX, 100).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_conditional_status_write_is_single_shot() {
        let store = MemoryStore::new();
        let schedule = DetectionSchedule::new(vec!["cam_1".to_string()], 1);
        store.save_schedule(&schedule).await.unwrap();

        let now = Utc::now();
        let first = store
            .set_schedule_status(&schedule.id, ScheduleStatus::Cancelled, Some(now))
            .await
            .unwrap();
        assert!(first);

        // The losing write is a no-op
        let second = store
            .set_schedule_status(&schedule.id, ScheduleStatus::Completed, Some(now))
            .await
            .unwrap();
        assert!(!second);

        let stored = store.get_schedule(&schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_close_sessions_only_touches_open_ones() {
        let store = MemoryStore::new();
        store
            .open_session(&StreamSession::open("cam_1"))
            .await
            .unwrap();
        assert_eq!(store.close_sessions("cam_1").await.unwrap(), 1);
        // Second close finds nothing open
        assert_eq!(store.close_sessions("cam_1").await.unwrap(), 0);
    }
}
