//! Shared entity definitions
//!
//! Cameras, stream sessions, detection schedules and detection results.
//! Schedules are terminal once their status leaves `Active`; detection
//! results are append-only and never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Camera status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Offline,
    Online,
    Streaming,
}

/// Registered camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Unique camera ID (e.g. "cam_1")
    pub id: String,
    pub name: String,
    /// Unique IP address
    pub ip: String,
    pub location: String,
    pub status: CameraStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Camera {
    /// Create a new camera, initially offline
    pub fn new(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>, location: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
            location: location.into(),
            status: CameraStatus::Offline,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stream session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stopped,
    Error,
}

/// One streaming session of one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSession {
    pub camera_id: String,
    /// Unique per start
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl StreamSession {
    /// Open a new active session for a camera
    pub fn open(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Active,
        }
    }
}

/// Detection schedule status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Active,
    Completed,
    Error,
    Cancelled,
}

impl ScheduleStatus {
    /// Terminal states are sinks; no further transition is permitted
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScheduleStatus::Active)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Error => "error",
            ScheduleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A time-bounded request to run repeated detection sweeps over a fixed
/// set of cameras
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSchedule {
    /// Unique ID (format: `schedule_{unix_ts}_{uuid8}`)
    pub id: String,
    /// Fixed at creation; no dynamic membership change
    pub camera_ids: Vec<String>,
    /// Schedule lifetime in minutes (1-120)
    pub duration_minutes: u32,
    pub status: ScheduleStatus,
    pub start_time: DateTime<Utc>,
    /// Set if and only if status is terminal
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DetectionSchedule {
    /// Create a new active schedule starting now
    pub fn new(camera_ids: Vec<String>, duration_minutes: u32) -> Self {
        let now = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("schedule_{}_{}", now.timestamp(), &suffix[..8]),
            camera_ids,
            duration_minutes,
            status: ScheduleStatus::Active,
            start_time: now,
            end_time: None,
            created_at: now,
        }
    }
}

/// A detected face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One face-detection hit for one camera (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub camera_id: String,
    /// Capture time, unix seconds
    pub timestamp: i64,
    /// Number of faces found, >= 1 for persisted results
    pub faces_count: u32,
    /// Reference to the annotated image
    pub image_ref: String,
    pub schedule_id: Option<String>,
    pub test_mode: bool,
}

impl DetectionResult {
    /// Build a result for a batch hit, deriving the image reference the
    /// same way the capture path names saved frames
    pub fn from_sweep(camera_id: &str, timestamp: i64, faces_count: u32, schedule_id: Option<&str>) -> Self {
        let image_ref = match schedule_id {
            Some(sid) => format!("/static/detections/{camera_id}_{timestamp}_{sid}.jpg"),
            None => format!("/static/detections/{camera_id}_{timestamp}.jpg"),
        };
        Self {
            camera_id: camera_id.to_string(),
            timestamp,
            faces_count,
            image_ref,
            schedule_id: schedule_id.map(str::to_string),
            test_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_id_format() {
        let schedule = DetectionSchedule::new(vec!["cam_1".to_string()], 5);
        assert!(schedule.id.starts_with("schedule_"));
        assert_eq!(schedule.status, ScheduleStatus::Active);
        assert!(schedule.end_time.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ScheduleStatus::Active.is_terminal());
        assert!(ScheduleStatus::Completed.is_terminal());
        assert!(ScheduleStatus::Error.is_terminal());
        assert!(ScheduleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_detection_image_ref() {
        let result = DetectionResult::from_sweep("cam_3", 1700000000, 2, Some("schedule_1_abc"));
        assert_eq!(
            result.image_ref,
            "/static/detections/cam_3_1700000000_schedule_1_abc.jpg"
        );
        let plain = DetectionResult::from_sweep("cam_3", 1700000000, 1, None);
        assert_eq!(plain.image_ref, "/static/detections/cam_3_1700000000.jpg");
    }
}
