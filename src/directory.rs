//! CameraDirectory - Camera Registry and Read Paths
//!
//! ## Responsibilities
//!
//! - Camera registration, lookup and removal
//! - Cached read paths for the directory, per-camera detail, detection
//!   listings and the active-stream set
//!
//! Writes go to the store first, then invalidate the affected cache
//! keys, so a read that follows a completed write never observes the
//! pre-write value. Removing a camera force-stops its stream before the
//! record disappears.

use crate::admission::AdmissionController;
use crate::cache::{keys, CacheAside};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::{Camera, DetectionResult};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

const MAX_NAME_LEN: usize = 100;
const MAX_LOCATION_LEN: usize = 200;
const MAX_PER_PAGE: u32 = 100;

/// One page of the detection listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionPage {
    pub items: Vec<DetectionResult>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// CameraDirectory instance
pub struct CameraDirectory {
    store: Arc<dyn Store>,
    cache: Arc<CacheAside>,
    admission: Arc<AdmissionController>,
    cameras_ttl: Duration,
    camera_detail_ttl: Duration,
    detections_ttl: Duration,
    streams_ttl: Duration,
    default_per_page: u32,
}

impl CameraDirectory {
    /// Create a new directory
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<CacheAside>,
        admission: Arc<AdmissionController>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            cache,
            admission,
            cameras_ttl: config.cameras_ttl,
            camera_detail_ttl: config.camera_detail_ttl,
            detections_ttl: config.detections_ttl,
            streams_ttl: config.streams_ttl,
            default_per_page: config.pagination_per_page,
        }
    }

    /// Full camera directory, cached
    pub async fn list_cameras(&self) -> Result<Vec<Camera>> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_load(keys::CAMERAS_ALL, self.cameras_ttl, move || async move {
                store.list_cameras().await
            })
            .await
    }

    /// One camera's detail, cached. Only found cameras are cached;
    /// a miss never plants a negative entry that could mask a camera
    /// registered moments later.
    pub async fn get_camera(&self, camera_id: &str) -> Result<Camera> {
        let key = keys::camera_detail(camera_id);
        if let Some(camera) = self.cache.get::<Camera>(&key).await {
            return Ok(camera);
        }

        let camera = self
            .store
            .get_camera(camera_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Camera {camera_id} not found")))?;

        self.cache.set(&key, &camera, self.camera_detail_ttl).await;
        Ok(camera)
    }

    /// Register a new camera.
    ///
    /// The ID continues the `cam_{n}` sequence after the highest existing
    /// numeric suffix. Name, location and IP are validated; the IP must be
    /// unique across the directory.
    pub async fn register_camera(
        &self,
        name: &str,
        ip: &str,
        location: &str,
    ) -> Result<Camera> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Camera name is required".to_string()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Error::Validation(format!(
                "Camera name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if location.len() > MAX_LOCATION_LEN {
            return Err(Error::Validation(format!(
                "Location must be at most {MAX_LOCATION_LEN} characters"
            )));
        }
        if ip.parse::<Ipv4Addr>().is_err() {
            return Err(Error::Validation(format!("Invalid IP address: {ip}")));
        }

        let cameras = self.store.list_cameras().await?;
        if cameras.iter().any(|c| c.ip == ip) {
            return Err(Error::Conflict(format!(
                "A camera with IP {ip} already exists"
            )));
        }

        let next = cameras
            .iter()
            .filter_map(|c| c.id.strip_prefix("cam_"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let camera = Camera::new(format!("cam_{next}"), name, ip, location);
        self.store.save_camera(&camera).await?;
        self.cache.invalidate(keys::CAMERAS_ALL).await;
        self.cache.invalidate(&keys::camera_detail(&camera.id)).await;

        tracing::info!(
            camera_id = %camera.id,
            ip = %camera.ip,
            "Camera registered"
        );
        Ok(camera)
    }

    /// Remove a camera. Its stream is force-stopped first so no session
    /// outlives the record.
    pub async fn delete_camera(&self, camera_id: &str) -> Result<()> {
        if self.store.get_camera(camera_id).await?.is_none() {
            return Err(Error::NotFound(format!("Camera {camera_id} not found")));
        }

        self.admission.stop_stream(camera_id).await?;
        self.store.delete_camera(camera_id).await?;

        self.cache.invalidate(keys::CAMERAS_ALL).await;
        self.cache.invalidate(&keys::camera_detail(camera_id)).await;

        tracing::info!(camera_id = %camera_id, "Camera removed");
        Ok(())
    }

    /// Paginated detection listing, newest first.
    ///
    /// `page` is clamped to at least 1, `per_page` to 1..=100 with the
    /// configured default when absent. Only default-sized pages are
    /// cached; custom page sizes always read through.
    pub async fn list_detections(
        &self,
        page: u32,
        per_page: Option<u32>,
    ) -> Result<DetectionPage> {
        let page = page.max(1);
        let per_page = per_page
            .unwrap_or(self.default_per_page)
            .clamp(1, MAX_PER_PAGE);

        let store = Arc::clone(&self.store);
        let load = move || async move {
            let (items, total) = store.list_detections(page, per_page).await?;
            Ok(DetectionPage {
                items,
                total,
                page,
                per_page,
            })
        };

        if per_page == self.default_per_page {
            self.cache
                .get_or_load(&keys::detection_results(page), self.detections_ttl, load)
                .await
        } else {
            load().await
        }
    }

    /// Total number of persisted detections, cached
    pub async fn detection_count(&self) -> Result<u64> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_load(keys::DETECTION_COUNT, self.detections_ttl, move || async move {
                let (_, total) = store.list_detections(1, 1).await?;
                Ok(total)
            })
            .await
    }

    /// Sorted snapshot of the cameras currently streaming, cached
    pub async fn active_streams(&self) -> Result<Vec<String>> {
        let admission = Arc::clone(&self.admission);
        self.cache
            .get_or_load(keys::ACTIVE_STREAMS, self.streams_ttl, move || async move {
                Ok(admission.get_active().await)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Harness {
        store: Arc<MemoryStore>,
        cache: Arc<CacheAside>,
        admission: Arc<AdmissionController>,
        directory: CameraDirectory,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheAside::new());
        let admission = Arc::new(AdmissionController::new(
            5,
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&cache),
        ));
        let directory = CameraDirectory::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&cache),
            Arc::clone(&admission),
            &AppConfig::default(),
        );
        Harness {
            store,
            cache,
            admission,
            directory,
        }
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let h = harness();
        let first = h
            .directory
            .register_camera("Front Door", "10.0.0.1", "Entrance")
            .await
            .unwrap();
        let second = h
            .directory
            .register_camera("Back Door", "10.0.0.2", "Rear")
            .await
            .unwrap();
        assert_eq!(first.id, "cam_1");
        assert_eq!(second.id, "cam_2");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let h = harness();

        let blank = h.directory.register_camera("  ", "10.0.0.1", "x").await;
        assert!(matches!(blank, Err(Error::Validation(_))));

        let long_name = "n".repeat(101);
        let name = h.directory.register_camera(&long_name, "10.0.0.1", "x").await;
        assert!(matches!(name, Err(Error::Validation(_))));

        let long_location = "l".repeat(201);
        let location = h
            .directory
            .register_camera("Cam", "10.0.0.1", &long_location)
            .await;
        assert!(matches!(location, Err(Error::Validation(_))));

        let bad_ip = h.directory.register_camera("Cam", "256.1.1.1", "x").await;
        assert!(matches!(bad_ip, Err(Error::Validation(_))));

        let not_an_ip = h.directory.register_camera("Cam", "camera.local", "x").await;
        assert!(matches!(not_an_ip, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_ip() {
        let h = harness();
        h.directory
            .register_camera("One", "10.0.0.1", "x")
            .await
            .unwrap();
        let dup = h.directory.register_camera("Two", "10.0.0.1", "y").await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_sees_new_camera_after_register() {
        let h = harness();
        h.directory
            .register_camera("One", "10.0.0.1", "x")
            .await
            .unwrap();

        // Warm the directory cache
        assert_eq!(h.directory.list_cameras().await.unwrap().len(), 1);

        // Registration invalidates, so the next list reflects the write
        h.directory
            .register_camera("Two", "10.0.0.2", "y")
            .await
            .unwrap();
        assert_eq!(h.directory.list_cameras().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_miss_does_not_mask_later_registration() {
        let h = harness();

        // Miss before the camera exists must not leave a negative entry
        let before = h.directory.get_camera("cam_1").await;
        assert!(matches!(before, Err(Error::NotFound(_))));

        let camera = h
            .directory
            .register_camera("Front Door", "10.0.0.1", "Entrance")
            .await
            .unwrap();
        assert_eq!(camera.id, "cam_1");

        let after = h.directory.get_camera("cam_1").await.unwrap();
        assert_eq!(after.ip, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_get_unknown_camera_is_not_found() {
        let h = harness();
        let result = h.directory.get_camera("cam_99").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_camera_is_not_found() {
        let h = harness();
        let result = h.directory.delete_camera("cam_99").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_force_stops_stream() {
        let h = harness();
        let camera = h
            .directory
            .register_camera("One", "10.0.0.1", "x")
            .await
            .unwrap();

        h.admission.start_stream(&camera.id).await.unwrap();
        assert_eq!(h.admission.active_count().await, 1);

        h.directory.delete_camera(&camera.id).await.unwrap();
        assert_eq!(h.admission.active_count().await, 0);
        assert!(h.store.get_camera(&camera.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detection_listing_clamps_paging() {
        let h = harness();
        for i in 0..5 {
            let result = DetectionResult::from_sweep("cam_1", 1_700_000_000 + i, 1, None);
            h.store.save_detection(&result).await.unwrap();
        }

        // page 0 is treated as page 1, per_page is capped at 100
        let page = h.directory.list_detections(0, Some(500)).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_detection_listing_newest_first() {
        let h = harness();
        for i in 0..3 {
            let result = DetectionResult::from_sweep("cam_1", 1_700_000_000 + i, 1, None);
            h.store.save_detection(&result).await.unwrap();
        }

        let page = h.directory.list_detections(1, Some(2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].timestamp, 1_700_000_002);
        assert_eq!(page.items[1].timestamp, 1_700_000_001);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_reads_work_with_cache_down() {
        let h = harness();
        h.cache.set_available(false);

        h.directory
            .register_camera("One", "10.0.0.1", "x")
            .await
            .unwrap();
        assert_eq!(h.directory.list_cameras().await.unwrap().len(), 1);
        assert_eq!(h.directory.detection_count().await.unwrap(), 0);
        assert!(h.directory.active_streams().await.unwrap().is_empty());
    }
}
