//! AppState - Shared Component Graph
//!
//! Composition root for the daemon: one place that wires the store, the
//! cache, the admission controller, the worker pool, the scheduler, the
//! directory and the event hub together. Everything is behind `Arc` so
//! handlers and background tasks share one instance of each component.

use crate::admission::AdmissionController;
use crate::cache::CacheAside;
use crate::capture::{Detector, FrameSource};
use crate::config::AppConfig;
use crate::directory::CameraDirectory;
use crate::events::{EventHub, EventSink};
use crate::scheduler::DetectionScheduler;
use crate::store::Store;
use crate::worker_pool::DetectionWorkerPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub cache: Arc<CacheAside>,
    pub admission: Arc<AdmissionController>,
    pub pool: Arc<DetectionWorkerPool>,
    pub scheduler: Arc<DetectionScheduler>,
    pub directory: Arc<CameraDirectory>,
    pub events: Arc<EventHub>,
}

impl AppState {
    /// Wire the full component graph from a config and the injected seams
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn Detector>,
    ) -> Self {
        let cache = Arc::new(CacheAside::new());
        let events = Arc::new(EventHub::default());

        let admission = Arc::new(AdmissionController::new(
            config.max_streams,
            Arc::clone(&store),
            Arc::clone(&cache),
        ));

        let pool = Arc::new(DetectionWorkerPool::new(
            config.max_workers,
            frame_source,
            detector,
            config.batch_timeout,
        ));

        let scheduler = Arc::new(DetectionScheduler::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&pool),
            Arc::clone(&events) as Arc<dyn EventSink>,
            config.max_detection_cameras,
            config.tick_interval,
        ));

        let directory = Arc::new(CameraDirectory::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&admission),
            &config,
        ));

        Self {
            config,
            store,
            cache,
            admission,
            pool,
            scheduler,
            directory,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MarkerDetector, SimulatedFrameSource};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_wired_components_share_state() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedFrameSource::with_probability(0.0)),
            Arc::new(MarkerDetector),
        );

        let camera = state
            .directory
            .register_camera("Lobby", "10.0.0.1", "Lobby")
            .await
            .unwrap();

        // Admission and directory see the same store
        state.admission.start_stream(&camera.id).await.unwrap();
        assert_eq!(state.directory.active_streams().await.unwrap(), vec![camera.id.clone()]);

        state.admission.stop_all().await.unwrap();
    }
}
