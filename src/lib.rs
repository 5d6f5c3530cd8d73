//! Camwatch - Camera Fleet Detection Scheduling
//!
//! Concurrent face-detection scheduling and stream admission control for
//! a camera fleet.
//!
//! ## Architecture (8 Components)
//!
//! 1. CameraDirectory - Camera registry and cached read paths
//! 2. AdmissionController - Stream slot gating
//! 3. DetectionScheduler - Schedule lifecycle and tick loops
//! 4. DetectionWorkerPool - Bounded per-camera detection batches
//! 5. CacheAside - Read-through cache with TTLs and invalidation
//! 6. Store - Source-of-truth interface (in-memory implementation)
//! 7. Capture seam - FrameSource/Detector traits plus simulators
//! 8. EventHub - Detection event distribution
//!
//! ## Design Principles
//!
//! - The store is the single source of truth; the cache only accelerates
//! - Terminal schedule states are sinks, enforced by conditional writes
//! - Per-camera failures never poison a batch or a schedule

pub mod admission;
pub mod cache;
pub mod capture;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod worker_pool;

pub use error::{Error, Result};
pub use state::AppState;
