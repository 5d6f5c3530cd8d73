//! Capture seam - FrameSource and Detector
//!
//! ## Responsibilities
//!
//! - Trait seams for frame acquisition and face detection
//! - Simulated implementations for the daemon binary and tests
//!
//! Real camera protocol handling and detector accuracy are out of scope;
//! everything behind these traits is a black box to the core.

use crate::error::{Error, Result};
use crate::models::FaceBox;
use async_trait::async_trait;
use rand::Rng;

/// One captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub camera_id: String,
    pub width: u32,
    pub height: u32,
    /// Grayscale pixel data, row-major
    pub data: Vec<u8>,
}

/// Frame acquisition seam
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one frame from a camera
    async fn capture(&self, camera_id: &str) -> Result<Frame>;
}

/// Face detection seam (pure, bounded latency)
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect faces in a frame
    async fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>>;
}

const SIM_WIDTH: u32 = 640;
const SIM_HEIGHT: u32 = 480;

/// Synthetic frame source: produces a blank frame that carries a face
/// marker with the configured probability
pub struct SimulatedFrameSource {
    face_probability: f64,
}

impl SimulatedFrameSource {
    /// Default simulator, ~30% of frames carry a face
    pub fn new() -> Self {
        Self {
            face_probability: 0.3,
        }
    }

    /// Fixed face probability (0.0 or 1.0 for deterministic tests)
    pub fn with_probability(face_probability: f64) -> Self {
        Self { face_probability }
    }
}

impl Default for SimulatedFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for SimulatedFrameSource {
    async fn capture(&self, camera_id: &str) -> Result<Frame> {
        let mut data = vec![0u8; (SIM_WIDTH * SIM_HEIGHT) as usize];

        let has_face = rand::thread_rng().gen_bool(self.face_probability);
        if has_face {
            // Paint the marker block the detector looks for
            for y in 140..340u32 {
                for x in 220..420u32 {
                    data[(y * SIM_WIDTH + x) as usize] = 255;
                }
            }
        }

        tracing::trace!(camera_id = %camera_id, has_face = has_face, "Simulated frame captured");

        Ok(Frame {
            camera_id: camera_id.to_string(),
            width: SIM_WIDTH,
            height: SIM_HEIGHT,
            data,
        })
    }
}

/// Detector matching the simulator: reports one face when the marker
/// block is present
pub struct MarkerDetector;

#[async_trait]
impl Detector for MarkerDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>> {
        if frame.data.is_empty() {
            return Err(Error::Detection {
                camera_id: frame.camera_id.clone(),
                message: "empty frame".to_string(),
            });
        }

        let center = (frame.height / 2 * frame.width + frame.width / 2) as usize;
        if frame.data.get(center).copied().unwrap_or(0) > 0 {
            Ok(vec![FaceBox {
                x: 220,
                y: 140,
                width: 200,
                height: 200,
            }])
        } else {
            Ok(Vec::new())
        }
    }
}
