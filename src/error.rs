//! Error handling for camwatch

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found (unknown camera/schedule)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (bad input shape/range)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (duplicate)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Admission denied (stream capacity exceeded)
    #[error("Admission denied: {0}")]
    AdmissionDenied(String),

    /// Invalid state transition (e.g. cancelling a finished schedule)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Frame capture failure (transient, isolated to one camera)
    #[error("Capture error for camera {camera_id}: {message}")]
    Capture { camera_id: String, message: String },

    /// Detector failure (transient, isolated to one camera)
    #[error("Detection error for camera {camera_id}: {message}")]
    Detection { camera_id: String, message: String },

    /// Write to the source of truth failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
