use std::time::Duration;
use thiserror::Error;

/// Malformed marker configuration handed to the surface registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidGeometryError {
    #[error("surface needs at least {required} markers, got {found}")]
    TooFewMarkers { found: usize, required: usize },
    #[error("marker {0} registered twice")]
    DuplicateMarker(u32),
    #[error("marker {0} has degenerate corners")]
    DegenerateMarker(u32),
    #[error("marker {0} is wound opposite to the other markers")]
    InconsistentWinding(u32),
    #[error("display size {0}x{1} is empty")]
    EmptyDisplay(u32, u32),
}

/// Everything that ends a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no device found within {0:?}")]
    DeviceNotFound(Duration),
    #[error("device stream disconnected")]
    DeviceDisconnected,
    #[error("no frame/gaze pair received within {0:?}")]
    StalledStream(Duration),
    #[error("scene camera not connected")]
    MissingCameraIdentity,
    #[error("camera intrinsics unavailable for serial {serial}: {reason}")]
    Calibration { serial: String, reason: String },
    #[error(transparent)]
    InvalidGeometry(#[from] InvalidGeometryError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SessionError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::DeviceNotFound(_) => 1,
            SessionError::MissingCameraIdentity => 2,
            SessionError::DeviceDisconnected => 3,
            SessionError::StalledStream(_) => 4,
            SessionError::Calibration { .. } => 5,
            SessionError::InvalidGeometry(_) | SessionError::Config(_) => 6,
        }
    }

    /// The line shown to the subject before the session exits.
    pub fn notice(&self) -> &'static str {
        match self {
            SessionError::DeviceNotFound(_) => "No device found. Exiting...",
            SessionError::MissingCameraIdentity => "Scene camera not connected. Exiting...",
            SessionError::DeviceDisconnected => "Device disconnected. Exiting...",
            SessionError::StalledStream(_) => "Device stopped streaming. Exiting...",
            SessionError::Calibration { .. } => "Camera calibration unavailable. Exiting...",
            SessionError::InvalidGeometry(_) | SessionError::Config(_) => {
                "Invalid experiment setup. Exiting..."
            }
        }
    }
}
