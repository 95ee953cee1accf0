//! Eye tracker collaborators and the frame/gaze synchronizer.

pub mod device;
pub mod session;
pub mod simulated;
pub mod sync;

pub use device::{CameraCalibrationSource, DeviceDiscovery, EyeTracker};
pub use session::DeviceSession;
pub use simulated::{
    GazeCursor, SimulatedCalibration, SimulatedConfig, SimulatedDetector, SimulatedDiscovery,
    SimulatedEyeTracker, SimulatedScene,
};
pub use sync::{MatchedPairSource, SyncConfig, Synchronizer};
