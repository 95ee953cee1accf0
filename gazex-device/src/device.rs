use gazex_core::{GazeSample, SceneFrame, SessionError};
use gazex_mapping::CameraIntrinsics;
use std::time::Duration;

/// A connected wearable eye tracker.
pub trait EyeTracker {
    fn name(&self) -> String;
    fn module_serial(&self) -> Option<&str>;
    fn scene_camera_serial(&self) -> Option<&str>;

    /// Blocks until the device delivers the next scene frame together with the
    /// gaze sample matched to it. `None` waits forever.
    fn receive_matched_scene_video_frame_and_gaze(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(SceneFrame, GazeSample), SessionError>;

    /// Releases the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// Finds the first reachable device.
pub trait DeviceDiscovery {
    type Device: EyeTracker;

    fn discover_one(&mut self, max_search_duration: Duration) -> Option<Self::Device>;
}

/// Looks up scene camera intrinsics by camera serial.
pub trait CameraCalibrationSource {
    fn camera_for_scene_cam_serial(&self, serial: &str) -> Result<CameraIntrinsics, SessionError>;
}
