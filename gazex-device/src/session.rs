use crate::device::{CameraCalibrationSource, DeviceDiscovery, EyeTracker};
use gazex_core::{GazeSample, SceneFrame, SessionError};
use gazex_mapping::CameraIntrinsics;
use std::time::Duration;

/// Owns the device connection for the whole session and closes it when
/// dropped, whichever way the session ends.
pub struct DeviceSession<D: EyeTracker> {
    device: D,
    closed: bool,
}

impl<D: EyeTracker> DeviceSession<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            closed: false,
        }
    }

    pub fn discover<Q>(discovery: &mut Q, timeout: Duration) -> Result<Self, SessionError>
    where
        Q: DeviceDiscovery<Device = D>,
    {
        let device = discovery
            .discover_one(timeout)
            .ok_or(SessionError::DeviceNotFound(timeout))?;
        log::info!("Found {}", device.name());
        Ok(Self::new(device))
    }

    /// Discovers a device and fetches its camera intrinsics. On any failure
    /// the device, if one was found, is closed before the error returns.
    pub fn establish<Q, C>(
        discovery: &mut Q,
        calibration: &C,
        timeout: Duration,
    ) -> Result<(Self, CameraIntrinsics), SessionError>
    where
        Q: DeviceDiscovery<Device = D>,
        C: CameraCalibrationSource,
    {
        let session = Self::discover(discovery, timeout)?;
        let camera = session.camera_intrinsics(calibration)?;
        Ok((session, camera))
    }

    /// The module serial, or the scene camera serial when there is none.
    pub fn camera_serial(&self) -> Option<String> {
        self.device
            .module_serial()
            .filter(|s| !s.is_empty())
            .or_else(|| self.device.scene_camera_serial().filter(|s| !s.is_empty()))
            .map(str::to_owned)
    }

    pub fn camera_intrinsics<C>(&self, calibration: &C) -> Result<CameraIntrinsics, SessionError>
    where
        C: CameraCalibrationSource,
    {
        let serial = self
            .camera_serial()
            .ok_or(SessionError::MissingCameraIdentity)?;
        log::info!("Fetching intrinsics for scene camera {serial}");
        calibration.camera_for_scene_cam_serial(&serial)
    }

    pub fn receive(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(SceneFrame, GazeSample), SessionError> {
        if self.closed {
            return Err(SessionError::DeviceDisconnected);
        }
        self.device
            .receive_matched_scene_video_frame_and_gaze(timeout)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.device.close();
            self.closed = true;
            log::info!("Closed {}", self.device.name());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<D: EyeTracker> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
