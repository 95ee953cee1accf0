//! A stand-in eye tracker for running sessions without hardware.
//!
//! The "subject" looks wherever the mouse cursor is. A virtual scene camera
//! sees the display through a fixed perspective view; the matching
//! [`SimulatedDetector`] localizes the on-screen markers by projecting their
//! registered corners through that same view.

use crate::device::{CameraCalibrationSource, DeviceDiscovery, EyeTracker};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TrySendError};
use gazex_core::{Corners, GazeSample, Point2, SceneFrame, SessionError};
use gazex_mapping::{CameraIntrinsics, Homography, MarkerDetection, MarkerDetector, ScreenMarker};
use image::RgbImage;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Shared handle to where the simulated subject is looking, in display pixels
/// (top-left origin). `None` means the subject looks away from the display.
#[derive(Debug, Clone, Default)]
pub struct GazeCursor(Arc<Mutex<Option<Point2>>>);

impl GazeCursor {
    pub fn set(&self, x: f64, y: f64) {
        if let Ok(mut p) = self.0.lock() {
            *p = Some(Point2::new(x, y));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut p) = self.0.lock() {
            *p = None;
        }
    }

    pub fn get(&self) -> Option<Point2> {
        self.0.lock().ok().and_then(|p| *p)
    }
}

/// How the virtual scene camera sees the display.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedScene {
    pub camera_size: (u32, u32),
    pub display_to_camera: Homography,
}

impl SimulatedScene {
    /// The display fills about three quarters of the image width, seen from
    /// slightly left of and below center.
    pub fn new(display_size: (u32, u32)) -> Option<Self> {
        let camera_size = (1088u32, 1080u32);
        let (cw, ch) = (camera_size.0 as f64, camera_size.1 as f64);
        let (dw, dh) = (display_size.0 as f64, display_size.1 as f64);

        let width = 0.75 * cw;
        let height = width * dh / dw;
        let (x0, y0) = ((cw - width) / 2.0, (ch - height) / 2.0);
        let skew = 0.03 * width;

        let display = [
            Point2::new(0.0, 0.0),
            Point2::new(dw, 0.0),
            Point2::new(dw, dh),
            Point2::new(0.0, dh),
        ];
        let camera = [
            Point2::new(x0 + skew, y0),
            Point2::new(x0 + width, y0 + skew),
            Point2::new(x0 + width - skew, y0 + height),
            Point2::new(x0, y0 + height - skew),
        ];

        Some(Self {
            camera_size,
            display_to_camera: Homography::from_correspondences(&display, &camera)?,
        })
    }

    fn in_image(&self, p: Point2) -> bool {
        p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.camera_size.0 as f64
            && p.y < self.camera_size.1 as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedConfig {
    pub name: String,
    pub module_serial: Option<String>,
    pub scene_camera_serial: Option<String>,
    pub frame_rate_hz: f64,
    /// Uniform gaze noise, camera pixels either side.
    pub jitter_px: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            name: "Simulated Eye Tracker".into(),
            module_serial: Some("SIM-0001".into()),
            scene_camera_serial: None,
            frame_rate_hz: 30.0,
            jitter_px: 2.0,
        }
    }
}

type Pair = (SceneFrame, GazeSample);

pub struct SimulatedEyeTracker {
    config: SimulatedConfig,
    pairs: Receiver<Pair>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedEyeTracker {
    pub fn spawn(scene: SimulatedScene, cursor: GazeCursor, config: SimulatedConfig) -> Self {
        let (tx, rx) = bounded::<Pair>(2);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let period = Duration::from_secs_f64(1.0 / config.frame_rate_hz.max(1.0));
        let jitter = config.jitter_px.max(0.0);

        let worker = std::thread::spawn(move || {
            let start = Instant::now();
            let mut rng = rand::rng();
            let (w, h) = scene.camera_size;

            while !stop_flag.load(Ordering::Relaxed) {
                std::thread::sleep(period);
                let timestamp_ns = start.elapsed().as_nanos() as u64;

                let projected = cursor
                    .get()
                    .and_then(|p| scene.display_to_camera.project(p));
                let gaze = match projected {
                    Some(p) => {
                        let (dx, dy) = if jitter > 0.0 {
                            (
                                rng.random_range(-jitter..=jitter),
                                rng.random_range(-jitter..=jitter),
                            )
                        } else {
                            (0.0, 0.0)
                        };
                        GazeSample {
                            x: p.x + dx,
                            y: p.y + dy,
                            timestamp_ns,
                            worn: true,
                        }
                    }
                    None => GazeSample {
                        x: w as f64 / 2.0,
                        y: h as f64 / 2.0,
                        timestamp_ns,
                        worn: false,
                    },
                };

                let frame = SceneFrame::new(RgbImage::new(w, h), timestamp_ns);
                match tx.try_send((frame, gaze)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log::trace!("consumer behind, pair dropped"),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        });

        Self {
            config,
            pairs: rx,
            stop,
            worker: Some(worker),
        }
    }
}

impl EyeTracker for SimulatedEyeTracker {
    fn name(&self) -> String {
        self.config.name.clone()
    }

    fn module_serial(&self) -> Option<&str> {
        self.config.module_serial.as_deref()
    }

    fn scene_camera_serial(&self) -> Option<&str> {
        self.config.scene_camera_serial.as_deref()
    }

    fn receive_matched_scene_video_frame_and_gaze(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(SceneFrame, GazeSample), SessionError> {
        match timeout {
            Some(t) => self.pairs.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => SessionError::StalledStream(t),
                RecvTimeoutError::Disconnected => SessionError::DeviceDisconnected,
            }),
            None => self
                .pairs
                .recv()
                .map_err(|_| SessionError::DeviceDisconnected),
        }
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("simulated device worker panicked");
            }
        }
    }
}

impl Drop for SimulatedEyeTracker {
    fn drop(&mut self) {
        self.close();
    }
}

/// Always finds exactly one simulated device.
pub struct SimulatedDiscovery {
    scene: SimulatedScene,
    cursor: GazeCursor,
    config: SimulatedConfig,
    available: bool,
}

impl SimulatedDiscovery {
    pub fn new(scene: SimulatedScene, cursor: GazeCursor, config: SimulatedConfig) -> Self {
        Self {
            scene,
            cursor,
            config,
            available: true,
        }
    }

    /// A discovery that never finds anything.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl DeviceDiscovery for SimulatedDiscovery {
    type Device = SimulatedEyeTracker;

    fn discover_one(&mut self, _max_search_duration: Duration) -> Option<SimulatedEyeTracker> {
        self.available.then(|| {
            SimulatedEyeTracker::spawn(self.scene.clone(), self.cursor.clone(), self.config.clone())
        })
    }
}

/// Ideal pinhole intrinsics for the virtual scene camera.
pub struct SimulatedCalibration {
    pub camera_size: (u32, u32),
}

impl CameraCalibrationSource for SimulatedCalibration {
    fn camera_for_scene_cam_serial(&self, serial: &str) -> Result<CameraIntrinsics, SessionError> {
        if serial.trim().is_empty() {
            return Err(SessionError::Calibration {
                serial: serial.into(),
                reason: "empty serial".into(),
            });
        }
        let (w, h) = (self.camera_size.0 as f64, self.camera_size.1 as f64);
        Ok(CameraIntrinsics::pinhole(766.0, 766.0, w / 2.0, h / 2.0))
    }
}

/// Reports every marker whose corners all fall inside the virtual image.
#[derive(Debug, Clone)]
pub struct SimulatedDetector {
    scene: SimulatedScene,
    markers: Vec<(u32, Corners)>,
}

impl SimulatedDetector {
    pub fn new(scene: SimulatedScene, markers: &[ScreenMarker]) -> Self {
        let mut detector = Self {
            scene,
            markers: Vec::new(),
        };
        detector.set_markers(markers);
        detector
    }

    pub fn set_markers(&mut self, markers: &[ScreenMarker]) {
        self.markers = markers.iter().map(|m| (m.id, m.verts())).collect();
    }
}

impl MarkerDetector for SimulatedDetector {
    fn detect(&self, _frame: &SceneFrame) -> Vec<MarkerDetection> {
        self.markers
            .iter()
            .filter_map(|(id, corners)| {
                let mut projected = [Point2::default(); 4];
                for (out, c) in projected.iter_mut().zip(corners) {
                    *out = self.scene.display_to_camera.project(*c)?;
                }
                projected
                    .iter()
                    .all(|p| self.scene.in_image(*p))
                    .then_some(MarkerDetection {
                        id: *id,
                        corners: projected,
                        confidence: 1.0,
                    })
            })
            .collect()
    }
}
