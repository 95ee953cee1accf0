use gazex_core::{GazeSample, SceneFrame, SessionError, TrialPhase};
use gazex_device::{CameraCalibrationSource, DeviceDiscovery, EyeTracker};
use gazex_experiment::{ExperimentConfig, GazeSession};
use gazex_mapping::{CameraIntrinsics, MarkerDetection, ScreenMarkerLayout};
use gazex_timing::ManualTimer;
use image::RgbImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const DISPLAY: (u32, u32) = (1920, 1080);
const FRAME_NS: u64 = 33_000_000;

#[derive(Clone, Copy)]
enum Ending {
    Never,
    StallAfter(usize),
    DisconnectAfter(usize),
}

/// A scene camera that sees the display head-on at 1:1 scale while the gaze
/// sweeps the display in 100 px steps, so every target is eventually hit.
struct RasterTracker {
    frame: usize,
    ending: Ending,
    module_serial: Option<String>,
    closed: Arc<AtomicBool>,
}

impl RasterTracker {
    fn gaze_position(&self) -> (f64, f64) {
        let cols = 19;
        let rows = 11;
        let cell = self.frame % (cols * rows);
        let x = 50.0 + 100.0 * (cell % cols) as f64;
        let y = 50.0 + 100.0 * (cell / cols) as f64;
        (x, y)
    }
}

impl EyeTracker for RasterTracker {
    fn name(&self) -> String {
        "raster tracker".into()
    }

    fn module_serial(&self) -> Option<&str> {
        self.module_serial.as_deref()
    }

    fn scene_camera_serial(&self) -> Option<&str> {
        None
    }

    fn receive_matched_scene_video_frame_and_gaze(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(SceneFrame, GazeSample), SessionError> {
        match self.ending {
            Ending::StallAfter(n) if self.frame >= n => {
                return Err(SessionError::StalledStream(timeout.unwrap_or_default()));
            }
            Ending::DisconnectAfter(n) if self.frame >= n => {
                return Err(SessionError::DeviceDisconnected);
            }
            _ => {}
        }

        let (x, y) = self.gaze_position();
        let timestamp_ns = self.frame as u64 * FRAME_NS;
        self.frame += 1;
        Ok((
            SceneFrame::new(RgbImage::new(2, 2), timestamp_ns),
            GazeSample {
                x,
                y,
                timestamp_ns,
                worn: true,
            },
        ))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct OneDevice {
    device: Option<RasterTracker>,
    searched: bool,
}

impl DeviceDiscovery for OneDevice {
    type Device = RasterTracker;

    fn discover_one(&mut self, _max_search_duration: Duration) -> Option<RasterTracker> {
        self.searched = true;
        self.device.take()
    }
}

struct Pinhole;

impl CameraCalibrationSource for Pinhole {
    fn camera_for_scene_cam_serial(&self, _serial: &str) -> Result<CameraIntrinsics, SessionError> {
        Ok(CameraIntrinsics::pinhole(800.0, 800.0, 960.0, 540.0))
    }
}

fn tracker(ending: Ending, serial: Option<&str>) -> (OneDevice, Arc<AtomicBool>) {
    let closed = Arc::new(AtomicBool::new(false));
    let device = RasterTracker {
        frame: 0,
        ending,
        module_serial: serial.map(str::to_owned),
        closed: Arc::clone(&closed),
    };
    (
        OneDevice {
            device: Some(device),
            searched: false,
        },
        closed,
    )
}

/// Reports the layout's markers exactly where they are drawn.
fn head_on(layout: &ScreenMarkerLayout) -> impl Fn(&SceneFrame) -> Vec<MarkerDetection> + use<> {
    let detections: Vec<MarkerDetection> = layout
        .markers()
        .iter()
        .map(|m| MarkerDetection {
            id: m.id,
            corners: m.verts(),
            confidence: 1.0,
        })
        .collect();
    move |_| detections.clone()
}

#[test]
fn ten_trials_end_in_done() {
    let (mut discovery, closed) = tracker(Ending::Never, Some("SN-1"));
    let timer = ManualTimer::new();
    let mut session = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        timer.clone(),
        StdRng::seed_from_u64(2024),
    )
    .unwrap();

    let report = session.run().unwrap();

    assert_eq!(report.outcomes.len(), 10);
    let ids: Vec<usize> = report.outcomes.iter().map(|o| o.trial_id).collect();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
    for o in &report.outcomes {
        let dx = o.hit_position.0 - o.target_position.0;
        let dy = o.hit_position.1 - o.target_position.1;
        assert!((dx * dx + dy * dy).sqrt() < 100.0);
        assert!(o.frames_evaluated >= 1);
    }
    assert_eq!(session.controller().phase(), TrialPhase::Done);
    assert_eq!(timer.sleeps(), vec![Duration::from_millis(1000); 10]);
    assert!(closed.load(Ordering::SeqCst));

    // Done is terminal.
    let events = session.controller_mut().update().unwrap();
    assert!(events.is_empty());
    assert_eq!(session.controller().phase(), TrialPhase::Done);
}

#[test]
fn inter_trial_interval_shows_no_stimuli() {
    let (mut discovery, _) = tracker(Ending::Never, Some("SN-1"));
    let timer = ManualTimer::new();
    let mut session = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        timer.clone(),
        StdRng::seed_from_u64(7),
    )
    .unwrap();

    let controller = session.controller_mut();
    for _ in 0..1000 {
        if controller.phase() == TrialPhase::Hit {
            break;
        }
        controller.update().unwrap();
    }
    assert_eq!(controller.phase(), TrialPhase::Hit);
    assert!(controller.current_trial().is_none());
    assert!(timer.sleeps().is_empty());

    // The next trial brings fresh stimuli after the hold.
    controller.update().unwrap();
    assert_eq!(timer.sleeps(), vec![Duration::from_millis(1000)]);
    assert_eq!(controller.phase(), TrialPhase::WaitingForFixation);
    assert_eq!(controller.current_trial().unwrap().stimuli.len(), 11);
    assert_eq!(controller.current_trial().unwrap().id, 1);
}

#[test]
fn missing_camera_serial_releases_device() {
    let (mut discovery, closed) = tracker(Ending::Never, None);
    let err = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(1),
    )
    .err()
    .unwrap();

    assert!(matches!(err, SessionError::MissingCameraIdentity));
    assert_eq!(err.exit_code(), 2);
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn no_device_is_not_found() {
    let mut discovery = OneDevice {
        device: None,
        searched: false,
    };
    let err = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(1),
    )
    .err()
    .unwrap();
    assert!(matches!(err, SessionError::DeviceNotFound(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn invalid_config_fails_before_discovery() {
    let (mut discovery, _) = tracker(Ending::Never, Some("SN-1"));
    let config = ExperimentConfig {
        trial_count: 0,
        ..ExperimentConfig::default()
    };
    let err = GazeSession::establish(
        config,
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(1),
    )
    .err()
    .unwrap();
    assert!(matches!(err, SessionError::Config(_)));
    assert!(!discovery.searched);
}

#[test]
fn stalled_stream_ends_the_session() {
    let (mut discovery, closed) = tracker(Ending::StallAfter(3), Some("SN-1"));
    let mut session = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(5),
    )
    .unwrap();

    let err = session.run().unwrap_err();
    assert!(matches!(err, SessionError::StalledStream(_)));
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn disconnect_mid_trial_is_fatal() {
    let (mut discovery, closed) = tracker(Ending::DisconnectAfter(1), Some("SN-1"));
    let mut session = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(5),
    )
    .unwrap();

    assert!(matches!(session.run(), Err(SessionError::DeviceDisconnected)));
    assert!(closed.load(Ordering::SeqCst));
    assert!(session.controller().outcomes().is_empty());
}

#[test]
fn resize_rebinds_to_a_fresh_surface() {
    let (mut discovery, _) = tracker(Ending::Never, Some("SN-1"));
    let mut session = GazeSession::establish(
        ExperimentConfig::default(),
        &mut discovery,
        &Pinhole,
        head_on,
        DISPLAY,
        ManualTimer::new(),
        StdRng::seed_from_u64(9),
    )
    .unwrap();
    let before = session.controller().surface_uid();

    let layout = session.resize((1280, 720)).unwrap();
    assert_eq!(layout.display_size(), (1280, 720));

    let controller = session.controller();
    assert_ne!(controller.surface_uid(), before);
    assert_eq!(controller.display_size(), (1280, 720));
    assert_eq!(controller.mapper().surfaces().len(), 1);
    assert!(controller.mapper().surface(before).is_none());
}
