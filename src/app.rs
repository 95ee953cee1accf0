use anyhow::Result;
use gazex_core::{SessionError, SessionPhase, Stimulus};
use gazex_device::{
    DeviceSession, EyeTracker, GazeCursor, SimulatedCalibration, SimulatedConfig, SimulatedDetector,
    SimulatedDiscovery, SimulatedEyeTracker, SimulatedScene,
};
use gazex_experiment::{ExperimentConfig, GazeSession, TrialEvent, log_report};
use gazex_mapping::ScreenMarker;
use gazex_render::{load_font, SceneView, SkiaRenderer};
use gazex_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

const NOTICE_HOLD: Duration = Duration::from_secs(2);

type Session = GazeSession<SimulatedEyeTracker, SimulatedDetector, HighPrecisionTimer, ThreadRng>;

enum Stage {
    Discovering,
    Connecting(DeviceSession<SimulatedEyeTracker>),
    Running(Box<Session>),
    Finished { until: Instant },
    Failed { error: SessionError, until: Instant },
}

impl Stage {
    fn phase(&self) -> SessionPhase {
        match self {
            Stage::Discovering => SessionPhase::Discovering,
            Stage::Connecting(_) => SessionPhase::Connecting,
            Stage::Running(_) => SessionPhase::Running,
            Stage::Finished { .. } => SessionPhase::Finished,
            Stage::Failed { .. } => SessionPhase::Failed,
        }
    }

    fn failed(error: SessionError) -> Self {
        log::error!("{error}");
        Stage::Failed {
            error,
            until: Instant::now() + NOTICE_HOLD,
        }
    }
}

/// Holds the simulated device's collaborators until the window exists and
/// the display size is known.
struct Devices {
    scene: SimulatedScene,
    cursor: GazeCursor,
    discovery: SimulatedDiscovery,
    calibration: SimulatedCalibration,
}

pub struct App {
    config: ExperimentConfig,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    devices: Option<Devices>,
    stage: Stage,
    frame_timer: HighPrecisionTimer,
    current_size: Option<PhysicalSize<u32>>,
    exit_code: i32,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        Ok(Self {
            config,
            window: None,
            pixels: None,
            renderer: None,
            devices: None,
            stage: Stage::Discovering,
            frame_timer: HighPrecisionTimer::new(),
            current_size: None,
            exit_code: 0,
            should_exit: false,
        })
    }

    /// Runs the event loop and returns the process exit status.
    pub fn run(mut self) -> Result<i32> {
        let event_loop = EventLoop::new()?;
        log::info!(
            "gaze-contingent experiment on {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        event_loop.run_app(&mut self)?;
        Ok(self.exit_code)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        let window_attributes = Window::default_attributes()
            .with_title("Gaze-contingent experiment")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        self.current_size = Some(size);
        log::info!(
            "display {}x{} at scale {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);

        let font = load_font(self.config.font_path.as_deref());
        self.renderer = Some(SkiaRenderer::new(
            size.width,
            size.height,
            self.config.marker_opacity,
            font,
        )?);

        let display = (size.width, size.height);
        let scene = SimulatedScene::new(display)
            .ok_or_else(|| anyhow::anyhow!("cannot model a scene camera for {display:?}"))?;
        let cursor = GazeCursor::default();
        self.devices = Some(Devices {
            discovery: SimulatedDiscovery::new(
                scene.clone(),
                cursor.clone(),
                SimulatedConfig::default(),
            ),
            calibration: SimulatedCalibration {
                camera_size: scene.camera_size,
            },
            scene,
            cursor,
        });

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let connecting;
        let (status, markers, stimuli, gaze_cursor, progress): (
            Option<&str>,
            &[ScreenMarker],
            &[Stimulus],
            Option<(f32, f32)>,
            Option<(usize, usize)>,
        ) = match &self.stage {
            Stage::Discovering => (Some("Looking for the next best device..."), &[], &[], None, None),
            Stage::Connecting(session) => {
                connecting = format!("Found {}. Connecting...", session.device().name());
                (Some(connecting.as_str()), &[], &[], None, None)
            }
            Stage::Running(session) => {
                let controller = session.controller();
                let stimuli = controller
                    .current_trial()
                    .map(|t| t.stimuli.as_slice())
                    .unwrap_or(&[]);
                let cursor = controller
                    .gaze_cursor()
                    .filter(|_| self.config.show_gaze_cursor);
                (
                    None,
                    session.layout().markers(),
                    stimuli,
                    cursor,
                    Some(controller.trial_progress()),
                )
            }
            Stage::Finished { .. } => (Some("Thank you!"), &[], &[], None, None),
            Stage::Failed { error, .. } => (Some(error.notice()), &[], &[], None, None),
        };

        let view = SceneView {
            phase: self.stage.phase(),
            status,
            markers,
            stimuli,
            gaze_cursor,
            progress,
        };

        let stats = renderer.render_frame(&view, pixels.frame_mut(), &mut self.frame_timer)?;
        let t = self.frame_timer.now();
        pixels.render()?;
        log::trace!(
            "draw {:.3}ms, copy {:.3}ms, present {:.3}ms",
            stats.draw.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            self.frame_timer.elapsed(t).as_secs_f64() * 1e3,
        );
        Ok(())
    }

    /// Moves the session one step along. Discovery, connection and each
    /// controller iteration block, so each gets its own frame and the
    /// status shown beforehand stays on screen while it runs.
    fn advance(&mut self, event_loop: &ActiveEventLoop) {
        let Some(devices) = self.devices.as_mut() else {
            return;
        };

        let mut exit = false;
        let stage = std::mem::replace(&mut self.stage, Stage::Discovering);
        self.stage = match stage {
            Stage::Discovering => {
                log::info!("Looking for the next best device...");
                match DeviceSession::discover(
                    &mut devices.discovery,
                    self.config.discovery_timeout(),
                ) {
                    Ok(session) => Stage::Connecting(session),
                    Err(e) => Stage::failed(e),
                }
            }
            Stage::Connecting(session) => {
                let display = self
                    .current_size
                    .map(|s| (s.width, s.height))
                    .unwrap_or_default();
                let scene = devices.scene.clone();
                match GazeSession::connect(
                    self.config.clone(),
                    session,
                    &devices.calibration,
                    |layout| SimulatedDetector::new(scene, layout.markers()),
                    display,
                    HighPrecisionTimer::new(),
                    rand::rng(),
                ) {
                    Ok(session) => Stage::Running(Box::new(session)),
                    Err(e) => Stage::failed(e),
                }
            }
            Stage::Running(mut session) => match session.controller_mut().update() {
                Ok(events) => {
                    let finished = events.contains(&TrialEvent::Finished);
                    for event in events {
                        log::debug!("{event:?}");
                    }
                    if finished {
                        session.close();
                        let outcomes = session.controller().outcomes().to_vec();
                        log_report(&session.report(outcomes));
                        Stage::Finished {
                            until: Instant::now() + NOTICE_HOLD,
                        }
                    } else {
                        Stage::Running(session)
                    }
                }
                Err(e) => {
                    let outcomes = session.controller().outcomes().to_vec();
                    log_report(&session.report(outcomes));
                    Stage::failed(e)
                }
            },
            Stage::Finished { until } => {
                exit = Instant::now() >= until;
                Stage::Finished { until }
            }
            Stage::Failed { error, until } => {
                if Instant::now() >= until {
                    self.exit_code = error.exit_code();
                    exit = true;
                }
                Stage::Failed { error, until }
            }
        };

        if exit {
            self.cleanup_and_exit(event_loop);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if self.current_size == Some(new_size) || new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.current_size = Some(new_size);

        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                log::warn!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                log::warn!("failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                log::warn!("failed to resize renderer: {e}");
            }
        }

        let mut failure = None;
        if let Stage::Running(session) = &mut self.stage {
            let registered = session
                .resize((new_size.width, new_size.height))
                .map(|layout| layout.markers().to_vec());
            match registered {
                Ok(markers) => session
                    .controller_mut()
                    .mapper_mut()
                    .detector_mut()
                    .set_markers(&markers),
                Err(e) => failure = Some(SessionError::from(e)),
            }
        }
        if let Some(e) = failure {
            // Dropping the running session closes the device.
            self.stage = Stage::failed(e);
        }
        log::info!("display resized to {}x{}", new_size.width, new_size.height);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Stage::Running(session) = &mut self.stage {
            log::info!("session aborted");
            session.close();
            let outcomes = session.controller().outcomes().to_vec();
            log_report(&session.report(outcomes));
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("failed to create window and surface: {e}");
                self.exit_code = 1;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    log::error!("render failed: {e}");
                }
                self.advance(event_loop);
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(devices) = &self.devices {
                    devices.cursor.set(position.x, position.y);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(devices) = &self.devices {
                    devices.cursor.clear();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                use winit::keyboard::{KeyCode, PhysicalKey};
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
