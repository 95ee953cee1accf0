use crate::config::ExperimentConfig;
use crate::controller::TrialController;
use gazex_core::{InvalidGeometryError, SessionError, TrialOutcome};
use gazex_device::{
    CameraCalibrationSource, DeviceDiscovery, DeviceSession, EyeTracker, Synchronizer,
};
use gazex_mapping::{GazeMapper, MarkerDetector, ScreenMarkerLayout};
use gazex_timing::Timer;
use rand::Rng;
use serde::Serialize;

/// What a finished session hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub device: String,
    pub outcomes: Vec<TrialOutcome>,
    pub dropped_pairs: usize,
}

/// A connected device, its registered screen surface, and the trial
/// controller reading from it.
pub struct GazeSession<E, D, T, R>
where
    E: EyeTracker,
    D: MarkerDetector,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    layout: ScreenMarkerLayout,
    controller: TrialController<Synchronizer<E>, D, T, R>,
}

impl<E, D, T, R> GazeSession<E, D, T, R>
where
    E: EyeTracker,
    D: MarkerDetector,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    /// Finds a device, fetches its camera intrinsics and registers the screen
    /// surface. The device is closed on every failure path.
    #[allow(clippy::too_many_arguments)]
    pub fn establish<Q, C, F>(
        config: ExperimentConfig,
        discovery: &mut Q,
        calibration: &C,
        make_detector: F,
        display_size: (u32, u32),
        timer: T,
        rng: R,
    ) -> Result<Self, SessionError>
    where
        Q: DeviceDiscovery<Device = E>,
        C: CameraCalibrationSource,
        F: FnOnce(&ScreenMarkerLayout) -> D,
    {
        config
            .validate()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        let session = DeviceSession::discover(discovery, config.discovery_timeout())?;
        Self::connect(config, session, calibration, make_detector, display_size, timer, rng)
    }

    /// Second half of [`establish`](Self::establish), for callers that show
    /// progress between discovery and connection.
    #[allow(clippy::too_many_arguments)]
    pub fn connect<C, F>(
        config: ExperimentConfig,
        session: DeviceSession<E>,
        calibration: &C,
        make_detector: F,
        display_size: (u32, u32),
        timer: T,
        rng: R,
    ) -> Result<Self, SessionError>
    where
        C: CameraCalibrationSource,
        F: FnOnce(&ScreenMarkerLayout) -> D,
    {
        let camera = session.camera_intrinsics(calibration)?;
        let layout = ScreenMarkerLayout::new(
            config.marker_id_array(),
            config.marker_size,
            display_size,
        );
        let surface = layout.register()?;

        let mut mapper = GazeMapper::new(make_detector(&layout), camera, config.mapper_config());
        let uid = mapper.insert_surface(surface);
        let sync = Synchronizer::new(session, config.sync_config());

        Ok(Self {
            layout,
            controller: TrialController::new(config, sync, mapper, uid, display_size, timer, rng),
        })
    }

    /// Runs every trial to completion without a display. Outcomes are logged
    /// as one JSON line at the end.
    pub fn run(&mut self) -> Result<SessionReport, SessionError> {
        let result = self.controller.run().map(<[TrialOutcome]>::to_vec);
        self.controller.source_mut().close();
        let outcomes = result?;

        let report = self.report(outcomes);
        log_report(&report);
        Ok(report)
    }

    /// Re-registers the markers for a new display size and rebinds the
    /// controller to the new surface.
    pub fn resize(
        &mut self,
        display_size: (u32, u32),
    ) -> Result<&ScreenMarkerLayout, InvalidGeometryError> {
        let layout = ScreenMarkerLayout::new(
            self.controller.config().marker_id_array(),
            self.controller.config().marker_size,
            display_size,
        );
        let surface = layout.register()?;

        let old = self.controller.surface_uid();
        let mapper = self.controller.mapper_mut();
        mapper.remove_surface(old);
        let uid = mapper.insert_surface(surface);
        self.controller.rebind_surface(uid, display_size);
        self.layout = layout;
        Ok(&self.layout)
    }

    pub fn report(&self, outcomes: Vec<TrialOutcome>) -> SessionReport {
        SessionReport {
            device: self.controller.source().session().device().name(),
            outcomes,
            dropped_pairs: self.controller.source().dropped(),
        }
    }

    pub fn layout(&self) -> &ScreenMarkerLayout {
        &self.layout
    }

    pub fn controller(&self) -> &TrialController<Synchronizer<E>, D, T, R> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TrialController<Synchronizer<E>, D, T, R> {
        &mut self.controller
    }

    pub fn close(&mut self) {
        self.controller.source_mut().close();
    }
}

pub fn log_report(report: &SessionReport) {
    match serde_json::to_string(report) {
        Ok(json) => log::info!("session outcomes: {json}"),
        Err(e) => log::warn!("could not serialize session outcomes: {e}"),
    }
}
