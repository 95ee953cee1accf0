use crate::config::ExperimentConfig;
use crate::coords::surface_to_display;
use crate::trial::{Trial, randomize_stimuli};
use gazex_core::{MappedGazePoint, SessionError, SurfaceUid, TrialOutcome, TrialPhase};
use gazex_device::MatchedPairSource;
use gazex_mapping::{GazeMapper, MarkerDetector};
use gazex_timing::Timer;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    TrialStarted(usize),
    Hit {
        trial_id: usize,
        position: (f32, f32),
    },
    TrialCompleted(usize),
    Finished,
}

/// Runs the fixation trials: pull a pair, map it, hit-test it against the
/// current target, advance on a hit.
pub struct TrialController<S, D, T, R>
where
    S: MatchedPairSource,
    D: MarkerDetector,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    config: ExperimentConfig,
    source: S,
    mapper: GazeMapper<D>,
    timer: T,
    rng: R,
    surface_uid: SurfaceUid,
    display_size: (u32, u32),
    phase: TrialPhase,
    current: Option<Trial>,
    trial_number: usize,
    trial_start_ns: u64,
    frames_evaluated: usize,
    gaze_cursor: Option<(f32, f32)>,
    outcomes: Vec<TrialOutcome>,
}

impl<S, D, T, R> TrialController<S, D, T, R>
where
    S: MatchedPairSource,
    D: MarkerDetector,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    /// `surface_uid` is the surface of the display the stimuli are drawn on;
    /// gaze on any other registered surface is ignored.
    pub fn new(
        config: ExperimentConfig,
        source: S,
        mapper: GazeMapper<D>,
        surface_uid: SurfaceUid,
        display_size: (u32, u32),
        timer: T,
        rng: R,
    ) -> Self {
        Self {
            config,
            source,
            mapper,
            timer,
            rng,
            surface_uid,
            display_size,
            phase: TrialPhase::Setup,
            current: None,
            trial_number: 0,
            trial_start_ns: 0,
            frames_evaluated: 0,
            gaze_cursor: None,
            outcomes: Vec::new(),
        }
    }

    /// Sets up the next trial and opens it for fixation. Does nothing once
    /// the last trial is done.
    pub fn start(&mut self) -> Vec<TrialEvent> {
        if self.phase == TrialPhase::Done {
            return Vec::new();
        }

        self.phase = TrialPhase::Setup;
        let id = self.trial_number;
        let stimuli = randomize_stimuli(&mut self.rng, &self.config, self.display_size);
        self.current = Some(Trial::new(id, stimuli));
        self.frames_evaluated = 0;
        self.trial_start_ns = self.timer.now();

        self.phase = TrialPhase::Presenting;
        if let Some(target) = self.current.as_ref().and_then(Trial::target) {
            log::info!(
                "trial {id} presenting target at ({:.0}, {:.0})",
                target.position.0,
                target.position.1
            );
        }
        self.phase = TrialPhase::WaitingForFixation;

        vec![TrialEvent::TrialStarted(id)]
    }

    /// Hit-tests one frame's mapped points against the current target and
    /// returns the display position of the first point strictly inside it.
    /// The distance check runs in `f64`.
    /// Points on other surfaces or outside `[0,1]²` are skipped.
    pub fn evaluate(&mut self, points: &[MappedGazePoint]) -> Option<(f32, f32)> {
        let target = *self.current.as_ref()?.target()?;

        for point in points {
            if point.surface_uid != self.surface_uid || !point.is_on_surface() {
                continue;
            }
            let position = surface_to_display((point.x, point.y), self.display_size);
            let narrowed = (position.0 as f32, position.1 as f32);
            self.gaze_cursor = Some(narrowed);
            if target.contains(position) {
                return Some(narrowed);
            }
        }
        None
    }

    /// One loop iteration. While waiting for fixation this blocks on the pair
    /// source; after a hit it holds for the inter-trial interval.
    pub fn update(&mut self) -> Result<Vec<TrialEvent>, SessionError> {
        match self.phase {
            TrialPhase::Setup | TrialPhase::Presenting => Ok(self.start()),
            TrialPhase::WaitingForFixation => self.wait_for_fixation(),
            TrialPhase::Hit => Ok(self.finish_trial()),
            TrialPhase::Done => Ok(Vec::new()),
        }
    }

    /// Drives the loop until the last trial is done or the source fails.
    pub fn run(&mut self) -> Result<&[TrialOutcome], SessionError> {
        while self.phase != TrialPhase::Done {
            self.update()?;
        }
        Ok(&self.outcomes)
    }

    /// Points the controller at a new surface after the display geometry
    /// changed. The current trial keeps its stimuli.
    pub fn rebind_surface(&mut self, surface_uid: SurfaceUid, display_size: (u32, u32)) {
        log::info!(
            "rebinding to surface {surface_uid} on {}x{}",
            display_size.0,
            display_size.1
        );
        self.surface_uid = surface_uid;
        self.display_size = display_size;
        self.gaze_cursor = None;
    }

    fn wait_for_fixation(&mut self) -> Result<Vec<TrialEvent>, SessionError> {
        let (frame, gaze) = self.source.next_matched_pair()?;
        let result = self.mapper.process_frame(&frame, &gaze);
        self.frames_evaluated += 1;

        let Some(position) = self.evaluate(result.gaze_on(self.surface_uid)) else {
            return Ok(Vec::new());
        };

        // The stimuli come down as soon as the target is hit; the display
        // shows only the markers while the inter-trial interval runs.
        let Some(mut trial) = self.current.take() else {
            return Ok(Vec::new());
        };
        trial.hit = true;
        let target_position = trial.target().map(|t| t.position).unwrap_or_default();
        let time_to_hit_ns = self.timer.now().saturating_sub(self.trial_start_ns);

        log::info!(
            "trial {} hit at ({:.0}, {:.0}) after {:.1} ms, {} frames",
            trial.id,
            position.0,
            position.1,
            time_to_hit_ns as f64 / 1_000_000.0,
            self.frames_evaluated
        );
        self.outcomes.push(TrialOutcome {
            trial_id: trial.id,
            target_position,
            hit_position: position,
            time_to_hit_ns,
            frames_evaluated: self.frames_evaluated,
        });
        self.phase = TrialPhase::Hit;

        Ok(vec![TrialEvent::Hit {
            trial_id: trial.id,
            position,
        }])
    }

    fn finish_trial(&mut self) -> Vec<TrialEvent> {
        let id = self.trial_number;
        self.timer.sleep(self.config.inter_trial_interval());
        self.trial_number += 1;

        let mut events = vec![TrialEvent::TrialCompleted(id)];
        if self.trial_number >= self.config.trial_count {
            self.phase = TrialPhase::Done;
            log::info!("all {} trials done", self.trial_number);
            events.push(TrialEvent::Finished);
        } else {
            self.phase = TrialPhase::Setup;
            events.extend(self.start());
        }
        events
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TrialPhase::Done
    }

    /// The trial on screen. `None` between a hit and the next trial.
    pub fn current_trial(&self) -> Option<&Trial> {
        self.current.as_ref()
    }

    /// Last evaluated gaze position, display pixels relative to center.
    pub fn gaze_cursor(&self) -> Option<(f32, f32)> {
        self.gaze_cursor
    }

    pub fn outcomes(&self) -> &[TrialOutcome] {
        &self.outcomes
    }

    pub fn trial_progress(&self) -> (usize, usize) {
        (self.trial_number, self.config.trial_count)
    }

    pub fn surface_uid(&self) -> SurfaceUid {
        self.surface_uid
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn mapper(&self) -> &GazeMapper<D> {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut GazeMapper<D> {
        &mut self.mapper
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
