pub mod error;
pub mod gaze;
pub mod geometry;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use error::{InvalidGeometryError, SessionError};
pub use gaze::{GazeSample, MappedGazePoint, SceneFrame, SurfaceUid};
pub use geometry::{Corners, Point2};
pub use phase::SessionPhase;
pub use stimulus::{Stimulus, StimulusRole};
pub use trial::{TrialOutcome, TrialPhase};
