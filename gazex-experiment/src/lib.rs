pub mod config;
pub mod controller;
pub mod coords;
pub mod session;
pub mod trial;

pub use config::{ConfigError, ExperimentConfig};
pub use controller::{TrialController, TrialEvent};
pub use coords::{display_to_surface, surface_to_display};
pub use session::{GazeSession, SessionReport, log_report};
pub use trial::{Trial, randomize_stimuli};
