use serde::{Deserialize, Serialize};

/// Trial controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Setup,
    Presenting,
    WaitingForFixation,
    Hit,
    Done,
}

/// Recorded outcome per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial_id: usize,
    pub target_position: (f32, f32),
    pub hit_position: (f32, f32),
    pub time_to_hit_ns: u64,
    pub frames_evaluated: usize,
}
