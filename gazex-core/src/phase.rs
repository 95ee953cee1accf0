/// Session lifecycle, from looking for a device to the end of the last trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Discovering,
    Connecting,
    Running,
    Finished,
    Failed,
}

impl SessionPhase {
    /// The next phase on the success path. `Finished` and `Failed` are terminal.
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Discovering => Connecting,
            Connecting => Running,
            Running => Finished,
            Finished | Failed => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Whether the screen markers should be on the display.
    pub fn shows_markers(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_ends_in_finished() {
        let mut phase = SessionPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SessionPhase::Discovering,
                SessionPhase::Connecting,
                SessionPhase::Running,
                SessionPhase::Finished,
            ]
        );
        assert!(phase.is_terminal());
        assert!(SessionPhase::Failed.next().is_none());
    }
}
