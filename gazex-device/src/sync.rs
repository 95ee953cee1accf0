use crate::device::EyeTracker;
use crate::session::DeviceSession;
use gazex_core::{GazeSample, SceneFrame, SessionError};
use std::time::{Duration, Instant};

/// Something that hands out matched (frame, gaze) pairs in timestamp order.
pub trait MatchedPairSource {
    fn next_matched_pair(&mut self) -> Result<(SceneFrame, GazeSample), SessionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Longest wait for a usable pair before the stream counts as stalled.
    /// `None` blocks indefinitely.
    pub stall_timeout: Option<Duration>,
    /// Pairs whose frame and gaze timestamps differ by more are dropped.
    pub max_pair_skew: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stall_timeout: Some(Duration::from_secs(5)),
            max_pair_skew: Some(Duration::from_millis(50)),
        }
    }
}

/// Pulls pairs from the device session, enforcing non-decreasing timestamps
/// and frame/gaze consistency. Dropped pairs are retried by pulling again.
pub struct Synchronizer<D: EyeTracker> {
    session: DeviceSession<D>,
    config: SyncConfig,
    last_timestamp_ns: Option<u64>,
    dropped: usize,
}

impl<D: EyeTracker> Synchronizer<D> {
    pub fn new(session: DeviceSession<D>, config: SyncConfig) -> Self {
        Self {
            session,
            config,
            last_timestamp_ns: None,
            dropped: 0,
        }
    }

    pub fn session(&self) -> &DeviceSession<D> {
        &self.session
    }

    /// Pairs discarded so far as out of order or inconsistent.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    fn accept(&mut self, frame: &SceneFrame, gaze: &GazeSample) -> bool {
        if let Some(last) = self.last_timestamp_ns {
            if frame.timestamp_ns < last {
                log::debug!(
                    "dropping out-of-order pair at {} ns (last {} ns)",
                    frame.timestamp_ns,
                    last
                );
                return false;
            }
        }

        if let Some(max_skew) = self.config.max_pair_skew {
            let skew = frame.timestamp_ns.abs_diff(gaze.timestamp_ns);
            if skew > max_skew.as_nanos() as u64 {
                log::debug!("dropping pair with {skew} ns frame/gaze skew");
                return false;
            }
        }

        true
    }
}

impl<D: EyeTracker> MatchedPairSource for Synchronizer<D> {
    fn next_matched_pair(&mut self) -> Result<(SceneFrame, GazeSample), SessionError> {
        let deadline = self.config.stall_timeout.map(|t| (t, Instant::now() + t));

        loop {
            let wait = match deadline {
                Some((limit, at)) => {
                    let remaining = at.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(SessionError::StalledStream(limit));
                    }
                    Some(remaining)
                }
                None => None,
            };

            let (frame, gaze) = match self.session.receive(wait) {
                Err(SessionError::StalledStream(_)) => {
                    let limit = self.config.stall_timeout.unwrap_or_default();
                    return Err(SessionError::StalledStream(limit));
                }
                other => other?,
            };

            if self.accept(&frame, &gaze) {
                self.last_timestamp_ns = Some(frame.timestamp_ns);
                return Ok((frame, gaze));
            }
            self.dropped += 1;
        }
    }
}
