use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for session clocks
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn frame_stats(&self) -> FrameStatistics;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStatistics {
    pub frames: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl FrameStatistics {
    pub fn from_durations(frame_times: &[Duration]) -> Self {
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return Self::default();
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        FrameStatistics {
            frames: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

/// Monotonic wall clock with a sub-millisecond sleep on Linux.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }
    fn frame_stats(&self) -> FrameStatistics {
        FrameStatistics::from_durations(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // clock_nanosleep returns the error number directly; resume after signals.
        while unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) } == EINTR {
            req = rem;
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. `sleep` advances it instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    frame_times: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(d);
        }
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        self.frame_times.push(d);
    }
    fn frame_stats(&self) -> FrameStatistics {
        FrameStatistics::from_durations(&self.frame_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_over_constant_frames_have_no_jitter() {
        let stats = FrameStatistics::from_durations(&[Duration::from_millis(10); 5]);
        assert_eq!(stats.frames, 5);
        assert!((stats.average_frame_time_ns - 10_000_000.0).abs() < 1e-6);
        assert!(stats.jitter_ns.abs() < 1e-6);
        assert!((stats.effective_fps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_stats_are_zero() {
        assert_eq!(FrameStatistics::from_durations(&[]), FrameStatistics::default());
    }

    #[test]
    fn manual_timer_sleep_advances_shared_clock() {
        let timer = ManualTimer::new();
        let clone = timer.clone();
        let t0 = timer.now();
        clone.sleep(Duration::from_millis(1000));
        assert_eq!(timer.elapsed(t0), Duration::from_millis(1000));
        assert_eq!(timer.sleeps(), vec![Duration::from_millis(1000)]);
    }

    #[test]
    fn ring_buffer_drops_oldest_sample() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 2;
        for ms in [1, 2, 3] {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(
            timer.frame_times,
            vec![Duration::from_millis(2), Duration::from_millis(3)]
        );
    }

    #[test]
    fn short_sleep_returns() {
        let timer = HighPrecisionTimer::new();
        let t = timer.now();
        timer.sleep(Duration::from_micros(200));
        assert!(timer.elapsed(t) >= Duration::from_micros(200));
    }
}
