pub mod timer;

pub use timer::{FrameStatistics, HighPrecisionTimer, ManualTimer, Timer};
