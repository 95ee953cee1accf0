use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle naming one registered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceUid(pub u64);

impl fmt::Display for SurfaceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Gaze estimate in scene-camera pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    /// Device clock, nanoseconds.
    pub timestamp_ns: u64,
    /// False when the device reports it is not being worn.
    pub worn: bool,
}

/// One scene-camera image.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    pub image: RgbImage,
    pub timestamp_ns: u64,
}

impl SceneFrame {
    pub fn new(image: RgbImage, timestamp_ns: u64) -> Self {
        Self {
            image,
            timestamp_ns,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Gaze expressed in a surface's normalized space: origin at the surface's
/// top-left, `x` rightward and `y` downward, both in [0, 1] when on-surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedGazePoint {
    pub surface_uid: SurfaceUid,
    pub x: f64,
    pub y: f64,
    pub timestamp_ns: u64,
}

impl MappedGazePoint {
    pub fn is_on_surface(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_surface_bounds_are_inclusive() {
        let p = |x, y| MappedGazePoint {
            surface_uid: SurfaceUid(1),
            x,
            y,
            timestamp_ns: 0,
        };
        assert!(p(0.0, 1.0).is_on_surface());
        assert!(p(0.5, 0.5).is_on_surface());
        assert!(!p(-0.01, 0.5).is_on_surface());
        assert!(!p(0.5, 1.0001).is_on_surface());
        assert!(!p(f64::NAN, 0.5).is_on_surface());
    }
}
