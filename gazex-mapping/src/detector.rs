use gazex_core::{Corners, SceneFrame};

/// A marker localized in a scene camera image, corners in camera pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetection {
    pub id: u32,
    pub corners: Corners,
    pub confidence: f32,
}

/// Finds fiducial markers in a frame. Detection itself is a vision concern
/// outside this crate; implementors may return low-confidence or degenerate
/// hits, the mapper filters them.
pub trait MarkerDetector {
    fn detect(&self, frame: &SceneFrame) -> Vec<MarkerDetection>;
}

impl<F> MarkerDetector for F
where
    F: Fn(&SceneFrame) -> Vec<MarkerDetection>,
{
    fn detect(&self, frame: &SceneFrame) -> Vec<MarkerDetection> {
        self(frame)
    }
}
