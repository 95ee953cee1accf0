use serde::{Deserialize, Serialize};

/// Whether a stimulus is the fixation target or a distractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusRole {
    Target,
    Distractor,
}

/// A disc on screen. `position` is in display pixels relative to the display
/// center, `y` pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: usize,
    pub role: StimulusRole,
    pub position: (f32, f32),
    pub radius: f32,
}

impl Stimulus {
    pub fn is_target(&self) -> bool {
        self.role == StimulusRole::Target
    }

    /// Distance from the center, in `f64` so a point a hair inside the rim
    /// is not rounded onto it.
    pub fn distance_to(&self, point: (f64, f64)) -> f64 {
        let dx = point.0 - self.position.0 as f64;
        let dy = point.1 - self.position.1 as f64;
        dx.hypot(dy)
    }

    /// Strictly inside the disc; a point on the rim does not count.
    pub fn contains(&self, point: (f64, f64)) -> bool {
        self.distance_to(point) < self.radius as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rim_is_outside() {
        let s = Stimulus {
            id: 0,
            role: StimulusRole::Target,
            position: (10.0, -20.0),
            radius: 100.0,
        };
        assert!(!s.contains((110.0, -20.0)));
        assert!(s.contains((109.99, -20.0)));
        assert!(s.contains((110.0 - 1e-6, -20.0)));
        assert!(s.is_target());
    }
}
