use serde::{Deserialize, Serialize};

/// A point in some pixel or normalized plane. Which plane is up to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// Four marker corners, wound consistently (clockwise from top-left in
/// top-left-origin pixel space).
pub type Corners = [Point2; 4];

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Shoelace area. Positive for clockwise winding in a y-down frame.
pub fn signed_area(corners: &Corners) -> f64 {
    let mut acc = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

pub fn perimeter(corners: &Corners) -> f64 {
    (0..4)
        .map(|i| corners[i].distance(corners[(i + 1) % 4]))
        .sum()
}

/// True when the quad cannot anchor a projective fit: a non-finite corner,
/// (near) zero area, or three consecutive corners on one line.
pub fn is_degenerate(corners: &Corners) -> bool {
    if corners.iter().any(|c| !c.is_finite()) {
        return true;
    }

    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let (ux, uy) = (b.x - a.x, b.y - a.y);
        let (vx, vy) = (c.x - b.x, c.y - b.y);
        let cross = ux * vy - uy * vx;
        let scale = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
        if scale <= f64::EPSILON || cross.abs() <= 1e-9 * scale {
            return true;
        }
    }

    signed_area(corners).abs() <= f64::EPSILON
}
