use gazex_core::Point2;
use serde::{Deserialize, Serialize};

const UNDISTORT_ITERATIONS: usize = 20;

/// Scene camera intrinsics: pinhole matrix plus lens distortion coefficients
/// `k1 k2 p1 p2 k3 k4 k5 k6` (missing trailing terms are zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub camera_matrix: [[f64; 3]; 3],
    pub distortion: Vec<f64>,
}

impl CameraIntrinsics {
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            camera_matrix: [[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]],
            distortion: Vec::new(),
        }
    }

    pub fn with_distortion(mut self, coefficients: &[f64]) -> Self {
        self.distortion = coefficients.to_vec();
        self
    }

    fn coefficient(&self, i: usize) -> f64 {
        self.distortion.get(i).copied().unwrap_or(0.0)
    }

    fn is_distortion_free(&self) -> bool {
        self.distortion.iter().all(|k| *k == 0.0)
    }

    /// Forward lens model on a pixel that was projected by an ideal pinhole.
    pub fn distort_point(&self, p: Point2) -> Point2 {
        if self.is_distortion_free() {
            return p;
        }
        let (fx, fy, cx, cy) = self.focal_and_center();
        let (x, y) = ((p.x - cx) / fx, (p.y - cy) / fy);
        let (xd, yd) = self.apply(x, y);
        Point2::new(xd * fx + cx, yd * fy + cy)
    }

    /// Inverse of [`distort_point`](Self::distort_point), by fixed-point
    /// iteration in normalized coordinates. The result stays in pixels.
    pub fn undistort_point(&self, p: Point2) -> Point2 {
        if self.is_distortion_free() {
            return p;
        }
        let (fx, fy, cx, cy) = self.focal_and_center();
        let (x0, y0) = ((p.x - cx) / fx, (p.y - cy) / fy);
        let (k1, k2, p1, p2, k3) = (
            self.coefficient(0),
            self.coefficient(1),
            self.coefficient(2),
            self.coefficient(3),
            self.coefficient(4),
        );
        let (k4, k5, k6) = (self.coefficient(5), self.coefficient(6), self.coefficient(7));

        let (mut x, mut y) = (x0, y0);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2)
                / (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2);
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (x0 - dx) * icdist;
            y = (y0 - dy) * icdist;
        }

        Point2::new(x * fx + cx, y * fy + cy)
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (k1, k2, p1, p2, k3) = (
            self.coefficient(0),
            self.coefficient(1),
            self.coefficient(2),
            self.coefficient(3),
            self.coefficient(4),
        );
        let (k4, k5, k6) = (self.coefficient(5), self.coefficient(6), self.coefficient(7));
        let r2 = x * x + y * y;
        let radial =
            (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2) / (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2);
        (
            x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
            y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }

    fn focal_and_center(&self) -> (f64, f64, f64, f64) {
        let k = &self.camera_matrix;
        (k[0][0], k[1][1], k[0][2], k[1][2])
    }
}
