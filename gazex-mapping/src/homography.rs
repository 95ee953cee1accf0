use gazex_core::Point2;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

/// A plane-to-plane projective transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wraps a matrix; `None` if it has non-finite entries or is singular.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Option<Self> {
        if matrix.iter().any(|v| !v.is_finite()) || matrix.determinant().abs() < 1e-12 {
            return None;
        }
        Some(Self { matrix })
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Least-squares fit of `dst ~ H * src` by the normalized direct linear
    /// transform. Needs at least four pairs, not all on one line.
    pub fn from_correspondences(src: &[Point2], dst: &[Point2]) -> Option<Self> {
        if src.len() != dst.len() || src.len() < 4 {
            return None;
        }
        if src.iter().chain(dst).any(|p| !p.is_finite()) {
            return None;
        }

        let (t_src, src_n) = normalize(src)?;
        let (t_dst, dst_n) = normalize(dst)?;

        let mut ata = SMatrix::<f64, 9, 9>::zeros();
        for (s, d) in src_n.iter().zip(&dst_n) {
            let rows = [
                SVector::<f64, 9>::from_row_slice(&[
                    -s.x,
                    -s.y,
                    -1.0,
                    0.0,
                    0.0,
                    0.0,
                    d.x * s.x,
                    d.x * s.y,
                    d.x,
                ]),
                SVector::<f64, 9>::from_row_slice(&[
                    0.0,
                    0.0,
                    0.0,
                    -s.x,
                    -s.y,
                    -1.0,
                    d.y * s.x,
                    d.y * s.y,
                    d.y,
                ]),
            ];
            for r in rows {
                ata += r * r.transpose();
            }
        }

        // The solution is the eigenvector of AᵀA with the smallest eigenvalue.
        let eig = ata.symmetric_eigen();
        let (min_idx, _) = eig
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;

        // A second (near) zero eigenvalue means the points do not pin down H.
        let mut sorted: Vec<f64> = eig.eigenvalues.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        if sorted[1] <= 1e-10 * sorted[8].max(f64::MIN_POSITIVE) {
            return None;
        }

        let h = eig.eigenvectors.column(min_idx);
        let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

        let t_dst_inv = t_dst.try_inverse()?;
        let mut matrix = t_dst_inv * hn * t_src;
        let scale = matrix[(2, 2)];
        if scale.abs() > 1e-12 {
            matrix /= scale;
        } else {
            matrix /= matrix.norm();
        }

        Self::from_matrix(matrix)
    }

    /// Maps a point; `None` when it lands on the line at infinity.
    pub fn project(&self, p: Point2) -> Option<Point2> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < 1e-12 {
            return None;
        }
        let out = Point2::new(v.x / v.z, v.y / v.z);
        out.is_finite().then_some(out)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().and_then(Self::from_matrix)
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Homography) -> Option<Self> {
        Self::from_matrix(self.matrix * first.matrix)
    }
}

/// Translates the centroid to the origin and scales the mean distance to √2.
fn normalize(points: &[Point2]) -> Option<(Matrix3<f64>, Vec<Point2>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((t, normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point2, b: Point2, tol: f64) -> bool {
        (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol
    }

    fn keystone() -> Homography {
        Homography::from_matrix(Matrix3::new(
            0.8, 0.05, 120.0, -0.02, 0.75, 90.0, 0.0001, -0.00005, 1.0,
        ))
        .unwrap()
    }

    #[test]
    fn recovers_known_transform() {
        let truth = keystone();
        let src: Vec<Point2> = [
            (0.0, 0.0),
            (1920.0, 0.0),
            (1920.0, 1080.0),
            (0.0, 1080.0),
            (960.0, 540.0),
            (300.0, 700.0),
        ]
        .into_iter()
        .map(Point2::from)
        .collect();
        let dst: Vec<Point2> = src.iter().map(|p| truth.project(*p).unwrap()).collect();

        let fitted = Homography::from_correspondences(&src, &dst).expect("fit");
        for (s, d) in src.iter().zip(&dst) {
            assert!(close(fitted.project(*s).unwrap(), *d, 1e-4));
        }
    }

    #[test]
    fn inverse_round_trips() {
        let h = keystone();
        let inv = h.inverse().expect("invertible");
        let p = Point2::new(812.5, 333.25);
        let back = inv.project(h.project(p).unwrap()).unwrap();
        assert!(close(back, p, 1e-6));

        let id = inv.compose(&h).unwrap();
        assert!(close(id.project(p).unwrap(), p, 1e-6));
    }

    #[test]
    fn too_few_or_collinear_points_do_not_fit() {
        let three: Vec<Point2> = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]
            .into_iter()
            .map(Point2::from)
            .collect();
        assert!(Homography::from_correspondences(&three, &three).is_none());

        let line: Vec<Point2> = (0..6).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(Homography::from_correspondences(&line, &line).is_none());
    }

    #[test]
    fn singular_matrix_is_rejected() {
        assert!(Homography::from_matrix(Matrix3::zeros()).is_none());
        assert!(Homography::identity().inverse().is_some());
    }
}
