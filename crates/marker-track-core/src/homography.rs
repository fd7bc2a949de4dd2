use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Map a point; `None` when it lands on the line at infinity.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w.abs() < 1e-15 {
            return None;
        }
        Some(Point2::new(v[0] / w, v[1] / w))
    }
}

/// Hartley conditioning: move the centroid to the origin and scale so the
/// mean distance from it is `sqrt(2)`.
fn condition(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let c = pts.iter().fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0)) / n;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x - c.x).hypot(p.y - c.y))
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - c.x), s * (p.y - c.y)))
        .collect();
    (out, t)
}

/// Undo the conditioning and fix the scale so that `h33 = 1`.
fn uncondition(hn: Matrix3<f64>, t_src: &Matrix3<f64>, t_dst: &Matrix3<f64>) -> Option<Homography> {
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / s))
}

/// Compute H such that `dst ~ H * src` from four correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// when three of the points are (nearly) collinear.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let (s, t_src) = condition(src);
    let (d, t_dst) = condition(dst);

    // eight unknowns h11..h32 with h33 fixed to 1
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (p, q)) in s.iter().zip(&d).enumerate() {
        let rows = [
            ([p.x, p.y, 1.0, 0.0, 0.0, 0.0, -q.x * p.x, -q.x * p.y], q.x),
            ([0.0, 0.0, 0.0, p.x, p.y, 1.0, -q.y * p.x, -q.y * p.y], q.y),
        ];
        for (i, (coeffs, rhs)) in rows.into_iter().enumerate() {
            let r = 2 * k + i;
            for (j, c) in coeffs.into_iter().enumerate() {
                a[(r, j)] = c;
            }
            b[r] = rhs;
        }
    }

    let lu = a.lu();
    if lu.determinant().abs() < 1e-12 {
        return None;
    }
    let x = lu.solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);
    uncondition(hn, &t_src, &t_dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tilted marker seen by a camera: unit square to image pixels.
    fn perspective() -> Homography {
        Homography::new(Matrix3::new(
            95.0, 12.0, 210.0, //
            -6.0, 88.0, 140.0, //
            0.08, -0.05, 1.0,
        ))
    }

    fn unit_square() -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn unit_square_to_quad_matches_cell_centres() {
        let h = perspective();
        let quad = unit_square().map(|p| h.apply(p).expect("finite"));
        let fitted = homography_from_4pt(&unit_square(), &quad).expect("fit");
        for i in 0..4 {
            for j in 0..4 {
                let cell = Point2::new((i as f64 + 0.5) / 4.0, (j as f64 + 0.5) / 4.0);
                let want = h.apply(cell).expect("finite");
                let got = fitted.apply(cell).expect("finite");
                assert!((got - want).norm() < 1e-8, "{got:?} vs {want:?}");
            }
        }
    }

    #[test]
    fn collapsed_quads_have_no_homography() {
        let line = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        assert!(homography_from_4pt(&unit_square(), &line).is_none());
        assert!(homography_from_4pt(&line, &unit_square()).is_none());
    }
}
