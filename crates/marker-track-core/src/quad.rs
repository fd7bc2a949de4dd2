//! Quadrilateral helpers shared by the detector and the pose estimator.

use nalgebra::Point2;

/// Signed shoelace area; positive for clockwise order in image coordinates
/// (y pointing down).
pub fn signed_area(corners: &[Point2<f64>; 4]) -> f64 {
    let mut acc = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// `true` when every turn has the same orientation and no edge is degenerate.
pub fn is_convex(corners: &[Point2<f64>; 4]) -> bool {
    let mut sign = 0.0_f64;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if !cross.is_finite() || cross.abs() < 1e-12 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

pub fn centroid(corners: &[Point2<f64>; 4]) -> Point2<f64> {
    let (sx, sy) = corners
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2::new(sx / 4.0, sy / 4.0)
}

/// Shortest edge length.
pub fn min_side(corners: &[Point2<f64>; 4]) -> f64 {
    (0..4)
        .map(|i| nalgebra::distance(&corners[i], &corners[(i + 1) % 4]))
        .fold(f64::INFINITY, f64::min)
}

/// Longest edge length.
pub fn max_side(corners: &[Point2<f64>; 4]) -> f64 {
    (0..4)
        .map(|i| nalgebra::distance(&corners[i], &corners[(i + 1) % 4]))
        .fold(0.0, f64::max)
}

/// Rotate the corner order so that `out[k] = corners[(k + shift) % 4]`.
pub fn rotate_corners<T: Copy>(corners: &[T; 4], shift: usize) -> [T; 4] {
    std::array::from_fn(|k| corners[(k + shift) % 4])
}

/// Intersection of the lines `a·x + b·y + c = 0`; `None` when parallel.
pub fn intersect_lines(l1: [f64; 3], l2: [f64; 3]) -> Option<Point2<f64>> {
    let det = l1[0] * l2[1] - l2[0] * l1[1];
    if det.abs() < 1e-12 {
        return None;
    }
    let x = (l1[1] * l2[2] - l2[1] * l1[2]) / det;
    let y = (l2[0] * l1[2] - l1[0] * l2[2]) / det;
    (x.is_finite() && y.is_finite()).then(|| Point2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn square_metrics() {
        let q = square();
        assert_relative_eq!(signed_area(&q), 100.0);
        assert!(is_convex(&q));
        assert_relative_eq!(centroid(&q), Point2::new(5.0, 5.0));
        assert_relative_eq!(min_side(&q), 10.0);
        assert_relative_eq!(max_side(&q), 10.0);

        let mut kite = q;
        kite[2] = Point2::new(30.0, 30.0);
        assert_relative_eq!(max_side(&kite), 20.0_f64.hypot(30.0));
        assert_relative_eq!(min_side(&kite), 10.0);
    }

    #[test]
    fn collinear_quad_is_not_convex() {
        let q = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        assert_relative_eq!(signed_area(&q), 0.0);
        assert!(!is_convex(&q));
    }

    #[test]
    fn bow_tie_is_not_convex() {
        let mut q = square();
        q.swap(2, 3);
        assert!(!is_convex(&q));
    }

    #[test]
    fn rotation_and_intersection() {
        let q = square();
        let r = rotate_corners(&q, 1);
        assert_eq!(r[0], q[1]);
        assert_eq!(r[3], q[0]);

        // x = 2 and y = 3
        let p = intersect_lines([1.0, 0.0, -2.0], [0.0, 1.0, -3.0]).expect("intersect");
        assert_relative_eq!(p, Point2::new(2.0, 3.0));
        assert!(intersect_lines([1.0, 0.0, 0.0], [2.0, 0.0, 1.0]).is_none());
    }
}
