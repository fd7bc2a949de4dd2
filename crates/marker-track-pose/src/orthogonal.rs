//! Planar pose from four correspondences: homography initialisation followed
//! by the orthogonal iteration of Lu, Hager and Mjolsness (2000).

use nalgebra::{Matrix3, Vector3};

/// Orthonormal matrix closest to `m` in the Frobenius sense, forced to be a
/// proper rotation.
pub(crate) fn nearest_rotation(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let mut u = svd.u?;
    let v_t = svd.v_t?;
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    Some(u * v_t)
}

/// Recover `[R | t]` from a homography mapping marker-plane `(x, y, 1)` to
/// normalised image coordinates.
///
/// `H ~ [r1 r2 t]`; the scale comes from the geometric mean of the first two
/// column lengths and its sign puts the marker in front of the camera (+z).
pub(crate) fn pose_from_homography(h: &Matrix3<f64>) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    let c0: Vector3<f64> = h.column(0).into_owned();
    let c1: Vector3<f64> = h.column(1).into_owned();
    let c2: Vector3<f64> = h.column(2).into_owned();

    let len = (c0.norm() * c1.norm()).sqrt();
    if !len.is_finite() || len < 1e-12 {
        return None;
    }
    let s = if c2.z < 0.0 { -1.0 / len } else { 1.0 / len };

    let r0 = c0 * s;
    let r1 = c1 * s;
    let r2 = r0.cross(&r1);
    let t = c2 * s;

    let r = nearest_rotation(&Matrix3::from_columns(&[r0, r1, r2]))?;
    Some((r, t))
}

/// Result of [`orthogonal_iteration`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Refined {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    /// Object-space collinearity error.
    pub error: f64,
    pub iterations: usize,
}

/// Line-of-sight projector `v vᵀ / (vᵀ v)`.
fn projector(v: &Vector3<f64>) -> Matrix3<f64> {
    v * v.transpose() / v.norm_squared()
}

/// Minimise the object-space error `Σ |(I - F_i)(R p_i + t)|²` over proper
/// rotations, starting from `rotation`.
///
/// `rays` are image points in normalised homogeneous form `(u, v, 1)`,
/// `points` the matching marker-frame points.
pub(crate) fn orthogonal_iteration(
    rays: &[Vector3<f64>],
    points: &[Vector3<f64>],
    rotation: Matrix3<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Option<Refined> {
    let n = rays.len();
    if n < 3 || points.len() != n {
        return None;
    }
    let inv_n = 1.0 / n as f64;

    let f: Vec<Matrix3<f64>> = rays.iter().map(projector).collect();
    let avg_f = f.iter().fold(Matrix3::zeros(), |acc, fi| acc + fi) * inv_n;
    let m1_inv = (Matrix3::identity() - avg_f).try_inverse()?;

    let p_mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) * inv_n;
    let p_res: Vec<Vector3<f64>> = points.iter().map(|p| p - p_mean).collect();

    let translation_for = |r: &Matrix3<f64>| -> Vector3<f64> {
        let sum = f
            .iter()
            .zip(points)
            .fold(Vector3::zeros(), |acc, (fi, p)| {
                acc + (fi - Matrix3::identity()) * (r * p)
            });
        m1_inv * (sum * inv_n)
    };
    let error_for = |r: &Matrix3<f64>, t: &Vector3<f64>| -> f64 {
        f.iter()
            .zip(points)
            .map(|(fi, p)| ((Matrix3::identity() - fi) * (r * p + t)).norm_squared())
            .sum()
    };

    let mut r = rotation;
    let mut t = translation_for(&r);
    let mut error = error_for(&r, &t);
    let mut iterations = 0;

    while iterations < max_iterations {
        let q: Vec<Vector3<f64>> = f.iter().zip(points).map(|(fi, p)| fi * (r * p + t)).collect();
        let q_mean = q.iter().fold(Vector3::zeros(), |acc, qi| acc + qi) * inv_n;
        let m3 = q
            .iter()
            .zip(&p_res)
            .fold(Matrix3::zeros(), |acc, (qi, pi)| {
                acc + (qi - q_mean) * pi.transpose()
            });

        r = nearest_rotation(&m3)?;
        t = translation_for(&r);
        let next = error_for(&r, &t);
        iterations += 1;

        let delta = (error - next).abs();
        error = next;
        if delta < tolerance {
            break;
        }
    }

    Some(Refined {
        rotation: r,
        translation: t,
        error,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    #[test]
    fn nearest_rotation_fixes_reflections() {
        let m = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let r = nearest_rotation(&m).expect("svd");
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn homography_of_known_pose_is_inverted() {
        let r = *Rotation3::from_euler_angles(0.2, -0.3, 0.1).matrix();
        let t = Vector3::new(5.0, -8.0, 300.0);
        let h = Matrix3::from_columns(&[r.column(0).into_owned(), r.column(1).into_owned(), t]);

        for scale in [0.01, -3.0] {
            let (r2, t2) = pose_from_homography(&(h * scale)).expect("pose");
            assert_relative_eq!(r2, r, epsilon = 1e-9);
            assert_relative_eq!(t2, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn iteration_recovers_from_a_perturbed_start() {
        let r = *Rotation3::from_euler_angles(0.3, 0.25, -0.4).matrix();
        let t = Vector3::new(-12.0, 6.0, 250.0);
        let points = [
            Vector3::new(-40.0, -40.0, 0.0),
            Vector3::new(40.0, -40.0, 0.0),
            Vector3::new(40.0, 40.0, 0.0),
            Vector3::new(-40.0, 40.0, 0.0),
        ];
        let rays: Vec<Vector3<f64>> = points
            .iter()
            .map(|p| {
                let c = r * p + t;
                Vector3::new(c.x / c.z, c.y / c.z, 1.0)
            })
            .collect();

        let start = r * Rotation3::from_euler_angles(0.03, -0.02, 0.04).matrix();
        let out = orthogonal_iteration(&rays, &points, start, 500, 1e-16).expect("converges");
        assert!(out.iterations > 0);
        assert!(out.error < 1e-6, "error {}", out.error);
        assert_relative_eq!(out.rotation, r, epsilon = 1e-4);
        assert_relative_eq!(out.translation, t, epsilon = 1e-2);
    }

    #[test]
    fn too_few_points_are_rejected() {
        let rays = [Vector3::new(0.0, 0.0, 1.0); 2];
        let points = [Vector3::zeros(); 2];
        assert!(orthogonal_iteration(&rays, &points, Matrix3::identity(), 10, 1e-12).is_none());
    }
}
