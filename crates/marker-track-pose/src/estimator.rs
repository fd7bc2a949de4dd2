use marker_track_camera::{CameraIntrinsics, CameraModel};
use marker_track_core::homography_from_4pt;
use marker_track_core::quad::{is_convex, max_side, min_side, signed_area};
use nalgebra::{Point2, Vector3};

use crate::orthogonal::{orthogonal_iteration, pose_from_homography};
use crate::{Pose, PoseParams};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PoseError {
    #[error("marker width must be positive and finite, got {0}")]
    InvalidWidth(f64),
    #[error("corner quad is degenerate")]
    Degenerate,
    #[error("corner quad is not convex")]
    NonConvex,
    #[error("non-finite value in pose computation")]
    NonFinite,
    #[error("marker lies behind the camera")]
    BehindCamera,
    #[error("reprojection error {error:.3} px exceeds {max:.3} px")]
    ReprojectionError { error: f64, max: f64 },
}

/// Marker-frame corners TL, TR, BR, BL of a square of side `width`.
pub fn marker_corners(width: f64) -> [Vector3<f64>; 4] {
    let h = 0.5 * width;
    [
        Vector3::new(-h, -h, 0.0),
        Vector3::new(h, -h, 0.0),
        Vector3::new(h, h, 0.0),
        Vector3::new(-h, h, 0.0),
    ]
}

/// Square marker pose from four ideal-pixel corners.
#[derive(Clone, Debug, Default)]
pub struct PoseEstimator {
    params: PoseParams,
}

impl PoseEstimator {
    pub fn new(params: PoseParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PoseParams {
        &self.params
    }

    /// Estimate the marker-to-camera transform.
    ///
    /// `corners` are ideal (undistorted) pixels ordered TL, TR, BR, BL of the
    /// upright pattern; `width` is the marker side in calibration units.
    pub fn estimate(
        &self,
        corners: &[Point2<f64>; 4],
        camera: &CameraModel,
        width: f64,
    ) -> Result<Pose, PoseError> {
        self.estimate_with_intrinsics(corners, &camera.params().intrinsics, width)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, corners, intrinsics))
    )]
    pub fn estimate_with_intrinsics(
        &self,
        corners: &[Point2<f64>; 4],
        intrinsics: &CameraIntrinsics,
        width: f64,
    ) -> Result<Pose, PoseError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(PoseError::InvalidWidth(width));
        }
        if corners.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(PoseError::NonFinite);
        }
        if signed_area(corners).abs() < self.params.min_quad_area || self.is_sliver(corners) {
            return Err(PoseError::Degenerate);
        }
        if !is_convex(corners) {
            return Err(PoseError::NonConvex);
        }

        let k = intrinsics;
        let rays = corners.map(|c| Vector3::new((c.x - k.cx) / k.fx, (c.y - k.cy) / k.fy, 1.0));
        let object = marker_corners(width);

        let plane = object.map(|p| Point2::new(p.x, p.y));
        let image = rays.map(|r| Point2::new(r.x, r.y));
        let h = homography_from_4pt(&plane, &image).ok_or(PoseError::Degenerate)?;
        let (r0, _) = pose_from_homography(&h.h).ok_or(PoseError::Degenerate)?;

        let refined = orthogonal_iteration(
            &rays,
            &object,
            r0,
            self.params.max_iterations,
            self.params.tolerance,
        )
        .ok_or(PoseError::Degenerate)?;
        log::trace!(
            "orthogonal iteration: {} steps, object-space error {:.3e}",
            refined.iterations,
            refined.error
        );

        let (r, t) = (refined.rotation, refined.translation);
        let mut sq = 0.0;
        for (p, c) in object.iter().zip(corners) {
            let cam = r * p + t;
            if cam.z <= 0.0 {
                return Err(PoseError::BehindCamera);
            }
            let u = k.fx * cam.x / cam.z + k.cx;
            let v = k.fy * cam.y / cam.z + k.cy;
            sq += (u - c.x).powi(2) + (v - c.y).powi(2);
        }

        let pose = Pose {
            rotation: r,
            translation: t,
            error: (sq / 4.0).sqrt(),
        };
        if !pose.is_finite() {
            return Err(PoseError::NonFinite);
        }
        if let Some(max) = self.params.max_reprojection_error {
            if pose.error > max {
                return Err(PoseError::ReprojectionError {
                    error: pose.error,
                    max,
                });
            }
        }
        Ok(pose)
    }

    /// Too short a side, or a view so oblique that the quad is nearly a line.
    fn is_sliver(&self, corners: &[Point2<f64>; 4]) -> bool {
        let shortest = min_side(corners);
        shortest < self.params.min_side_length
            || shortest < self.params.min_side_ratio * max_side(corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Rotation3};

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 500.0,
            fy: 500.0,
            cx: 320.0,
            cy: 240.0,
        }
    }

    fn project(r: &Matrix3<f64>, t: &Vector3<f64>, width: f64) -> [Point2<f64>; 4] {
        let k = intrinsics();
        marker_corners(width).map(|p| {
            let c = r * p + t;
            Point2::new(k.fx * c.x / c.z + k.cx, k.fy * c.y / c.z + k.cy)
        })
    }

    #[test]
    fn frontal_marker_gives_identity_rotation() {
        let t = Vector3::new(0.0, 0.0, 400.0);
        let corners = project(&Matrix3::identity(), &t, 80.0);
        let pose = PoseEstimator::default()
            .estimate_with_intrinsics(&corners, &intrinsics(), 80.0)
            .expect("pose");
        assert_relative_eq!(pose.rotation, Matrix3::identity(), epsilon = 1e-8);
        assert_relative_eq!(pose.translation, t, epsilon = 1e-6);
        assert!(pose.error < 1e-6);
    }

    #[test]
    fn tilted_marker_is_recovered() {
        let r = *Rotation3::from_euler_angles(0.5, -0.35, 1.2).matrix();
        let t = Vector3::new(30.0, -20.0, 350.0);
        let corners = project(&r, &t, 60.0);
        let pose = PoseEstimator::default()
            .estimate_with_intrinsics(&corners, &intrinsics(), 60.0)
            .expect("pose");
        assert_relative_eq!(pose.rotation, r, epsilon = 1e-6);
        assert_relative_eq!(pose.translation, t, epsilon = 1e-4);
    }

    #[test]
    fn collapsed_quad_is_degenerate() {
        let p = Point2::new(100.0, 100.0);
        let err = PoseEstimator::default()
            .estimate_with_intrinsics(&[p; 4], &intrinsics(), 80.0)
            .unwrap_err();
        assert_eq!(err, PoseError::Degenerate);

        let thin = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 100.0),
            Point2::new(200.0, 100.004),
            Point2::new(100.0, 100.004),
        ];
        let err = PoseEstimator::default()
            .estimate_with_intrinsics(&thin, &intrinsics(), 80.0)
            .unwrap_err();
        assert_eq!(err, PoseError::Degenerate);
    }

    #[test]
    fn edge_on_sliver_is_degenerate() {
        // 100 px wide, 0.05 px tall: enough area, no usable geometry
        let sliver = [
            Point2::new(110.0, 120.0),
            Point2::new(210.0, 120.0),
            Point2::new(210.0, 120.05),
            Point2::new(110.0, 120.05),
        ];
        let est = PoseEstimator::default();
        assert!(signed_area(&sliver).abs() >= est.params().min_quad_area);
        assert_eq!(
            est.estimate_with_intrinsics(&sliver, &intrinsics(), 80.0),
            Err(PoseError::Degenerate)
        );

        // sides above the length floor but a 1:50 aspect
        let oblique = [
            Point2::new(100.0, 200.0),
            Point2::new(250.0, 200.0),
            Point2::new(250.0, 203.0),
            Point2::new(100.0, 203.0),
        ];
        assert_eq!(
            est.estimate_with_intrinsics(&oblique, &intrinsics(), 80.0),
            Err(PoseError::Degenerate)
        );
    }

    #[test]
    fn steep_but_readable_view_is_accepted() {
        let r = *Rotation3::from_euler_angles(1.2, 0.0, 0.0).matrix();
        let t = Vector3::new(0.0, 0.0, 400.0);
        let corners = project(&r, &t, 80.0);
        let pose = PoseEstimator::default()
            .estimate_with_intrinsics(&corners, &intrinsics(), 80.0)
            .expect("pose");
        assert_relative_eq!(pose.translation, t, epsilon = 1e-4);
    }

    #[test]
    fn bow_tie_is_not_convex() {
        let corners = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 200.0),
            Point2::new(200.0, 100.0),
            Point2::new(100.0, 200.0),
        ];
        let err = PoseEstimator::default()
            .estimate_with_intrinsics(&corners, &intrinsics(), 80.0)
            .unwrap_err();
        // The crossed diagonals cancel in the shoelace sum.
        assert_eq!(err, PoseError::Degenerate);

        let dart = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 100.0),
            Point2::new(130.0, 130.0),
            Point2::new(100.0, 200.0),
        ];
        let err = PoseEstimator::default()
            .estimate_with_intrinsics(&dart, &intrinsics(), 80.0)
            .unwrap_err();
        assert_eq!(err, PoseError::NonConvex);
    }

    #[test]
    fn nan_and_bad_width_are_rejected() {
        let mut corners = project(&Matrix3::identity(), &Vector3::new(0.0, 0.0, 300.0), 80.0);
        let est = PoseEstimator::default();
        assert_eq!(
            est.estimate_with_intrinsics(&corners, &intrinsics(), 0.0),
            Err(PoseError::InvalidWidth(0.0))
        );
        corners[2].x = f64::NAN;
        assert_eq!(
            est.estimate_with_intrinsics(&corners, &intrinsics(), 80.0),
            Err(PoseError::NonFinite)
        );
    }

    #[test]
    fn reprojection_limit_rejects_noisy_corners() {
        let mut corners = project(&Matrix3::identity(), &Vector3::new(0.0, 0.0, 300.0), 80.0);
        corners[1].x += 4.0;
        let strict = PoseEstimator::new(PoseParams {
            max_reprojection_error: Some(1e-3),
            ..PoseParams::default()
        });
        match strict.estimate_with_intrinsics(&corners, &intrinsics(), 80.0) {
            Err(PoseError::ReprojectionError { error, max }) => {
                assert!(error > max);
            }
            other => panic!("unexpected {other:?}"),
        }
        let lenient = PoseEstimator::default()
            .estimate_with_intrinsics(&corners, &intrinsics(), 80.0)
            .expect("pose");
        assert!(lenient.error > 1e-3 && lenient.error < 4.0);
    }
}
