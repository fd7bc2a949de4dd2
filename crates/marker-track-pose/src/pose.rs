use nalgebra::{Matrix3, Matrix3x4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform from the marker frame into the camera frame.
///
/// The marker frame is centred on the square with x to the right, y down
/// and z into the marker; the camera looks along +z.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Matrix3<f64>,
    /// Marker centre in camera coordinates, in calibration units.
    pub translation: Vector3<f64>,
    /// RMS reprojection error of the four corners, in ideal pixels.
    pub error: f64,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
            error: 0.0,
        }
    }

    /// `[R | t]` as a 3x4 matrix.
    pub fn to_matrix3x4(&self) -> Matrix3x4<f64> {
        let mut m = Matrix3x4::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.set_column(3, &self.translation);
        m
    }

    /// Same pose with the translation multiplied by `factor`
    /// (e.g. `0.001` for millimetres to metres).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            translation: self.translation * factor,
            ..*self
        }
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_matrix(&self.rotation)
    }

    /// Map a marker-frame point into the camera frame.
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
            && self.error.is_finite()
    }
}
