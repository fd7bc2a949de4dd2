//! Calibration parameters: pinhole intrinsics plus a radial-tangential
//! distortion model, tied to the resolution they were calibrated at.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// Fixed-point iterations used to invert the distortion model.
pub const UNDISTORT_MAX_ITERS: usize = 15;
/// Convergence threshold (normalized units) for the distortion inversion.
pub const UNDISTORT_EPS: f64 = 1e-12;

/// Pinhole camera intrinsics, in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Returns `true` when every value is finite and focal lengths are non-zero.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx.abs() > 1e-9
            && self.fy.abs() > 1e-9
    }
}

/// Brown-Conrady distortion with an extra normalisation `scale`.
///
/// Normalized coordinates are `(p - c) * scale / f`, so `scale = 1` is the
/// textbook model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub scale: f64,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            k1: 0.0,
            k2: 0.0,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
            scale: 1.0,
        }
    }
}

impl Distortion {
    pub fn is_valid(&self) -> bool {
        [self.k1, self.k2, self.p1, self.p2, self.k3, self.scale]
            .iter()
            .all(|v| v.is_finite())
            && self.scale > 0.0
    }

    #[inline]
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (x * radial + dx, y * radial + dy)
    }
}

/// Everything a calibration file describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraParams {
    /// Reference resolution the intrinsics belong to.
    pub width: usize,
    pub height: usize,
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraParams {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.width == 0 || self.height == 0 {
            return Err(CalibrationError::Invalid(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.intrinsics.is_valid() {
            return Err(CalibrationError::Invalid(format!(
                "degenerate intrinsics {:?}",
                self.intrinsics
            )));
        }
        if !self.distortion.is_valid() {
            return Err(CalibrationError::Invalid(format!(
                "invalid distortion {:?}",
                self.distortion
            )));
        }
        Ok(())
    }

    /// Parameters rescaled to another resolution. Distortion is unchanged.
    pub fn resized(&self, width: usize, height: usize) -> Self {
        let sx = width as f64 / self.width as f64;
        let sy = height as f64 / self.height as f64;
        let k = self.intrinsics;
        Self {
            width,
            height,
            intrinsics: CameraIntrinsics {
                fx: k.fx * sx,
                fy: k.fy * sy,
                cx: k.cx * sx,
                cy: k.cy * sy,
            },
            distortion: self.distortion,
        }
    }

    #[inline]
    fn normalize(&self, p: Point2<f64>) -> (f64, f64) {
        let k = &self.intrinsics;
        let s = self.distortion.scale;
        ((p.x - k.cx) * s / k.fx, (p.y - k.cy) * s / k.fy)
    }

    #[inline]
    fn denormalize(&self, x: f64, y: f64) -> Point2<f64> {
        let k = &self.intrinsics;
        let s = self.distortion.scale;
        Point2::new(x * k.fx / s + k.cx, y * k.fy / s + k.cy)
    }

    /// Ideal (undistorted) pixel to observed (distorted) pixel.
    pub fn distort_ideal(&self, ideal: Point2<f64>) -> Option<Point2<f64>> {
        let (x, y) = self.normalize(ideal);
        let (xd, yd) = self.distortion.apply(x, y);
        let out = self.denormalize(xd, yd);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    /// Observed pixel to ideal pixel by fixed-point inversion of the model.
    pub fn undistort_observed(&self, observed: Point2<f64>) -> Option<Point2<f64>> {
        let (xd, yd) = self.normalize(observed);
        let d = &self.distortion;
        let (mut x, mut y) = (xd, yd);

        for _ in 0..UNDISTORT_MAX_ITERS {
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (d.k1 + r2 * (d.k2 + r2 * d.k3));
            if !radial.is_finite() || radial.abs() < 1e-12 {
                return None;
            }
            let dx = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
            let dy = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
            let nx = (xd - dx) / radial;
            let ny = (yd - dy) / radial;
            if !nx.is_finite() || !ny.is_finite() {
                return None;
            }
            let step = (nx - x).hypot(ny - y);
            x = nx;
            y = ny;
            if step <= UNDISTORT_EPS {
                break;
            }
        }

        Some(self.denormalize(x, y))
    }

    /// Pinhole projection of a camera-frame point to ideal pixels.
    pub fn project(&self, point: &nalgebra::Point3<f64>) -> Option<Point2<f64>> {
        if point.z <= 0.0 || !point.z.is_finite() {
            return None;
        }
        let k = &self.intrinsics;
        let u = k.fx * point.x / point.z + k.cx;
        let v = k.fy * point.y / point.z + k.cy;
        (u.is_finite() && v.is_finite()).then(|| Point2::new(u, v))
    }

    /// Ideal pixel to a normalized viewing ray with `z = 1`.
    pub fn ray(&self, ideal: Point2<f64>) -> nalgebra::Vector3<f64> {
        let k = &self.intrinsics;
        nalgebra::Vector3::new((ideal.x - k.cx) / k.fx, (ideal.y - k.cy) / k.fy, 1.0)
    }
}
