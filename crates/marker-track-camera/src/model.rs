use nalgebra::{Point2, Point3};

use crate::{CalibrationError, CameraParams, UndistortLut};

/// Calibrated camera: parameters plus the lookup tables derived from them.
///
/// The tables always match the current parameters; [`CameraModel::resize_to`]
/// rebuilds them together with the rescaled intrinsics.
#[derive(Debug, Clone)]
pub struct CameraModel {
    params: CameraParams,
    lut: UndistortLut,
    resize_count: u32,
}

impl CameraModel {
    pub fn new(params: CameraParams, lut_offset: usize) -> Result<Self, CalibrationError> {
        params.validate()?;
        let lut = UndistortLut::build(&params, lut_offset);
        Ok(Self {
            params,
            lut,
            resize_count: 0,
        })
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn width(&self) -> usize {
        self.params.width
    }

    pub fn height(&self) -> usize {
        self.params.height
    }

    pub fn lut_offset(&self) -> usize {
        self.lut.offset()
    }

    /// How many times [`CameraModel::resize_to`] actually changed the resolution.
    pub fn resize_count(&self) -> u32 {
        self.resize_count
    }

    /// Rescale to a new reference resolution and rebuild the tables.
    ///
    /// Returns `Ok(false)` without touching anything when the model already
    /// has that resolution.
    pub fn resize_to(&mut self, width: usize, height: usize) -> Result<bool, CalibrationError> {
        if (width, height) == (self.params.width, self.params.height) {
            return Ok(false);
        }
        let resized = self.params.resized(width, height);
        resized.validate()?;
        log::warn!(
            "camera parameters resized from {}x{} to {}x{}",
            self.params.width,
            self.params.height,
            width,
            height
        );
        self.lut = UndistortLut::build(&resized, self.lut.offset());
        self.params = resized;
        self.resize_count += 1;
        Ok(true)
    }

    /// Observed (distorted) pixel to ideal pixel.
    #[inline]
    pub fn observed_to_ideal(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.lut
            .observed_to_ideal(p)
            .or_else(|| self.params.undistort_observed(p))
    }

    /// Ideal pixel to observed (distorted) pixel.
    #[inline]
    pub fn ideal_to_observed(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.lut
            .ideal_to_observed(p)
            .or_else(|| self.params.distort_ideal(p))
    }

    pub fn distort_ideal(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.params.distort_ideal(p)
    }

    pub fn undistort_observed(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.params.undistort_observed(p)
    }

    /// Project a camera-frame point to ideal pixels.
    pub fn project(&self, point: &Point3<f64>) -> Option<Point2<f64>> {
        self.params.project(point)
    }
}
