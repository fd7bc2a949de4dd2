//! Precomputed distortion lookup tables.
//!
//! Both directions of the distortion model are tabulated on the integer pixel
//! grid, padded by `offset` pixels on every side so that corners sitting just
//! outside the image can still be mapped. Lookups interpolate bilinearly.

use nalgebra::Point2;

use crate::CameraParams;

/// Padding used when none is configured.
pub const DEFAULT_LUT_OFFSET: usize = 15;

#[derive(Debug, Clone)]
pub struct UndistortLut {
    offset: usize,
    cols: usize,
    rows: usize,
    observed_to_ideal: Vec<[f32; 2]>,
    ideal_to_observed: Vec<[f32; 2]>,
}

impl UndistortLut {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(params), fields(width = params.width, height = params.height))
    )]
    pub fn build(params: &CameraParams, offset: usize) -> Self {
        let cols = params.width + 2 * offset;
        let rows = params.height + 2 * offset;
        let mut observed_to_ideal = Vec::with_capacity(cols * rows);
        let mut ideal_to_observed = Vec::with_capacity(cols * rows);

        for j in 0..rows {
            let y = j as f64 - offset as f64;
            for i in 0..cols {
                let p = Point2::new(i as f64 - offset as f64, y);
                observed_to_ideal.push(pack(params.undistort_observed(p)));
                ideal_to_observed.push(pack(params.distort_ideal(p)));
            }
        }

        Self {
            offset,
            cols,
            rows,
            observed_to_ideal,
            ideal_to_observed,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Interpolated undistortion; `None` outside the table.
    pub fn observed_to_ideal(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.lookup(&self.observed_to_ideal, p)
    }

    /// Interpolated distortion; `None` outside the table.
    pub fn ideal_to_observed(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.lookup(&self.ideal_to_observed, p)
    }

    fn lookup(&self, table: &[[f32; 2]], p: Point2<f64>) -> Option<Point2<f64>> {
        let gx = p.x + self.offset as f64;
        let gy = p.y + self.offset as f64;
        // the 2x2 neighbourhood must fit; checked in f64 before casting
        let inside = |g: f64, n: usize| g.is_finite() && g >= 0.0 && g + 1.0 < n as f64;
        if !inside(gx, self.cols) || !inside(gy, self.rows) {
            return None;
        }
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let fx = gx - x0 as f64;
        let fy = gy - y0 as f64;

        let idx = y0 * self.cols + x0;
        let corners = [
            table[idx],
            table[idx + 1],
            table[idx + self.cols],
            table[idx + self.cols + 1],
        ];
        if corners.iter().any(|c| !c[0].is_finite() || !c[1].is_finite()) {
            return None;
        }

        let lerp = |k: usize| {
            let top = corners[0][k] as f64 * (1.0 - fx) + corners[1][k] as f64 * fx;
            let bottom = corners[2][k] as f64 * (1.0 - fx) + corners[3][k] as f64 * fx;
            top * (1.0 - fy) + bottom * fy
        };
        Some(Point2::new(lerp(0), lerp(1)))
    }
}

fn pack(p: Option<Point2<f64>>) -> [f32; 2] {
    match p {
        Some(p) => [p.x as f32, p.y as f32],
        None => [f32::NAN, f32::NAN],
    }
}
