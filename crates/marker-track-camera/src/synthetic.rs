//! Synthetic scenes: a planar square marker ray-cast through a camera model.
//!
//! Used by tests, benches and the `render` CLI subcommand, so no image
//! fixtures have to be checked in.

use marker_track_core::GrayImage;
use nalgebra::{Matrix3, Point2, Vector3};

use crate::CameraModel;

/// A square marker placed in front of the camera.
///
/// The marker frame has its origin at the marker centre, `x` to the right,
/// `y` down and `z` pointing away from the printed face. The central
/// `pattern_ratio` of the square holds the `size x size` cell image; the rest
/// is a solid `border`.
#[derive(Debug, Clone)]
pub struct MarkerScene<'a> {
    pub cells: &'a [u8],
    pub size: usize,
    pub marker_width: f64,
    pub pattern_ratio: f64,
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub background: u8,
    pub border: u8,
}

impl<'a> MarkerScene<'a> {
    /// Marker facing the camera, centred on the optical axis at `distance`.
    pub fn frontal(cells: &'a [u8], size: usize, marker_width: f64, distance: f64) -> Self {
        Self {
            cells,
            size,
            marker_width,
            pattern_ratio: 0.5,
            rotation: Matrix3::identity(),
            translation: Vector3::new(0.0, 0.0, distance),
            background: 255,
            border: 0,
        }
    }

    fn shade(&self, camera: &CameraModel, observed: Point2<f64>) -> f64 {
        let Some(ideal) = camera.observed_to_ideal(observed) else {
            return self.background as f64;
        };
        let ray = camera.params().ray(ideal);
        let normal = self.rotation.column(2);
        let denom = normal.dot(&ray);
        if denom.abs() < 1e-12 {
            return self.background as f64;
        }
        let lambda = normal.dot(&self.translation) / denom;
        if lambda.is_nan() || lambda <= 0.0 {
            return self.background as f64;
        }
        let local = self.rotation.transpose() * (ray * lambda - self.translation);

        let half = 0.5 * self.marker_width;
        if local.x.abs() >= half || local.y.abs() >= half {
            return self.background as f64;
        }
        let inner = half * self.pattern_ratio;
        if local.x.abs() >= inner || local.y.abs() >= inner || self.size == 0 {
            return self.border as f64;
        }
        let cell = |v: f64| {
            let c = ((v + inner) / (2.0 * inner) * self.size as f64).floor() as usize;
            c.min(self.size - 1)
        };
        self.cells
            .get(cell(local.y) * self.size + cell(local.x))
            .copied()
            .unwrap_or(self.border) as f64
    }
}

/// Render `scene` at the camera's reference resolution with 2x2 supersampling.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
pub fn render_marker(camera: &CameraModel, scene: &MarkerScene<'_>) -> GrayImage {
    const OFFSETS: [f64; 2] = [-0.25, 0.25];
    let (w, h) = (camera.width(), camera.height());
    let mut img = GrayImage::filled(w, h, scene.background);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for dy in OFFSETS {
                for dx in OFFSETS {
                    acc += scene.shade(camera, Point2::new(x as f64 + dx, y as f64 + dy));
                }
            }
            img.set(x, y, (acc / 4.0).round().clamp(0.0, 255.0) as u8);
        }
    }
    img
}

/// Asymmetric demo cell image: white with a dark top-left quadrant, so every
/// rotation is distinguishable.
pub fn demo_cells(size: usize) -> Vec<u8> {
    let half = size / 2;
    (0..size * size)
        .map(|i| {
            let (row, col) = (i / size, i % size);
            if row < half && col < half {
                0
            } else {
                255
            }
        })
        .collect()
}
