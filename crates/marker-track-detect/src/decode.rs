//! Reading the pattern area of a candidate quad.

use marker_track_camera::CameraModel;
use marker_track_core::{homography_from_4pt, sample_bilinear, GrayImageView};
use marker_track_pattern::{PatternMatch, PatternMatcher};
use nalgebra::Point2;

/// Sample a `size x size` cell grid inside the central `pattern_ratio` of the
/// quad `corners` (ideal coordinates, clockwise, `corners[0]` at the sample
/// grid origin).
///
/// Each cell averages `samples_per_cell²` bilinear samples taken at the
/// observed positions of their ideal locations. Returns `None` when any
/// sample falls outside the image.
pub fn sample_pattern(
    gray: &GrayImageView<'_>,
    camera: &CameraModel,
    corners: &[Point2<f64>; 4],
    size: usize,
    pattern_ratio: f64,
    samples_per_cell: usize,
) -> Option<Vec<f64>> {
    if size == 0 {
        return None;
    }
    let unit = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h = homography_from_4pt(&unit, corners)?;

    let ratio = pattern_ratio.clamp(0.05, 1.0);
    let lo = 0.5 * (1.0 - ratio);
    let spc = samples_per_cell.max(1);
    let step = ratio / (size * spc) as f64;
    let inv = 1.0 / (spc * spc) as f64;

    let mut out = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            let mut acc = 0.0;
            for sj in 0..spc {
                let v = lo + ((row * spc + sj) as f64 + 0.5) * step;
                for si in 0..spc {
                    let u = lo + ((col * spc + si) as f64 + 0.5) * step;
                    let ideal = h.apply(Point2::new(u, v))?;
                    let observed = camera.ideal_to_observed(ideal)?;
                    acc += sample_bilinear(gray, observed.x, observed.y)?;
                }
            }
            out.push(acc * inv);
        }
    }
    Some(out)
}

/// Sample and match; `None` when sampling fails or nothing correlates.
pub fn decode_quad(
    gray: &GrayImageView<'_>,
    camera: &CameraModel,
    corners: &[Point2<f64>; 4],
    matcher: &PatternMatcher,
    pattern_ratio: f64,
    samples_per_cell: usize,
) -> Option<PatternMatch> {
    let samples = sample_pattern(
        gray,
        camera,
        corners,
        matcher.size(),
        pattern_ratio,
        samples_per_cell,
    )?;
    matcher.match_samples(&samples)
}
