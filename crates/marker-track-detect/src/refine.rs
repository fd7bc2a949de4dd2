//! Sub-pixel corners from least-squares edge lines in ideal coordinates.

use marker_track_camera::CameraModel;
use marker_track_core::quad::intersect_lines;
use nalgebra::Point2;

/// Principal-axis line `a·x + b·y + c = 0` (with `a² + b² = 1`) through
/// `points`.
pub fn fit_line(points: &[Point2<f64>]) -> Option<[f64; 3]> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (mx, my) = (sx / n, sy / n);

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p.x - mx, p.y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy < 1e-12 {
        return None;
    }

    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (a, b) = (-theta.sin(), theta.cos());
    let line = [a, b, -(a * mx + b * my)];
    line.iter().all(|v| v.is_finite()).then_some(line)
}

/// Corners of the quad bounded by the four contour sides.
///
/// `closed` is the closed contour and `vertices` the side boundaries from
/// vertex fitting. Each side drops `trim` of its points at both ends, maps
/// the rest to ideal coordinates and fits a line; corner `i` is the
/// intersection of sides `i - 1` and `i`.
pub fn refine_corners(
    closed: &[(i64, i64)],
    vertices: &[usize; 4],
    trim: f64,
    camera: &CameraModel,
) -> Option<[Point2<f64>; 4]> {
    let ends = [
        vertices[0],
        vertices[1],
        vertices[2],
        vertices[3],
        closed.len() - 1,
    ];
    let trim = trim.clamp(0.0, 0.45);

    let mut lines = [[0.0; 3]; 4];
    for (i, line) in lines.iter_mut().enumerate() {
        let (st, ed) = (ends[i], ends[i + 1]);
        if ed <= st {
            return None;
        }
        let n = (ed - st + 1) as f64;
        let skip = (n * trim) as usize;
        let (st, ed) = (st + skip, ed - skip);
        if ed <= st {
            return None;
        }
        let ideal: Vec<Point2<f64>> = closed[st..=ed]
            .iter()
            .map(|&(x, y)| camera.observed_to_ideal(Point2::new(x as f64, y as f64)))
            .collect::<Option<_>>()?;
        *line = fit_line(&ideal)?;
    }

    let mut corners = [Point2::origin(); 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        *corner = intersect_lines(lines[(i + 3) % 4], lines[i])?;
    }
    Some(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fits_horizontal_and_slanted_lines() {
        let pts: Vec<Point2<f64>> = (0..10).map(|i| Point2::new(i as f64, 3.0)).collect();
        let l = fit_line(&pts).expect("line");
        // y = 3
        assert_relative_eq!(l[0].abs(), 0.0, epsilon = 1e-12);
        assert_relative_eq!((l[2] / l[1]), -3.0, epsilon = 1e-12);

        let pts: Vec<Point2<f64>> = (0..10)
            .map(|i| Point2::new(i as f64, 2.0 * i as f64 + 1.0))
            .collect();
        let l = fit_line(&pts).expect("line");
        for p in &pts {
            assert!((l[0] * p.x + l[1] * p.y + l[2]).abs() < 1e-9);
        }
        assert_relative_eq!(l[0] * l[0] + l[1] * l[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_point_clouds_without_extent() {
        assert!(fit_line(&[Point2::new(1.0, 1.0)]).is_none());
        assert!(fit_line(&[Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)]).is_none());
    }
}
