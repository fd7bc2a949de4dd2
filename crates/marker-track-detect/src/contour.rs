//! Outer boundary tracing and square vertex fitting.

use crate::label::{Labeling, Region};

/// 8-neighbourhood, clockwise (image y points down) starting north.
const DIRS: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Trace the outer boundary of `region` clockwise with Moore neighbour
/// tracing. The start pixel is not repeated at the end.
///
/// Returns `None` for isolated pixels or a runaway trace.
pub fn trace_contour(labeling: &Labeling, region: &Region) -> Option<Vec<(i64, i64)>> {
    let (sx, sy) = (region.start.0 as i64, region.start.1 as i64);
    let label = region.label;
    let max_len = 4 * region.area + 8;

    let mut contour = vec![(sx, sy)];
    let (mut x, mut y) = (sx, sy);
    // first search direction is east
    let mut dir = 5usize;
    loop {
        dir = (dir + 5) % 8;
        let mut found = false;
        for _ in 0..8 {
            let (dx, dy) = DIRS[dir];
            if labeling.label_at(x + dx, y + dy) == label {
                found = true;
                break;
            }
            dir = (dir + 1) % 8;
        }
        if !found {
            return None;
        }
        x += DIRS[dir].0;
        y += DIRS[dir].1;
        if (x, y) == (sx, sy) {
            break;
        }
        contour.push((x, y));
        if contour.len() > max_len {
            return None;
        }
    }
    Some(contour)
}

/// Indices of four vertices on a closed contour.
///
/// The contour is first rotated so its first point is the one farthest from
/// the trace start; the result holds the rotated, closed contour (first point
/// repeated at the end) and the vertex indices into it.
pub fn fit_quad(contour: &[(i64, i64)], area: usize, fit_thresh: f64) -> Option<(Vec<(i64, i64)>, [usize; 4])> {
    if contour.len() < 4 {
        return None;
    }
    let far = farthest_from(contour, 0, 1, contour.len())?;
    let mut closed: Vec<(i64, i64)> = contour[far..]
        .iter()
        .chain(contour[..far].iter())
        .copied()
        .collect();
    closed.push(closed[0]);

    let last = closed.len() - 1;
    let thresh = (area as f64 / 0.75) * 0.01 * fit_thresh;
    let v1 = farthest_from(&closed, 0, 1, last)?;

    let mut wv1 = Vec::new();
    let mut wv2 = Vec::new();
    split_side(&closed, 0, v1, thresh, &mut wv1)?;
    split_side(&closed, v1, last, thresh, &mut wv2)?;

    let vertices = match (wv1.len(), wv2.len()) {
        (1, 1) => [0, wv1[0], v1, wv2[0]],
        (n, 0) if n > 1 => {
            let v2 = v1 / 2;
            let (mut a, mut b) = (Vec::new(), Vec::new());
            split_side(&closed, 0, v2, thresh, &mut a)?;
            split_side(&closed, v2, v1, thresh, &mut b)?;
            if a.len() != 1 || b.len() != 1 {
                return None;
            }
            [0, a[0], b[0], v1]
        }
        (0, n) if n > 1 => {
            let v2 = (v1 + last) / 2;
            let (mut a, mut b) = (Vec::new(), Vec::new());
            split_side(&closed, v1, v2, thresh, &mut a)?;
            split_side(&closed, v2, last, thresh, &mut b)?;
            if a.len() != 1 || b.len() != 1 {
                return None;
            }
            [0, v1, a[0], b[0]]
        }
        _ => return None,
    };
    Some((closed, vertices))
}

fn farthest_from(points: &[(i64, i64)], origin: usize, from: usize, to: usize) -> Option<usize> {
    let (ox, oy) = points[origin];
    (from..to)
        .map(|i| {
            let (x, y) = points[i];
            (i, (x - ox).pow(2) + (y - oy).pow(2))
        })
        .fold(None, |best: Option<(usize, i64)>, (i, d)| match best {
            Some((_, bd)) if bd >= d => best,
            _ => Some((i, d)),
        })
        .filter(|&(_, d)| d > 0)
        .map(|(i, _)| i)
}

/// Recursively collect contour points between `st` and `ed` whose squared
/// distance to the chord exceeds `thresh`. Fails when more than five are found.
fn split_side(
    pts: &[(i64, i64)],
    st: usize,
    ed: usize,
    thresh: f64,
    out: &mut Vec<usize>,
) -> Option<()> {
    let (xs, ys) = (pts[st].0 as f64, pts[st].1 as f64);
    let (xe, ye) = (pts[ed].0 as f64, pts[ed].1 as f64);
    let a = ye - ys;
    let b = xs - xe;
    let c = xe * ys - ye * xs;

    let mut dmax = 0.0;
    let mut vmax = st;
    for (i, &(x, y)) in pts.iter().enumerate().take(ed).skip(st + 1) {
        let d = a * x as f64 + b * y as f64 + c;
        if d * d > dmax {
            dmax = d * d;
            vmax = i;
        }
    }

    let norm = a * a + b * b;
    if norm > 0.0 && dmax / norm > thresh {
        split_side(pts, st, vmax, thresh, out)?;
        if out.len() > 5 {
            return None;
        }
        out.push(vmax);
        split_side(pts, vmax, ed, thresh, out)?;
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::label_regions;

    fn filled_square(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> Vec<bool> {
        let mut mask = vec![false; w * h];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask[y * w + x] = true;
            }
        }
        mask
    }

    #[test]
    fn traces_square_boundary() {
        let mask = filled_square(12, 12, 2, 3, 5);
        let lab = label_regions(&mask, 12, 12);
        let contour = trace_contour(&lab, &lab.regions[0]).expect("contour");
        // perimeter pixels of a 5x5 block
        assert_eq!(contour.len(), 16);
        assert_eq!(contour[0], (2, 3));
        assert_eq!(contour[1], (3, 3));
        assert!(contour.contains(&(6, 7)));
        assert!(!contour.contains(&(4, 5)));
    }

    #[test]
    fn isolated_pixel_has_no_contour() {
        let mask = filled_square(5, 5, 2, 2, 1);
        let lab = label_regions(&mask, 5, 5);
        assert!(trace_contour(&lab, &lab.regions[0]).is_none());
    }

    #[test]
    fn square_gives_four_corner_vertices() {
        let mask = filled_square(40, 40, 5, 8, 20);
        let lab = label_regions(&mask, 40, 40);
        let region = &lab.regions[0];
        let contour = trace_contour(&lab, region).expect("contour");
        let (closed, v) = fit_quad(&contour, region.area, 1.0).expect("quad");

        let mut corners: Vec<(i64, i64)> = v.iter().map(|&i| closed[i]).collect();
        corners.sort();
        assert_eq!(corners, vec![(5, 8), (5, 27), (24, 8), (24, 27)]);
    }

    #[test]
    fn disc_is_not_a_quad() {
        let (w, h) = (60, 60);
        let mut mask = vec![false; w * h];
        for y in 0..h {
            for x in 0..w {
                let (dx, dy) = (x as f64 - 30.0, y as f64 - 30.0);
                mask[y * w + x] = dx * dx + dy * dy <= 400.0;
            }
        }
        let lab = label_regions(&mask, w, h);
        let region = &lab.regions[0];
        let contour = trace_contour(&lab, region).expect("contour");
        assert!(fit_quad(&contour, region.area, 1.0).is_none());
    }
}
