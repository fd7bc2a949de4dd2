//! Connected-component labeling of the foreground mask (8-connectivity).

use nalgebra::Point2;

/// Disjoint-set forest over pixel indices, union by size.
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            let grand = self.parent[self.parent[i as usize] as usize];
            self.parent[i as usize] = grand;
            i = grand;
        }
        i
    }

    fn connect(&mut self, a: u32, b: u32) {
        let a = self.find(a);
        let b = self.find(b);
        if a == b {
            return;
        }
        let (small, large) = if self.size[a as usize] > self.size[b as usize] {
            (b, a)
        } else {
            (a, b)
        };
        self.parent[small as usize] = large;
        self.size[large as usize] += self.size[small as usize];
    }
}

/// Statistics of one connected dark region.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Label value in [`Labeling::labels`] (`>= 1`).
    pub label: u32,
    pub area: usize,
    /// Inclusive bounding box `[min_x, min_y, max_x, max_y]`.
    pub bbox: [usize; 4],
    pub centroid: Point2<f64>,
    /// First pixel of the region in raster order (topmost, then leftmost).
    pub start: (usize, usize),
}

impl Region {
    pub fn touches_border(&self, width: usize, height: usize) -> bool {
        self.bbox[0] == 0
            || self.bbox[1] == 0
            || self.bbox[2] + 1 >= width
            || self.bbox[3] + 1 >= height
    }
}

/// Label image (`0` = background) plus per-region statistics.
#[derive(Clone, Debug)]
pub struct Labeling {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    pub regions: Vec<Region>,
}

impl Labeling {
    #[inline]
    pub fn label_at(&self, x: i64, y: i64) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0;
        }
        self.labels[y as usize * self.width + x as usize]
    }
}

/// Label 8-connected foreground components of `mask`.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(mask)))]
pub fn label_regions(mask: &[bool], width: usize, height: usize) -> Labeling {
    let mut uf = UnionFind::new(mask.len());

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !mask[idx] {
                continue;
            }
            if x > 0 && mask[idx - 1] {
                uf.connect(idx as u32, (idx - 1) as u32);
            }
            if y > 0 {
                let up = idx - width;
                if mask[up] {
                    uf.connect(idx as u32, up as u32);
                }
                if x > 0 && mask[up - 1] {
                    uf.connect(idx as u32, (up - 1) as u32);
                }
                if x + 1 < width && mask[up + 1] {
                    uf.connect(idx as u32, (up + 1) as u32);
                }
            }
        }
    }

    // roots -> compact labels in raster order of first appearance
    let mut root_label = vec![0u32; mask.len()];
    let mut labels = vec![0u32; mask.len()];
    let mut regions: Vec<Region> = Vec::new();
    let mut sums: Vec<(f64, f64)> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !mask[idx] {
                continue;
            }
            let root = uf.find(idx as u32) as usize;
            if root_label[root] == 0 {
                regions.push(Region {
                    label: regions.len() as u32 + 1,
                    area: 0,
                    bbox: [x, y, x, y],
                    centroid: Point2::origin(),
                    start: (x, y),
                });
                sums.push((0.0, 0.0));
                root_label[root] = regions.len() as u32;
            }
            let label = root_label[root];
            labels[idx] = label;

            let r = &mut regions[label as usize - 1];
            r.area += 1;
            r.bbox[0] = r.bbox[0].min(x);
            r.bbox[1] = r.bbox[1].min(y);
            r.bbox[2] = r.bbox[2].max(x);
            r.bbox[3] = r.bbox[3].max(y);
            let s = &mut sums[label as usize - 1];
            s.0 += x as f64;
            s.1 += y as f64;
        }
    }

    for (r, (sx, sy)) in regions.iter_mut().zip(sums) {
        r.centroid = Point2::new(sx / r.area as f64, sy / r.area as f64);
    }

    Labeling {
        width,
        height,
        labels,
        regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let h = rows.len();
        let w = rows[0].len();
        let mask = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        (mask, w, h)
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let (mask, w, h) = mask_from(&[
            "......", //
            ".#....", //
            "..#...", //
            "...#..", //
            "......", //
        ]);
        let lab = label_regions(&mask, w, h);
        assert_eq!(lab.regions.len(), 1);
        assert_eq!(lab.regions[0].area, 3);
        assert_eq!(lab.regions[0].bbox, [1, 1, 3, 3]);
        assert_eq!(lab.regions[0].start, (1, 1));
        assert!(!lab.regions[0].touches_border(w, h));
    }

    #[test]
    fn u_shape_merges_late() {
        let (mask, w, h) = mask_from(&[
            "#...#", //
            "#...#", //
            "#####", //
            ".....", //
            "..#..", //
        ]);
        let lab = label_regions(&mask, w, h);
        assert_eq!(lab.regions.len(), 2);
        assert_eq!(lab.regions[0].area, 9);
        assert!(lab.regions[0].touches_border(w, h));
        assert_eq!(lab.regions[1].area, 1);
        assert_eq!(lab.label_at(2, 4), 2);
        assert_eq!(lab.label_at(4, 0), 1);
        assert_eq!(lab.label_at(-1, 0), 0);

        let c = lab.regions[1].centroid;
        assert_eq!((c.x, c.y), (2.0, 4.0));
    }
}
