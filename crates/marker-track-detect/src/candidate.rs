use marker_track_pattern::PatternId;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One square found in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerCandidate {
    /// Matched pattern, `None` when the interior did not correlate well enough.
    pub pattern_id: Option<PatternId>,
    /// Correlation with the best template orientation.
    pub confidence: f64,
    /// Quarter turns of the pattern relative to the detected corner order.
    pub direction: u8,
    /// Ideal (undistorted) pixel corners TL, TR, BR, BL of the upright pattern.
    pub corners: [Point2<f64>; 4],
    /// The same corners in observed (distorted) image coordinates.
    pub observed_corners: [Point2<f64>; 4],
    /// Ideal-space centroid of the corners.
    pub center: Point2<f64>,
    /// Pixel count of the dark region.
    pub area: usize,
}

impl MarkerCandidate {
    pub fn is_identified(&self) -> bool {
        self.pattern_id.is_some()
    }
}

/// Drop candidates whose centre lies within `sqrt(area) / 2` of a larger one.
pub fn suppress_overlaps(mut candidates: Vec<MarkerCandidate>) -> Vec<MarkerCandidate> {
    let n = candidates.len();
    let mut keep = vec![true; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if !keep[i] || !keep[j] {
                continue;
            }
            let (a, b) = (&candidates[i], &candidates[j]);
            let d2 = (a.center - b.center).norm_squared();
            let larger = a.area.max(b.area) as f64;
            if d2 < larger / 4.0 {
                if a.area >= b.area {
                    keep[j] = false;
                } else {
                    keep[i] = false;
                }
            }
        }
    }
    let mut flags = keep.into_iter();
    candidates.retain(|_| flags.next().unwrap_or(false));
    candidates
}
