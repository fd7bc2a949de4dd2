use serde::{Deserialize, Serialize};

/// How the binarization level is chosen for each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Pixels at or below the value are foreground.
    Manual(u8),
    /// Otsu's level computed from the frame histogram.
    Otsu,
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::Manual(100)
    }
}

/// Tuning knobs of the square marker detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub threshold: ThresholdMode,
    /// Smallest dark region (pixels) considered a marker.
    pub min_area: usize,
    /// Largest dark region as a fraction of the frame area.
    pub max_area_frac: f64,
    /// Vertex fitting tolerance; larger accepts rounder quads.
    pub square_fit_thresh: f64,
    /// Fraction of contour points dropped at both ends of each side before
    /// fitting the edge line.
    pub edge_trim: f64,
    /// Side of the pattern area relative to the whole marker.
    pub pattern_ratio: f64,
    /// Sub-samples per cell and axis when reading the pattern.
    pub samples_per_cell: usize,
    /// Matches below this correlation leave the candidate unidentified.
    pub min_confidence: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold: ThresholdMode::default(),
            min_area: 70,
            max_area_frac: 0.5,
            square_fit_thresh: 1.0,
            edge_trim: 0.05,
            pattern_ratio: 0.5,
            samples_per_cell: 3,
            min_confidence: 0.5,
        }
    }
}
