use serde::{Deserialize, Serialize};

/// Pose estimator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseParams {
    /// Upper bound on orthogonal iteration steps.
    pub max_iterations: usize,
    /// Stop once the object-space error changes by less than this.
    pub tolerance: f64,
    /// Quads with a smaller ideal-pixel area are rejected as degenerate.
    pub min_quad_area: f64,
    /// Quads with a shorter side (ideal px) are rejected as degenerate.
    pub min_side_length: f64,
    /// Smallest accepted ratio of shortest to longest side; edge-on slivers
    /// fall below it.
    pub min_side_ratio: f64,
    /// Reject poses whose RMS reprojection error (px) exceeds this.
    pub max_reprojection_error: Option<f64>,
}

impl Default for PoseParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-12,
            min_quad_area: 1.0,
            min_side_length: 2.0,
            min_side_ratio: 0.05,
            max_reprojection_error: None,
        }
    }
}
