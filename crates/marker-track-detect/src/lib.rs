//! Square fiducial marker detection.
//!
//! The pipeline per frame:
//!
//! 1. gray conversion and global threshold (dark is foreground),
//! 2. 8-connected labeling with area / border filtering,
//! 3. outer contour tracing and four-vertex fitting,
//! 4. edge lines fitted in ideal (undistorted) coordinates, corners from their
//!    intersections,
//! 5. pattern sampling and correlation against the attached templates,
//! 6. suppression of nested candidates.
//!
//! Choosing among candidates is left to the caller.

mod candidate;
pub mod contour;
mod decode;
mod detector;
pub mod label;
mod params;
pub mod refine;
pub mod threshold;

pub use candidate::{suppress_overlaps, MarkerCandidate};
pub use decode::{decode_quad, sample_pattern};
pub use detector::{DetectError, MarkerDetector};
pub use params::{DetectorParams, ThresholdMode};
