use marker_track_camera::CameraModel;
use marker_track_core::quad::{centroid, rotate_corners, signed_area};
use marker_track_core::{FrameError, FrameView, GrayImage};
use marker_track_pattern::{AttachPatterns, PatternMatcher};
use nalgebra::Point2;

use crate::candidate::suppress_overlaps;
use crate::contour::{fit_quad, trace_contour};
use crate::decode::decode_quad;
use crate::label::{label_regions, Region};
use crate::refine::refine_corners;
use crate::threshold::{binarize, resolve_threshold};
use crate::{DetectorParams, MarkerCandidate};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Square marker detector.
///
/// Finds dark square outlines, fits their corners in ideal coordinates and
/// identifies the interior against the attached pattern templates.
#[derive(Clone, Debug, Default)]
pub struct MarkerDetector {
    params: DetectorParams,
    matcher: Option<PatternMatcher>,
}

impl AttachPatterns for MarkerDetector {
    fn attach_patterns(&mut self, matcher: PatternMatcher) {
        self.matcher = Some(matcher);
    }
}

impl MarkerDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            params,
            matcher: None,
        }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn has_patterns(&self) -> bool {
        self.matcher.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Forget the attached templates.
    pub fn detach_patterns(&mut self) {
        self.matcher = None;
    }

    /// Detect candidates in one frame. An empty list is a normal outcome.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn detect(
        &self,
        frame: &FrameView<'_>,
        camera: &CameraModel,
    ) -> Result<Vec<MarkerCandidate>, DetectError> {
        let gray = frame.to_gray()?;
        Ok(self.detect_gray(&gray, camera))
    }

    /// Detect candidates in an already converted gray image.
    pub fn detect_gray(&self, gray: &GrayImage, camera: &CameraModel) -> Vec<MarkerCandidate> {
        let (w, h) = (gray.width, gray.height);
        let level = resolve_threshold(self.params.threshold, gray);
        let mask = binarize(gray, level);
        let labeling = label_regions(&mask, w, h);

        let max_area = (self.params.max_area_frac * (w * h) as f64).max(0.0);
        let regions: Vec<&Region> = labeling
            .regions
            .iter()
            .filter(|r| {
                r.area >= self.params.min_area
                    && (r.area as f64) <= max_area
                    && !r.touches_border(w, h)
            })
            .collect();
        log::trace!(
            "threshold {} -> {} regions, {} in range",
            level,
            labeling.regions.len(),
            regions.len()
        );

        let view = gray.view();
        let mut candidates = Vec::new();
        for region in regions {
            let Some(contour) = trace_contour(&labeling, region) else {
                continue;
            };
            let Some((closed, vertices)) =
                fit_quad(&contour, region.area, self.params.square_fit_thresh)
            else {
                continue;
            };
            let Some(mut corners) =
                refine_corners(&closed, &vertices, self.params.edge_trim, camera)
            else {
                continue;
            };
            if signed_area(&corners) < 0.0 {
                corners = [corners[0], corners[3], corners[2], corners[1]];
            }

            let matched = self.matcher.as_ref().and_then(|m| {
                decode_quad(
                    &view,
                    camera,
                    &corners,
                    m,
                    self.params.pattern_ratio,
                    self.params.samples_per_cell,
                )
            });

            let (pattern_id, confidence, direction) = match matched {
                Some(m) if m.confidence >= self.params.min_confidence => {
                    (Some(m.id), m.confidence, m.direction)
                }
                Some(m) => (None, m.confidence, m.direction),
                None => (None, 0.0, 0),
            };
            let corners = rotate_corners(&corners, direction as usize);
            let Some(observed_corners) = observed(camera, &corners) else {
                continue;
            };

            candidates.push(MarkerCandidate {
                pattern_id,
                confidence,
                direction,
                center: centroid(&corners),
                corners,
                observed_corners,
                area: region.area,
            });
        }

        let candidates = suppress_overlaps(candidates);
        log::debug!("{} marker candidates", candidates.len());
        candidates
    }
}

fn observed(camera: &CameraModel, corners: &[Point2<f64>; 4]) -> Option<[Point2<f64>; 4]> {
    Some([
        camera.ideal_to_observed(corners[0])?,
        camera.ideal_to_observed(corners[1])?,
        camera.ideal_to_observed(corners[2])?,
        camera.ideal_to_observed(corners[3])?,
    ])
}
