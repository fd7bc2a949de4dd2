//! Correlation matching of sampled marker interiors against templates.

use serde::{Deserialize, Serialize};

use crate::{Pattern, PatternId, Template};

/// Best template for one sampled marker interior.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub id: PatternId,
    /// Quarter turns `0..=3` such that the samples look like the upright
    /// pattern rotated clockwise `direction` times.
    pub direction: u8,
    /// Normalised cross-correlation in `[-1, 1]`.
    pub confidence: f64,
}

/// Matcher over a fixed set of patterns that share one template size.
///
/// Brute force over every pattern and orientation; with the single tracked
/// pattern that is four dot products per candidate.
#[derive(Clone, Debug, Default)]
pub struct PatternMatcher {
    size: usize,
    entries: Vec<(PatternId, [Template; 4])>,
}

impl PatternMatcher {
    pub fn new(patterns: &[&Pattern]) -> Self {
        let size = patterns.first().map(|p| p.size()).unwrap_or(0);
        let entries = patterns
            .iter()
            .filter(|p| {
                let same = p.size() == size;
                if !same {
                    log::warn!(
                        "pattern {} has {} cells per side, expected {}; skipped",
                        p.id(),
                        p.size(),
                        size
                    );
                }
                same
            })
            .map(|p| (p.id(), p.templates().clone()))
            .collect();
        Self { size, entries }
    }

    /// Cells per side expected by [`PatternMatcher::match_samples`].
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PatternId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Correlate `samples` (row-major `size x size` intensities) with every
    /// orientation. Ties keep the first orientation encountered.
    ///
    /// Returns `None` for a wrong sample count or a sample patch without
    /// contrast.
    pub fn match_samples(&self, samples: &[f64]) -> Option<PatternMatch> {
        if self.entries.is_empty() || samples.len() != self.size * self.size {
            return None;
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let norm = samples
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            .sqrt();
        if !norm.is_finite() || norm < 1e-9 {
            return None;
        }

        let mut best: Option<PatternMatch> = None;
        for (id, templates) in &self.entries {
            for (direction, t) in templates.iter().enumerate() {
                let dot: f64 = samples
                    .iter()
                    .zip(&t.values)
                    .map(|(s, v)| (s - mean) * v)
                    .sum();
                let confidence = dot / (norm * t.norm);
                if best.is_none_or(|b| confidence > b.confidence) {
                    best = Some(PatternMatch {
                        id: *id,
                        direction: direction as u8,
                        confidence,
                    });
                }
            }
        }
        best
    }
}
