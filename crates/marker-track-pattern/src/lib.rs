//! Square marker patterns.
//!
//! - [`Pattern`]: four pre-rotated, zero-mean gray templates read from the
//!   text pattern format,
//! - [`PatternRegistry`]: owner of the single tracked pattern and its id,
//! - [`PatternMatcher`]: normalised cross-correlation of sampled marker
//!   interiors against the templates.
//!
//! Quad detection lives in `marker-track-detect`, which receives the templates
//! through [`AttachPatterns`].

mod matcher;
mod registry;
mod template;

pub use matcher::{PatternMatch, PatternMatcher};
pub use registry::{AttachPatterns, PatternRegistry};
pub use template::{rotate_cw, Pattern, PatternId, PatternLoadError, Template};
