use std::fs;
use std::path::Path;

use crate::{Pattern, PatternId, PatternLoadError, PatternMatcher};

/// Anything that decodes marker interiors and needs the loaded templates.
pub trait AttachPatterns {
    fn attach_patterns(&mut self, matcher: PatternMatcher);
}

/// Owner of the tracked pattern.
///
/// Only one pattern can be active at a time. Ids are never reused, so a
/// pattern loaded after [`PatternRegistry::release`] gets a fresh id.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    active: Option<Pattern>,
    next_id: u32,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a pattern file; `width` is the physical marker side length.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, path), fields(path = %path.as_ref().display())))]
    pub fn load_pattern(
        &mut self,
        path: impl AsRef<Path>,
        width: f64,
    ) -> Result<PatternId, PatternLoadError> {
        let path = path.as_ref();
        self.ensure_vacant()?;
        let text = fs::read_to_string(path)?;
        let id = self.load_pattern_str(&text, width)?;
        log::info!("loaded pattern {} from {}", id, path.display());
        Ok(id)
    }

    /// Register a pattern given in the text format.
    pub fn load_pattern_str(&mut self, text: &str, width: f64) -> Result<PatternId, PatternLoadError> {
        self.ensure_vacant()?;
        let pattern = Pattern::parse(PatternId(self.next_id), text, width)?;
        Ok(self.install(pattern))
    }

    /// Register a pattern from upright gray cells.
    pub fn insert_gray(
        &mut self,
        size: usize,
        upright: &[u8],
        width: f64,
    ) -> Result<PatternId, PatternLoadError> {
        self.ensure_vacant()?;
        let pattern = Pattern::from_gray(PatternId(self.next_id), size, upright, width)?;
        Ok(self.install(pattern))
    }

    fn ensure_vacant(&self) -> Result<(), PatternLoadError> {
        match &self.active {
            Some(p) => Err(PatternLoadError::RegistryFull(p.id())),
            None => Ok(()),
        }
    }

    fn install(&mut self, pattern: Pattern) -> PatternId {
        let id = pattern.id();
        self.next_id += 1;
        self.active = Some(pattern);
        id
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.active.as_ref().filter(|p| p.id() == id)
    }

    pub fn active(&self) -> Option<&Pattern> {
        self.active.as_ref()
    }

    pub fn len(&self) -> usize {
        usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    pub fn matcher(&self) -> PatternMatcher {
        let patterns: Vec<&Pattern> = self.active.iter().collect();
        PatternMatcher::new(&patterns)
    }

    /// Hand the loaded templates to a decoder.
    pub fn attach(&self, detector: &mut impl AttachPatterns) -> Result<(), PatternLoadError> {
        if self.is_empty() {
            return Err(PatternLoadError::Empty);
        }
        detector.attach_patterns(self.matcher());
        Ok(())
    }

    /// Drop the active pattern.
    pub fn release(&mut self) -> Option<Pattern> {
        let released = self.active.take();
        if let Some(p) = &released {
            log::debug!("released pattern {}", p.id());
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sink {
        matcher: Option<PatternMatcher>,
    }

    impl AttachPatterns for Sink {
        fn attach_patterns(&mut self, matcher: PatternMatcher) {
            self.matcher = Some(matcher);
        }
    }

    fn cells() -> Vec<u8> {
        let mut c = vec![255u8; 16];
        c[0] = 0;
        c[1] = 0;
        c[4] = 0;
        c
    }

    #[test]
    fn single_pattern_limit() {
        let mut reg = PatternRegistry::new();
        let id = reg.insert_gray(4, &cells(), 80.0).expect("first");
        assert_eq!(id, PatternId(0));
        assert_eq!(reg.len(), 1);

        let err = reg.insert_gray(4, &cells(), 80.0).unwrap_err();
        assert!(matches!(err, PatternLoadError::RegistryFull(PatternId(0))));
        assert!(reg.get(PatternId(0)).is_some());
        assert!(reg.get(PatternId(1)).is_none());

        assert!(reg.release().is_some());
        assert!(reg.release().is_none());
        let id = reg.insert_gray(4, &cells(), 80.0).expect("after release");
        assert_eq!(id, PatternId(1));
    }

    #[test]
    fn failed_load_leaves_registry_unchanged() {
        let mut reg = PatternRegistry::new();
        assert!(reg.load_pattern_str("1 2 3", 80.0).is_err());
        assert!(reg.is_empty());
        let id = reg.insert_gray(4, &cells(), 80.0).expect("load");
        assert_eq!(id, PatternId(0));
    }

    #[test]
    fn attach_requires_a_pattern() {
        let mut reg = PatternRegistry::new();
        let mut sink = Sink::default();
        assert!(matches!(reg.attach(&mut sink), Err(PatternLoadError::Empty)));
        assert!(sink.matcher.is_none());

        reg.insert_gray(4, &cells(), 80.0).expect("load");
        reg.attach(&mut sink).expect("attach");
        let matcher = sink.matcher.expect("attached");
        assert_eq!(matcher.size(), 4);
        assert_eq!(matcher.ids().collect::<Vec<_>>(), vec![PatternId(0)]);
    }
}
