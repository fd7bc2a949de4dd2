use std::fmt;
use std::path::Path;

use marker_track_camera::{CalibrationError, CameraModel, CameraParams, DEFAULT_LUT_OFFSET};
use marker_track_core::{FrameView, Timestamp};
use marker_track_detect::{MarkerCandidate, MarkerDetector};
use marker_track_pattern::{PatternId, PatternLoadError, PatternRegistry};
use marker_track_pose::{Pose, PoseError, PoseEstimator};

use crate::config::{ConfigError, FrameSize, TrackerConfig};
use crate::report::{PoseReader, PoseReport, PoseSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InitializationError {
    #[error("cannot initialize a {0} session")]
    State(SessionState),
    #[error("camera calibration: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("pattern: {0}")]
    Pattern(#[from] PatternLoadError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is {0}, frames need a ready session")]
    NotReady(SessionState),
}

/// Tracked-pattern candidate with the strictly highest confidence; ties keep
/// the first one.
pub fn select_best(candidates: &[MarkerCandidate], tracked: PatternId) -> Option<&MarkerCandidate> {
    let mut best: Option<&MarkerCandidate> = None;
    for c in candidates.iter().filter(|c| c.pattern_id == Some(tracked)) {
        if best.is_none_or(|b| c.confidence > b.confidence) {
            best = Some(c);
        }
    }
    best
}

/// One marker tracker bound to one video source.
///
/// Owns the camera model, the pattern registry, the detector and the pose
/// estimator. Frames are processed one at a time; the latest report is
/// shared through [`PoseReader`].
#[derive(Debug)]
pub struct TrackingSession {
    config: TrackerConfig,
    state: SessionState,
    camera: Option<CameraModel>,
    registry: PatternRegistry,
    detector: MarkerDetector,
    estimator: PoseEstimator,
    tracked: Option<PatternId>,
    pattern_width: f64,
    resize_pending: bool,
    frames_processed: u64,
    reader: PoseReader,
}

impl TrackingSession {
    pub fn new(config: TrackerConfig) -> Self {
        let estimator = PoseEstimator::new(config.pose.clone());
        Self {
            state: SessionState::Uninitialized,
            camera: None,
            registry: PatternRegistry::new(),
            detector: MarkerDetector::new(config.detector.clone()),
            estimator,
            tracked: None,
            pattern_width: config.pattern_width,
            resize_pending: true,
            frames_processed: 0,
            reader: PoseReader::default(),
            config,
        }
    }

    /// Validate `config` and initialize with its calibration and pattern paths.
    pub fn from_config(config: &TrackerConfig) -> Result<Self, InitializationError> {
        if let Err(e) = config.validate() {
            log::error!("{}: invalid configuration: {e}", config.name);
            return Err(e.into());
        }
        let mut session = Self::new(config.clone());
        session.initialize(&config.calibration_path, &config.pattern_path)?;
        Ok(session)
    }

    /// Load the camera calibration and the pattern, and attach the pattern to
    /// the detector. On failure the session stays uninitialized.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(name = %self.config.name))
    )]
    pub fn initialize(
        &mut self,
        calibration_path: impl AsRef<Path>,
        pattern_path: impl AsRef<Path>,
    ) -> Result<(), InitializationError> {
        if self.state != SessionState::Uninitialized {
            log::error!(
                "{}: initialize called on a {} session",
                self.config.name,
                self.state
            );
            return Err(InitializationError::State(self.state));
        }
        let result = self.load(calibration_path.as_ref(), pattern_path.as_ref());
        match &result {
            Ok(()) => {
                self.state = SessionState::Ready;
                log::info!(
                    "{}: tracking pattern {} on {}",
                    self.config.name,
                    self.tracked.map_or_else(|| "-".to_string(), |id| id.to_string()),
                    self.config.input
                );
            }
            Err(e) => {
                log::error!("{}: initialization failed: {e}", self.config.name);
                self.release();
            }
        }
        result
    }

    fn load(&mut self, calibration: &Path, pattern: &Path) -> Result<(), InitializationError> {
        let params = CameraParams::load(calibration)?;
        let mut camera = CameraModel::new(params, DEFAULT_LUT_OFFSET)?;
        if let Some(FrameSize { width, height }) = self.config.frame_size {
            camera.resize_to(width, height)?;
            self.resize_pending = false;
        }

        let id = self.registry.load_pattern(pattern, self.config.pattern_width)?;
        self.registry.attach(&mut self.detector)?;
        self.pattern_width = self
            .registry
            .active()
            .map_or(self.config.pattern_width, |p| p.width());
        self.tracked = Some(id);
        self.camera = Some(camera);
        Ok(())
    }

    fn release(&mut self) {
        self.camera = None;
        self.registry.release();
        self.detector.detach_patterns();
        self.tracked = None;
    }

    /// Detect the tracked marker in `frame` and estimate its pose.
    ///
    /// Only a session in the wrong state is an error; every per-frame
    /// failure yields a report with `found == false`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(frame = self.frames_processed))
    )]
    pub fn process(
        &mut self,
        frame: &FrameView<'_>,
        timestamp: Timestamp,
    ) -> Result<PoseReport, SessionError> {
        self.ensure_ready()?;
        if self.frames_processed == 0 {
            log::info!(
                "{}: first frame {}x{} ({:?})",
                self.config.name,
                frame.width,
                frame.height,
                frame.format
            );
        }
        let candidates = self.detect(frame);
        Ok(self.finish(candidates.as_deref().unwrap_or(&[]), timestamp))
    }

    /// Run pose selection and estimation on candidates found elsewhere.
    pub fn process_candidates(
        &mut self,
        candidates: &[MarkerCandidate],
        timestamp: Timestamp,
    ) -> Result<PoseReport, SessionError> {
        self.ensure_ready()?;
        Ok(self.finish(candidates, timestamp))
    }

    /// [`process`](Self::process), then hand the report to `sink`.
    pub fn process_and_publish(
        &mut self,
        frame: &FrameView<'_>,
        timestamp: Timestamp,
        sink: &mut impl PoseSink,
    ) -> Result<PoseReport, SessionError> {
        let report = self.process(frame, timestamp)?;
        sink.publish(&report);
        Ok(report)
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            state => Err(SessionError::NotReady(state)),
        }
    }

    fn detect(&mut self, frame: &FrameView<'_>) -> Option<Vec<MarkerCandidate>> {
        let name = &self.config.name;
        let camera = self.camera.as_mut()?;
        if frame.format != self.config.pixel_format {
            log::warn!(
                "{name}: frame format {:?} differs from configured {:?}",
                frame.format,
                self.config.pixel_format
            );
            return None;
        }
        if (frame.width, frame.height) != (camera.width(), camera.height()) {
            if !self.resize_pending {
                log::warn!(
                    "{name}: frame {}x{} does not match camera {}x{}",
                    frame.width,
                    frame.height,
                    camera.width(),
                    camera.height()
                );
                return None;
            }
            self.resize_pending = false;
            if let Err(e) = camera.resize_to(frame.width, frame.height) {
                log::warn!("{name}: cannot rescale camera: {e}");
                return None;
            }
        }
        match self.detector.detect(frame, camera) {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                log::debug!("{name}: frame rejected: {e}");
                None
            }
        }
    }

    fn finish(&mut self, candidates: &[MarkerCandidate], timestamp: Timestamp) -> PoseReport {
        let index = self.frames_processed;
        self.frames_processed += 1;

        let report = match self.locate(candidates) {
            Some(pose) => PoseReport::found(pose, timestamp, index),
            None => PoseReport::not_found(timestamp, index),
        };
        self.reader.store(report);
        report
    }

    fn locate(&self, candidates: &[MarkerCandidate]) -> Option<Pose> {
        let best = select_best(candidates, self.tracked?)?;
        match self.estimate(best) {
            Ok(pose) => Some(pose),
            Err(e) => {
                log::debug!("{}: pose rejected: {e}", self.config.name);
                None
            }
        }
    }

    fn estimate(&self, candidate: &MarkerCandidate) -> Result<Pose, PoseError> {
        let camera = self.camera.as_ref().ok_or(PoseError::Degenerate)?;
        self.estimator
            .estimate(&candidate.corners, camera, self.pattern_width)
    }

    /// Release the camera, the pattern and the detector templates. Safe to
    /// call more than once.
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Terminated {
            log::debug!("{}: already shut down", self.config.name);
            return;
        }
        self.release();
        self.state = SessionState::Terminated;
        log::info!(
            "{}: shut down after {} frames",
            self.config.name,
            self.frames_processed
        );
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn camera(&self) -> Option<&CameraModel> {
        self.camera.as_ref()
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn tracked_pattern(&self) -> Option<PatternId> {
        self.tracked
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Copy of the most recent report.
    pub fn latest(&self) -> PoseReport {
        self.reader.latest()
    }

    pub fn pose_reader(&self) -> PoseReader {
        self.reader.clone()
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if self.state == SessionState::Ready {
            self.shutdown();
        }
    }
}
