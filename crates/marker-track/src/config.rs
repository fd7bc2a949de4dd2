use std::fs;
use std::path::{Path, PathBuf};

use marker_track_core::PixelFormat;
use marker_track_detect::DetectorParams;
use marker_track_pose::PoseParams;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME: &str = "MarkerTracker";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("missing required `input`")]
    MissingInput,
    #[error("`name` must not be empty")]
    EmptyName,
    #[error("pattern width must be finite and positive, got {0}")]
    InvalidPatternWidth(f64),
    #[error("frame size must be non-zero, got {width}x{height}")]
    InvalidFrameSize { width: usize, height: usize },
}

/// Known capture resolution; lets the camera be rescaled before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

/// Tracker configuration document.
///
/// ```json
/// {
///   "input": "/dev/video0",
///   "calibration_path": "data/camera_para.dat",
///   "pattern_path": "data/patt.hiro",
///   "pattern_width": 80.0
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Name of the video source this tracker is attached to.
    pub input: String,
    /// Device name used in diagnostics.
    pub name: String,
    pub calibration_path: PathBuf,
    pub pattern_path: PathBuf,
    /// Physical side length of the marker, in calibration units (mm).
    pub pattern_width: f64,
    pub frame_size: Option<FrameSize>,
    pub pixel_format: PixelFormat,
    pub detector: DetectorParams,
    pub pose: PoseParams,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            name: DEFAULT_NAME.to_string(),
            calibration_path: PathBuf::from("data/camera_para.dat"),
            pattern_path: PathBuf::from("data/patt.hiro"),
            pattern_width: 80.0,
            frame_size: None,
            pixel_format: PixelFormat::default(),
            detector: DetectorParams::default(),
            pose: PoseParams::default(),
        }
    }
}

impl TrackerConfig {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.trim().is_empty() {
            return Err(ConfigError::MissingInput);
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if !self.pattern_width.is_finite() || self.pattern_width <= 0.0 {
            return Err(ConfigError::InvalidPatternWidth(self.pattern_width));
        }
        if let Some(FrameSize { width, height }) = self.frame_size {
            if width == 0 || height == 0 {
                return Err(ConfigError::InvalidFrameSize { width, height });
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a JSON config; relative paths inside it are resolved against the
    /// config file's directory.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut cfg = Self::from_json_str(&raw)?;
        if let Some(dir) = path.parent() {
            cfg.calibration_path = resolve(dir, &cfg.calibration_path);
            cfg.pattern_path = resolve(dir, &cfg.pattern_path);
        }
        Ok(cfg)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn resolve(dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    }
}
