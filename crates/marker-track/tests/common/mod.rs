#![allow(dead_code)]

use std::path::PathBuf;

use marker_track::camera::synthetic::{demo_cells, render_marker, MarkerScene};
use marker_track::camera::{CameraIntrinsics, CameraModel, CameraParams, Distortion, DEFAULT_LUT_OFFSET};
use marker_track::core::{gray_to_packed, PixelFormat};
use marker_track::pattern::{Pattern, PatternId};
use marker_track::TrackerConfig;
use tempfile::TempDir;

pub const WIDTH: f64 = 80.0;
pub const CELLS: usize = 16;

pub fn camera_params() -> CameraParams {
    CameraParams {
        width: 320,
        height: 240,
        intrinsics: CameraIntrinsics {
            fx: 300.0,
            fy: 300.0,
            cx: 160.0,
            cy: 120.0,
        },
        distortion: Distortion::default(),
    }
}

/// Same camera with a barrel lens and a little decentering.
pub fn distorted_params() -> CameraParams {
    CameraParams {
        distortion: Distortion {
            k1: -0.1,
            k2: 0.02,
            p1: 0.001,
            ..Distortion::default()
        },
        ..camera_params()
    }
}

/// Calibration and pattern files in a temp dir, plus a config pointing at them.
pub struct Fixture {
    pub dir: TempDir,
    pub config: TrackerConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_camera(camera_params())
    }

    pub fn with_camera(params: CameraParams) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let calibration = dir.path().join("camera.json");
        params.save_json(&calibration).expect("write calibration");

        let pattern = dir.path().join("marker.patt");
        let cells = demo_cells(CELLS);
        let text = Pattern::from_gray(PatternId(0), CELLS, &cells, WIDTH)
            .expect("pattern")
            .to_pattern_string();
        std::fs::write(&pattern, text).expect("write pattern");

        let config = TrackerConfig {
            calibration_path: calibration,
            pattern_path: pattern,
            pattern_width: WIDTH,
            ..TrackerConfig::new("synthetic0")
        };
        Self { dir, config }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Packed BGR pixels of the demo marker seen through `params`.
pub fn render_bgr(params: CameraParams, configure: impl FnOnce(&mut MarkerScene<'_>)) -> Vec<u8> {
    let camera = CameraModel::new(params, DEFAULT_LUT_OFFSET).expect("camera");
    let cells = demo_cells(CELLS);
    let mut scene = MarkerScene::frontal(&cells, CELLS, WIDTH, 250.0);
    configure(&mut scene);
    gray_to_packed(&render_marker(&camera, &scene), PixelFormat::Bgr)
}
