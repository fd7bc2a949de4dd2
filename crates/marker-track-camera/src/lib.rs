//! Camera model for marker tracking.
//!
//! [`CameraParams`] is what a calibration file contains. [`CameraModel`] adds
//! the distortion lookup tables used by the detector and can be rescaled once
//! the real frame resolution is known.
//!
//! ```no_run
//! use marker_track_camera::{CameraModel, CameraParams, DEFAULT_LUT_OFFSET};
//!
//! let params = CameraParams::load("camera_para.dat")?;
//! let mut camera = CameraModel::new(params, DEFAULT_LUT_OFFSET)?;
//! camera.resize_to(1280, 720)?;
//! # Ok::<(), marker_track_camera::CalibrationError>(())
//! ```

mod io;
mod lut;
mod model;
mod params;
pub mod synthetic;

pub use io::{CalibrationError, DAT_RECORD_LEN};
pub use lut::{UndistortLut, DEFAULT_LUT_OFFSET};
pub use model::CameraModel;
pub use params::{
    CameraIntrinsics, CameraParams, Distortion, UNDISTORT_EPS, UNDISTORT_MAX_ITERS,
};
