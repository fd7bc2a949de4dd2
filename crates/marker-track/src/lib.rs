//! Square fiducial marker tracking.
//!
//! A [`TrackingSession`] is bound to one video source. It loads a camera
//! calibration and one marker pattern, then turns every frame into a
//! [`PoseReport`]: the marker's rotation and translation in camera
//! coordinates, or `found == false`.
//!
//! ```no_run
//! use marker_track::{TrackerConfig, TrackingSession};
//! use marker_track::core::{FrameView, PixelFormat, Timestamp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrackerConfig::load_json("tracker.json")?;
//! let mut session = TrackingSession::from_config(&config)?;
//!
//! let pixels = vec![0u8; 640 * 480 * 3];
//! let frame = FrameView::new(&pixels, 640, 480, PixelFormat::Bgr)?;
//! let report = session.process(&frame, Timestamp::new(0, 0))?;
//! if let Some(pose) = report.in_meters().pose {
//!     println!("marker at {:?}", pose.translation);
//! }
//! session.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `marker_track::core`: frames, gray images, homographies, quad helpers, logging.
//! - `marker_track::camera`: calibration files, distortion, lookup tables.
//! - `marker_track::pattern`: pattern files, templates and matching.
//! - `marker_track::detect`: square detection and identification.
//! - `marker_track::pose`: planar pose estimation.

mod config;
mod report;
mod session;

pub use marker_track_camera as camera;
pub use marker_track_core as core;
pub use marker_track_detect as detect;
pub use marker_track_pattern as pattern;
pub use marker_track_pose as pose;

pub use config::{ConfigError, FrameSize, TrackerConfig, DEFAULT_NAME};
pub use marker_track_pose::Pose;
pub use report::{PoseReader, PoseReport, PoseSink};
pub use session::{select_best, InitializationError, SessionError, SessionState, TrackingSession};
