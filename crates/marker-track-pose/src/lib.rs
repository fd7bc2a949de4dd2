//! Pose of a square planar marker from its four image corners.
//!
//! The estimator starts from the plane-to-image homography and refines the
//! rotation with orthogonal iteration, which minimises the object-space
//! collinearity error of the corner rays.
//!
//! ```
//! use marker_track_camera::CameraIntrinsics;
//! use marker_track_pose::PoseEstimator;
//! use nalgebra::Point2;
//!
//! let k = CameraIntrinsics { fx: 500.0, fy: 500.0, cx: 320.0, cy: 240.0 };
//! // an 80 mm marker seen head-on from 400 mm covers 100 px
//! let corners = [
//!     Point2::new(270.0, 190.0),
//!     Point2::new(370.0, 190.0),
//!     Point2::new(370.0, 290.0),
//!     Point2::new(270.0, 290.0),
//! ];
//! let pose = PoseEstimator::default()
//!     .estimate_with_intrinsics(&corners, &k, 80.0)
//!     .unwrap();
//! assert!((pose.translation.z - 400.0).abs() < 1e-6);
//! ```

mod estimator;
mod orthogonal;
mod params;
mod pose;

pub use estimator::{marker_corners, PoseError, PoseEstimator};
pub use params::PoseParams;
pub use pose::Pose;
