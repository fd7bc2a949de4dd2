use std::sync::Arc;

use marker_track_core::Timestamp;
use marker_track_pose::Pose;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Outcome of one processed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseReport {
    /// Marker pose in camera coordinates, calibration units.
    pub pose: Option<Pose>,
    pub found: bool,
    pub timestamp: Timestamp,
    /// Zero-based index of the frame within the session.
    pub frame_index: u64,
}

impl PoseReport {
    pub fn found(pose: Pose, timestamp: Timestamp, frame_index: u64) -> Self {
        Self {
            pose: Some(pose),
            found: true,
            timestamp,
            frame_index,
        }
    }

    pub fn not_found(timestamp: Timestamp, frame_index: u64) -> Self {
        Self {
            pose: None,
            found: false,
            timestamp,
            frame_index,
        }
    }

    /// Millimetre translation converted to metres.
    pub fn in_meters(&self) -> Self {
        Self {
            pose: self.pose.map(|p| p.scaled(0.001)),
            ..*self
        }
    }
}

/// Receiver of per-frame reports (a VR host, a logger, a channel).
pub trait PoseSink {
    fn publish(&mut self, report: &PoseReport);
}

impl<F: FnMut(&PoseReport)> PoseSink for F {
    fn publish(&mut self, report: &PoseReport) {
        self(report)
    }
}

/// Read handle on the latest report of a session.
///
/// Snapshots are copied out under the lock, so a reader on another thread
/// never sees a half-written report.
#[derive(Clone, Debug, Default)]
pub struct PoseReader {
    slot: Arc<RwLock<PoseReport>>,
}

impl PoseReader {
    pub fn latest(&self) -> PoseReport {
        *self.slot.read()
    }

    pub(crate) fn store(&self, report: PoseReport) {
        *self.slot.write() = report;
    }
}
