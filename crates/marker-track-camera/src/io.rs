//! Calibration file readers and writers.
//!
//! Two formats are understood:
//!
//! * JSON (`*.json`): a serialized [`CameraParams`].
//! * The binary camera parameter format (any other extension): big-endian
//!   `i32 xsize, i32 ysize, f64 mat[3][4], f64 dist_factor[9]` where the
//!   distortion factors are `k1 k2 p1 p2 fx fy x0 y0 s`. Only this layout
//!   (distortion function version 4, 176 bytes) is accepted.

use std::fs;
use std::path::Path;

use crate::{CameraIntrinsics, CameraParams, Distortion};

/// Size in bytes of a version 4 binary parameter record.
pub const DAT_RECORD_LEN: usize = 4 + 4 + 12 * 8 + 9 * 8;

/// Record sizes of the older distortion function versions (1, 2, 3).
const LEGACY_RECORD_LENS: [(usize, u32); 3] = [(136, 1), (144, 2), (152, 3)];

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("calibration file truncated (expected {expected} bytes, got {got})")]
    Truncated { expected: usize, got: usize },
    #[error("unsupported distortion function version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid calibration: {0}")]
    Invalid(String),
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

impl CameraParams {
    /// Load calibration from disk, choosing the format by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let params = if is_json(path) {
            Self::load_json(path)?
        } else {
            Self::from_dat_bytes(&fs::read(path)?)?
        };
        params.validate()?;
        log::debug!(
            "loaded calibration {} ({}x{}, fx={:.2}, fy={:.2})",
            path.display(),
            params.width,
            params.height,
            params.intrinsics.fx,
            params.intrinsics.fy
        );
        Ok(params)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write these parameters to disk as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write these parameters in the binary format.
    pub fn save_dat(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        fs::write(path, self.to_dat_bytes()?)?;
        Ok(())
    }

    /// Decode one binary parameter record.
    pub fn from_dat_bytes(bytes: &[u8]) -> Result<Self, CalibrationError> {
        if let Some(&(_, version)) = LEGACY_RECORD_LENS
            .iter()
            .find(|(len, _)| *len == bytes.len())
        {
            return Err(CalibrationError::UnsupportedVersion(version));
        }
        if bytes.len() != DAT_RECORD_LEN {
            return Err(CalibrationError::Truncated {
                expected: DAT_RECORD_LEN,
                got: bytes.len(),
            });
        }

        let mut reader = BeReader { bytes, pos: 0 };
        let xsize = reader.i32();
        let ysize = reader.i32();
        let mut mat = [[0.0; 4]; 3];
        for row in mat.iter_mut() {
            for v in row.iter_mut() {
                *v = reader.f64();
            }
        }
        let mut dist = [0.0; 9];
        for v in dist.iter_mut() {
            *v = reader.f64();
        }

        if xsize <= 0 || ysize <= 0 {
            return Err(CalibrationError::Invalid(format!(
                "resolution must be positive, got {xsize}x{ysize}"
            )));
        }

        let intrinsics = CameraIntrinsics {
            fx: mat[0][0],
            fy: mat[1][1],
            cx: mat[0][2],
            cy: mat[1][2],
        };
        if mat[0][1].abs() > 1e-9 {
            log::warn!("ignoring camera skew {:.6}", mat[0][1]);
        }
        let dist_k = [dist[4], dist[5], dist[6], dist[7]];
        let mat_k = [intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy];
        if dist_k
            .iter()
            .zip(mat_k.iter())
            .any(|(a, b)| (a - b).abs() > 1e-6 * b.abs().max(1.0))
        {
            log::warn!(
                "distortion intrinsics {:?} differ from projection matrix {:?}; using the matrix",
                dist_k,
                mat_k
            );
        }

        Ok(Self {
            width: xsize as usize,
            height: ysize as usize,
            intrinsics,
            distortion: Distortion {
                k1: dist[0],
                k2: dist[1],
                p1: dist[2],
                p2: dist[3],
                k3: 0.0,
                scale: dist[8],
            },
        })
    }

    /// Encode as one binary parameter record.
    pub fn to_dat_bytes(&self) -> Result<Vec<u8>, CalibrationError> {
        if self.distortion.k3 != 0.0 {
            return Err(CalibrationError::Invalid(
                "k3 cannot be stored in the binary format".to_string(),
            ));
        }
        let width = i32::try_from(self.width)
            .map_err(|_| CalibrationError::Invalid(format!("width {} too large", self.width)))?;
        let height = i32::try_from(self.height)
            .map_err(|_| CalibrationError::Invalid(format!("height {} too large", self.height)))?;

        let k = &self.intrinsics;
        let d = &self.distortion;
        let mat = [
            [k.fx, 0.0, k.cx, 0.0],
            [0.0, k.fy, k.cy, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let dist = [d.k1, d.k2, d.p1, d.p2, k.fx, k.fy, k.cx, k.cy, d.scale];

        let mut out = Vec::with_capacity(DAT_RECORD_LEN);
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        for v in mat.iter().flatten().chain(dist.iter()) {
            out.extend_from_slice(&v.to_be_bytes());
        }
        Ok(out)
    }
}

/// Cursor over a buffer whose length has already been checked.
struct BeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl BeReader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        buf
    }

    fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_be_bytes(self.take())
    }
}
