//! Pattern templates and the text pattern file format.
//!
//! A pattern file lists whitespace separated integers `0..=255`: four
//! orientations, each made of three colour planes of `size x size` values.
//! Orientation `r` is the upright pattern turned clockwise `r` quarter turns.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Identifier handed out by the registry when a pattern is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatternId(pub u32);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PatternLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid pattern value {token:?} at position {index}")]
    Parse { token: String, index: usize },
    #[error("{0} values do not form four 3-plane square templates")]
    InvalidSize(usize),
    #[error("pattern orientation {0} has no contrast")]
    FlatTemplate(u8),
    #[error("pattern width must be finite and positive, got {0}")]
    InvalidWidth(f64),
    #[error("pattern {0} is already loaded; only one pattern can be tracked")]
    RegistryFull(PatternId),
    #[error("no pattern loaded")]
    Empty,
}

/// One orientation of a pattern, stored zero-mean for correlation.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub values: Vec<f64>,
    pub norm: f64,
}

impl Template {
    fn from_gray(gray: &[u8], direction: u8) -> Result<Self, PatternLoadError> {
        let n = gray.len() as f64;
        let mean = gray.iter().map(|&v| v as f64).sum::<f64>() / n;
        let values: Vec<f64> = gray.iter().map(|&v| v as f64 - mean).collect();
        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < 1e-9 {
            return Err(PatternLoadError::FlatTemplate(direction));
        }
        Ok(Self { values, norm })
    }
}

/// A square marker pattern with its four orientations.
#[derive(Clone, Debug)]
pub struct Pattern {
    id: PatternId,
    width: f64,
    size: usize,
    gray: [Vec<u8>; 4],
    templates: [Template; 4],
}

impl Pattern {
    /// Default template resolution (cells per side).
    pub const DEFAULT_SIZE: usize = 16;

    /// Parse the text pattern format.
    pub fn parse(id: PatternId, text: &str, width: f64) -> Result<Self, PatternLoadError> {
        let values = text
            .split_whitespace()
            .enumerate()
            .map(|(index, token)| {
                token.parse::<u8>().map_err(|_| PatternLoadError::Parse {
                    token: token.to_string(),
                    index,
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;

        let size = infer_size(values.len()).ok_or(PatternLoadError::InvalidSize(values.len()))?;
        let cells = size * size;
        let block = 3 * cells;

        let gray: [Vec<u8>; 4] = std::array::from_fn(|r| {
            let planes = &values[r * block..(r + 1) * block];
            (0..cells)
                .map(|i| {
                    let sum = planes[i] as u32 + planes[cells + i] as u32 + planes[2 * cells + i] as u32;
                    ((sum + 1) / 3) as u8
                })
                .collect()
        });
        Self::with_orientations(id, size, gray, width)
    }

    /// Build a pattern from the upright gray cells (row-major, `size x size`).
    pub fn from_gray(
        id: PatternId,
        size: usize,
        upright: &[u8],
        width: f64,
    ) -> Result<Self, PatternLoadError> {
        if size == 0 || upright.len() != size * size {
            return Err(PatternLoadError::InvalidSize(upright.len()));
        }
        let r0 = upright.to_vec();
        let r1 = rotate_cw(&r0, size);
        let r2 = rotate_cw(&r1, size);
        let r3 = rotate_cw(&r2, size);
        Self::with_orientations(id, size, [r0, r1, r2, r3], width)
    }

    fn with_orientations(
        id: PatternId,
        size: usize,
        gray: [Vec<u8>; 4],
        width: f64,
    ) -> Result<Self, PatternLoadError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(PatternLoadError::InvalidWidth(width));
        }
        let templates = [
            Template::from_gray(&gray[0], 0)?,
            Template::from_gray(&gray[1], 1)?,
            Template::from_gray(&gray[2], 2)?,
            Template::from_gray(&gray[3], 3)?,
        ];
        Ok(Self {
            id,
            width,
            size,
            gray,
            templates,
        })
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    /// Physical side length of the whole marker (calibration units, mm).
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gray cells of the upright orientation.
    pub fn upright(&self) -> &[u8] {
        &self.gray[0]
    }

    pub fn template(&self, direction: u8) -> &Template {
        &self.templates[(direction & 3) as usize]
    }

    pub fn templates(&self) -> &[Template; 4] {
        &self.templates
    }

    /// Serialize in the text pattern format (three identical planes).
    pub fn to_pattern_string(&self) -> String {
        let mut out = String::new();
        for orientation in &self.gray {
            for _plane in 0..3 {
                for row in orientation.chunks(self.size) {
                    let line: Vec<String> = row.iter().map(|v| format!("{v:3}")).collect();
                    let _ = writeln!(out, "{}", line.join(" "));
                }
            }
            out.push('\n');
        }
        out
    }
}

/// `count = 12 * size^2`
fn infer_size(count: usize) -> Option<usize> {
    if count == 0 || count % 12 != 0 {
        return None;
    }
    let cells = count / 12;
    let size = (cells as f64).sqrt().round() as usize;
    (size > 0 && size * size == cells).then_some(size)
}

/// Rotate a row-major `n x n` grid clockwise by a quarter turn.
pub fn rotate_cw<T: Copy>(cells: &[T], n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            out.push(cells[(n - 1 - x) * n + y]);
        }
    }
    out
}
