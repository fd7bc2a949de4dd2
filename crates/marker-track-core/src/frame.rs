//! Borrowed camera frames as delivered by an external image source.
//!
//! A [`FrameView`] is only valid for the duration of the call it is passed
//! to; the pixel buffer stays owned (and is released) by the image source.

use serde::{Deserialize, Serialize};

use crate::GrayImage;

/// Pixel layout of an incoming frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit blue, green, red.
    #[default]
    Bgr,
    /// 8-bit red, green, blue.
    Rgb,
    /// 8-bit blue, green, red, alpha.
    Bgra,
    /// 8-bit red, green, blue, alpha.
    Rgba,
    /// 8-bit luminance.
    Gray,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr | Self::Rgb => 3,
            Self::Bgra | Self::Rgba => 4,
            Self::Gray => 1,
        }
    }

    /// Byte offsets of the red, green and blue channels inside one pixel.
    const fn rgb_offsets(self) -> [usize; 3] {
        match self {
            Self::Bgr | Self::Bgra => [2, 1, 0],
            Self::Rgb | Self::Rgba => [0, 1, 2],
            Self::Gray => [0, 0, 0],
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },
}

/// One frame borrowed from the image source.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl<'a> FrameView<'a> {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> Result<Self, FrameError> {
        let frame = Self {
            data,
            width,
            height,
            format,
        };
        frame.validate()?;
        Ok(frame)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.format.bytes_per_pixel()))
            .ok_or(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != expected {
            return Err(FrameError::InvalidBufferLength {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Luminance copy of the frame (ITU-R BT.601 weights, integer arithmetic).
    pub fn to_gray(&self) -> Result<GrayImage, FrameError> {
        self.validate()?;
        if self.format == PixelFormat::Gray {
            return Ok(GrayImage {
                width: self.width,
                height: self.height,
                data: self.data.to_vec(),
            });
        }

        let bpp = self.format.bytes_per_pixel();
        let [ri, gi, bi] = self.format.rgb_offsets();
        let data = self
            .data
            .chunks_exact(bpp)
            .map(|px| {
                let r = px[ri] as u32;
                let g = px[gi] as u32;
                let b = px[bi] as u32;
                ((77 * r + 150 * g + 29 * b + 128) >> 8) as u8
            })
            .collect();

        Ok(GrayImage {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// Expand a gray image into a packed buffer of the requested format.
pub fn gray_to_packed(gray: &GrayImage, format: PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let mut out = Vec::with_capacity(gray.data.len() * bpp);
    for &v in &gray.data {
        match format {
            PixelFormat::Gray => out.push(v),
            PixelFormat::Bgr | PixelFormat::Rgb => out.extend_from_slice(&[v, v, v]),
            PixelFormat::Bgra | PixelFormat::Rgba => out.extend_from_slice(&[v, v, v, 255]),
        }
    }
    out
}

/// Capture time of a frame, as reported by the image source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub microseconds: i32,
}

impl Timestamp {
    pub const fn new(seconds: i64, microseconds: i32) -> Self {
        Self {
            seconds,
            microseconds,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.microseconds as f64 * 1e-6
    }
}
