//! Core types and utilities for square fiducial marker tracking.
//!
//! This crate is intentionally small and purely geometric: borrowed frames
//! and gray images, bilinear sampling, planar homographies and quadrilateral
//! helpers. It knows nothing about cameras, patterns or poses.

mod frame;
mod homography;
mod image;
mod logger;
pub mod quad;

pub use frame::{gray_to_packed, FrameError, FrameView, PixelFormat, Timestamp};
pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
