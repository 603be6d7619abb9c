//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a bound, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{exceeds, fit_within};
use super::params::{EncodeFormat, Quality, ResizeParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Maximum display size for stored images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaBound {
    pub max_width: u32,
    pub max_height: u32,
}

impl MediaBound {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }
}

impl Default for MediaBound {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 1280,
        }
    }
}

/// An upload after normalization, ready to be written.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// False when the original bytes were kept as-is.
    pub resized: bool,
}

/// Plan the resize for an image of `original` dimensions, or `None` if it
/// already fits.
pub fn plan_normalize(
    original: (u32, u32),
    bound: MediaBound,
    format: EncodeFormat,
    quality: Quality,
) -> Option<ResizeParams> {
    if !exceeds(original, bound.as_tuple()) {
        return None;
    }
    let (width, height) = fit_within(original, bound.as_tuple());
    Some(ResizeParams {
        width,
        height,
        format,
        quality,
    })
}

/// Decode an upload and scale it down so it fits inside `bound`.
///
/// Images that already fit are returned byte-for-byte, but are still fully
/// decoded first so corrupt data is rejected either way.
pub fn normalize_image(
    backend: &dyn ImageBackend,
    data: Vec<u8>,
    format: EncodeFormat,
    bound: MediaBound,
    quality: Quality,
) -> Result<NormalizedImage> {
    let dims = backend.identify(&data)?;

    match plan_normalize(dims.as_tuple(), bound, format, quality) {
        Some(params) => {
            let bytes = backend.resize(&data, &params)?;
            Ok(NormalizedImage {
                bytes,
                width: params.width,
                height: params.height,
                resized: true,
            })
        }
        None => Ok(NormalizedImage {
            bytes: data,
            width: dims.width,
            height: dims.height,
            resized: false,
        }),
    }
}
