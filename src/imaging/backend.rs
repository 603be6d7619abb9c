//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the media store
//! needs: identify (decode + read dimensions) and resize (decode, scale,
//! re-encode). Both work on in-memory upload bytes.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, built on
//! the `image` crate.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image data: {0}")]
    Unsupported(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// `identify` must fully decode, so corrupt uploads are rejected even when
/// they are small enough to be stored without resizing.
pub trait ImageBackend: Send + Sync {
    /// Decode the image and return its dimensions.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, resize to exactly `params.width` × `params.height`, and encode.
    fn resize(&self, data: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Option<Dimensions>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Resize {
            input_len: usize,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        /// A backend whose every image decodes to `width` × `height`.
        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Some(Dimensions { width, height }),
                operations: Mutex::new(Vec::new()),
            }
        }

        /// A backend that rejects every input as corrupt.
        pub fn failing() -> Self {
            Self::default()
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(data.len()));
            self.dimensions
                .ok_or_else(|| BackendError::Unsupported("mock rejects all input".into()))
        }

        fn resize(&self, data: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                input_len: data.len(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            Ok(format!("resized {}x{}", params.width, params.height).into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(800, 600);

        let dims = backend.identify(b"abc").unwrap();
        assert_eq!(dims.as_tuple(), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(3)]);
    }

    #[test]
    fn mock_failing_rejects() {
        let backend = MockBackend::failing();
        assert!(matches!(
            backend.identify(b"x"),
            Err(BackendError::Unsupported(_))
        ));
    }
}
