//! Uploaded media persistence.
//!
//! The media store writes uploads to a flat upload directory under their
//! original file name. Images are decoded first and scaled down to fit the
//! configured [`MediaBound`]; videos and other files are written unchanged.
//!
//! Names are not made unique: a second upload with the same name replaces
//! the first. Writes are not atomic, so a crash mid-write can leave a
//! partial file behind.
//!
//! Stored names are kept verbatim. Wherever a stored path goes into a URL
//! or a markdown link it passes through [`encode_path`], and is read back
//! with [`decode_path`].

use crate::imaging::{
    BackendError, EncodeFormat, ImageBackend, MediaBound, Quality, normalize_image,
};
use crate::record::MediaKind;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image rejected: {0}")]
    Imaging(#[from] BackendError),
    #[error("invalid upload file name: {0:?}")]
    InvalidName(String),
}

/// Where a stored upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Path relative to the working directory, e.g. `uploads/photo.jpg`.
    pub path: String,
    pub kind: MediaKind,
}

/// Writes uploads into the upload root.
pub struct MediaStore<B: ImageBackend> {
    root: PathBuf,
    bound: MediaBound,
    quality: Quality,
    backend: B,
}

impl<B: ImageBackend> MediaStore<B> {
    pub fn new(root: impl Into<PathBuf>, bound: MediaBound, quality: Quality, backend: B) -> Self {
        Self {
            root: root.into(),
            bound,
            quality,
            backend,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one upload and return its relative path.
    ///
    /// Image data that cannot be decoded fails the call and nothing is
    /// written.
    pub fn store(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<StoredMedia, MediaError> {
        let name = sanitize_file_name(file_name)?;

        let bytes = match (kind, EncodeFormat::from_file_name(name)) {
            (MediaKind::Image, Some(format)) => {
                let normalized =
                    normalize_image(&self.backend, bytes, format, self.bound, self.quality)?;
                if normalized.resized {
                    tracing::debug!(
                        file = name,
                        width = normalized.width,
                        height = normalized.height,
                        "image scaled to bound"
                    );
                }
                normalized.bytes
            }
            (MediaKind::Image, None) => {
                return Err(MediaError::Imaging(BackendError::Unsupported(format!(
                    "no encoder for {name}"
                ))));
            }
            _ => bytes,
        };

        fs::create_dir_all(&self.root)?;
        let target = self.root.join(name);
        fs::write(&target, &bytes)?;

        tracing::info!(
            path = %target.display(),
            kind = kind.as_str(),
            bytes = bytes.len(),
            "media stored"
        );

        Ok(StoredMedia {
            path: relative_path(&self.root, name),
            kind,
        })
    }
}

/// Reduce a client-supplied name to its final path component.
///
/// Browsers send bare names, but some send full client paths; either way
/// nothing may escape the upload root.
fn sanitize_file_name(file_name: &str) -> Result<&str, MediaError> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(MediaError::InvalidName(file_name.to_string()));
    }
    Ok(name)
}

/// `root/name` rendered with forward slashes, for storage and URLs.
fn relative_path(root: &Path, name: &str) -> String {
    let root = root.to_string_lossy().replace('\\', "/");
    let root = root.trim_end_matches('/');
    if root.is_empty() || root == "." {
        name.to_string()
    } else {
        format!("{root}/{name}")
    }
}

/// Bytes escaped inside one path segment of a URL or markdown link.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode each `/`-separated segment of a stored path.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode_path`].
pub fn decode_path(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}
