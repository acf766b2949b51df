//! Media backend trait and shared types.
//!
//! The [`MediaBackend`] trait is the boundary between the pipeline and the
//! actual media handling: extracting a creation timestamp plus orientation,
//! and rendering a preview at a target height. The pipeline only ever talks
//! to this trait, so tests can count and fail calls through a mock without
//! decoding a single pixel.
//!
//! The production implementation is [`NativeBackend`](super::NativeBackend).

use crate::types::Orientation;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// Metadata extracted from a media file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// Creation time according to the media itself (EXIF, container tags).
    pub created: Option<DateTime<Utc>>,
    /// Orientation correction the preview renderer must apply.
    pub orientation: Orientation,
}

/// A rendered preview: encoded bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Preview {
    /// Format as the `data:` URI embedded in the artifact.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

/// Trait for media handling backends.
///
/// `Sync` because workers call into a shared backend concurrently.
pub trait MediaBackend: Sync {
    /// Extract creation time and orientation. Called at most once per item
    /// per run, and never for cache hits.
    fn extract_metadata(&self, path: &Path) -> Result<MediaInfo, BackendError>;

    /// Render a preview at the given pixel height, applying the orientation
    /// correction. Never called for cache hits.
    fn render_preview(
        &self,
        path: &Path,
        height: u32,
        orientation: Orientation,
    ) -> Result<Preview, BackendError>;
}
