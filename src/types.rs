//! Shared types used across all pipeline stages.
//!
//! A [`MediaItem`] is the unit of work: created by the scan stage, matched
//! against the prior run by the cache stage, filled in by the process stage,
//! and serialized by the artifact codec. Its metadata half ([`MediaMeta`]) is
//! exactly the record embedded in the artifact file and compared for cache
//! validity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported media formats, declared in collision-priority order.
///
/// When several files share a stem (`IMG_1.JPG` + `IMG_1.MP4` from a live
/// photo), the subject is represented by the file whose format sorts first:
/// still images, then animated images, then videos. The derived `Ord`
/// encodes that priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Webm,
    Mp4,
}

impl MediaFormat {
    /// Map a file extension (without dot, any case) to a format.
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "webm" => Some(Self::Webm),
            "mp4" => Some(Self::Mp4),
            _ => None,
        }
    }

    /// Map a path's extension to a format.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_ext)
    }

    /// Still photo: decoded in-process by the `image` crate.
    pub fn is_still(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Animated image: previewed by sampling frames through ffmpeg.
    pub fn is_animated(self) -> bool {
        matches!(self, Self::Gif | Self::Webp)
    }

    /// Video: probed and previewed through ffprobe/ffmpeg.
    pub fn is_video(self) -> bool {
        matches!(self, Self::Webm | Self::Mp4)
    }
}

/// EXIF orientation transforms, stored as plain data.
///
/// The metadata extractor reads the tag; the preview renderer interprets it.
/// Values follow EXIF tag 0x0112 (1 = upright, 2-8 = the mirrored/rotated
/// variants); rotations are named clockwise. Unknown values decay to
/// `Identity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Identity,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    /// Mirror vertical, then rotate 90° clockwise (EXIF 5).
    Transpose,
    Rotate90,
    /// Mirror vertical, then rotate 270° clockwise (EXIF 7).
    Transverse,
    Rotate270,
}

impl Orientation {
    /// Decode the EXIF orientation tag value.
    pub fn from_exif(value: u16) -> Self {
        match value {
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => Self::Identity,
        }
    }
}

/// Cache-relevant metadata for a single media file.
///
/// Serialized as the `data-media` blob in the artifact. Field order is the
/// wire order, so keep it stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    /// File size in bytes at scan time.
    pub file_size: u64,
    /// Filesystem modification time at scan time. Cache validity requires
    /// exact equality, not newer-than.
    pub file_modify: DateTime<Utc>,
    /// Creation time extracted from the media itself (EXIF, container tags).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_create: Option<DateTime<Utc>>,
    /// Target pixel height the preview was rendered at.
    pub preview_height: u32,
}

/// One media subject tracked through scan, cache, and output.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Slash-normalized path relative to the parent of the scanned
    /// directory, e.g. `photos/2021Q1/IMG_6189.JPG`. Identity key across runs.
    pub path: String,
    pub meta: MediaMeta,
    /// Rendered preview as a `data:<mime>;base64,<payload>` URI.
    /// Empty until computed; items still empty at encode time are dropped.
    pub preview_src: String,
}

impl MediaItem {
    /// The timestamp used for chronological sorting: the extracted creation
    /// time when known, otherwise the file modification time.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.meta.media_create.unwrap_or(self.meta.file_modify)
    }

    /// Final path component, for display titles.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn has_preview(&self) -> bool {
        !self.preview_src.is_empty()
    }
}
