//! Shared test utilities for the galpage test suite.
//!
//! Item builders with compact arguments: timestamps are minutes on a fixed
//! reference hour so tests read as `item("photos/a.jpg", 100, 0, 160)`
//! without chrono noise.

use crate::types::{MediaItem, MediaMeta};
use chrono::{DateTime, TimeZone, Utc};

/// Reference timestamp: 2021-07-04 12:<minute>:00 UTC.
pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 4, 12, minute, 0).unwrap()
}

/// A scanned item with no preview and no extracted creation time.
pub fn item(path: &str, size: u64, minute: u32, height: u32) -> MediaItem {
    MediaItem {
        path: path.to_string(),
        meta: MediaMeta {
            file_size: size,
            file_modify: ts(minute),
            media_create: None,
            preview_height: height,
        },
        preview_src: String::new(),
    }
}

/// A fully computed item, as it would come out of a prior artifact.
pub fn item_with_preview(
    path: &str,
    size: u64,
    minute: u32,
    height: u32,
    preview: &str,
) -> MediaItem {
    MediaItem {
        preview_src: preview.to_string(),
        ..item(path, size, minute, height)
    }
}
