//! Preview cache built from the previous run's artifact.
//!
//! Preview rendering is the expensive phase (a video preview shells out to
//! ffmpeg several times per item). The prior artifact already embeds every
//! item's metadata and rendered preview, so an unchanged file can reuse both
//! wholesale.
//!
//! A cached record is valid for a freshly scanned item only when `file_size`,
//! `file_modify`, and `preview_height` all match exactly. Modification time
//! uses equality, not newer-than: a restored backup with an older mtime is
//! still a different file. Reuse is all-or-nothing: the fresh item takes the
//! cached record verbatim (creation time and preview included) or recomputes
//! everything.
//!
//! Changing the target preview height discards the whole store up front:
//! every preview was rendered at the old height, so per-item comparison is
//! pointless.
//!
//! The store is built once, before workers start, and only read afterwards,
//! so concurrent lookups need no locking.

use crate::artifact::Artifact;
use crate::types::{MediaItem, MediaMeta};
use std::collections::HashMap;
use tracing::info;

/// Lookup table of the prior run's items, keyed by relative path.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, MediaItem>,
}

impl CacheStore {
    /// An empty store (no prior artifact, or first run).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the store from a decoded prior artifact.
    ///
    /// `height` is the effective preview height for this run; when it
    /// differs from the height the prior artifact was generated with, the
    /// entire store is discarded.
    pub fn new(prior: Option<Artifact>, height: u32) -> Self {
        let Some(prior) = prior else {
            return Self::empty();
        };
        if prior.config.height != height {
            info!(
                previous = prior.config.height,
                requested = height,
                "discarding cached previews: height changed"
            );
            return Self::empty();
        }
        Self {
            entries: prior
                .items
                .into_iter()
                .map(|item| (item.path.clone(), item))
                .collect(),
        }
    }

    /// Return the prior item for `path` if it is still valid for `fresh`.
    pub fn lookup(&self, path: &str, fresh: &MediaMeta) -> Option<&MediaItem> {
        let cached = self.entries.get(path)?;
        let valid = cached.meta.file_size == fresh.file_size
            && cached.meta.file_modify == fresh.file_modify
            && cached.meta.preview_height == fresh.preview_height;
        valid.then_some(cached)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
