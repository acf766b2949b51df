//! Work planning and concurrent preview recomputation.
//!
//! [`plan`] decides, per scanned item, whether the prior run's record can be
//! reused. A cache hit replaces the scanned item wholesale, metadata and
//! preview together, never piecemeal. Everything else is pending.
//!
//! [`execute`] recomputes the pending items on a dedicated rayon pool whose
//! size bounds the number of in-flight renders (video previews fork ffmpeg,
//! so an unbounded fan-out would overwhelm the machine). Each worker owns
//! exactly one item at a time and writes results into that item's own slot,
//! so completion order is irrelevant; the driver re-sorts afterwards.
//!
//! Per-item failures are isolated: a failed metadata extraction leaves the
//! fallback timestamp, a failed preview leaves the item without a preview
//! (dropping it from the output), and neither stops any other item or the
//! run. `execute` returns only once every pending item has either succeeded
//! or been logged as failed.

use crate::cache::CacheStore;
use crate::media::MediaBackend;
use crate::types::{MediaItem, Orientation};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::warn;

use rayon::prelude::*;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("worker pool construction failed: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Stamp items with the effective preview height and partition against the
/// cache. Cache hits are replaced by their prior records; the returned
/// indices are the items that still need recomputation.
pub fn plan(items: &mut [MediaItem], cache: &CacheStore, height: u32) -> Vec<usize> {
    let mut pending = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        item.meta.preview_height = height;
        match cache.lookup(&item.path, &item.meta) {
            Some(cached) => *item = cached.clone(),
            None => pending.push(index),
        }
    }
    pending
}

/// Recompute the pending items under a bounded worker pool.
///
/// `base` is the directory the item paths are relative to. Returns the
/// number of items whose preview could not be rendered.
pub fn execute(
    items: &mut [MediaItem],
    pending: &[usize],
    backend: &(impl MediaBackend + ?Sized),
    base: &Path,
    workers: usize,
) -> Result<usize, ProcessError> {
    let pending_set: HashSet<usize> = pending.iter().copied().collect();
    let mut work: Vec<&mut MediaItem> = items
        .iter_mut()
        .enumerate()
        .filter(|(index, _)| pending_set.contains(index))
        .map(|(_, item)| item)
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let failed = AtomicUsize::new(0);
    pool.install(|| {
        work.par_iter_mut().for_each(|item| {
            let fs_path = base.join(&item.path);

            let mut orientation = Orientation::default();
            match backend.extract_metadata(&fs_path) {
                Ok(info) => {
                    item.meta.media_create = info.created;
                    orientation = info.orientation;
                }
                Err(err) => warn!(path = %item.path, %err, "metadata extraction failed"),
            }

            match backend.render_preview(&fs_path, item.meta.preview_height, orientation) {
                Ok(preview) => item.preview_src = preview.to_data_uri(),
                Err(err) => {
                    warn!(path = %item.path, %err, "preview render failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    });

    Ok(failed.into_inner())
}

/// Summary of a build run, for the closing log line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub cached: usize,
    pub computed: usize,
    pub failed: usize,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cached > 0 || self.failed > 0 {
            write!(f, "{} rendered", self.computed)?;
            if self.cached > 0 {
                write!(f, ", {} from cache", self.cached)?;
            }
            if self.failed > 0 {
                write!(f, ", {} failed", self.failed)?;
            }
            write!(f, " ({} total)", self.total)
        } else {
            write!(f, "{} rendered", self.computed)
        }
    }
}
