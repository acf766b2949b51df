//! The build driver: one full gallery regeneration.
//!
//! Composes the stages in fixed order: read the prior artifact (if any) →
//! resolve configuration → build the cache → scan → plan → execute pending
//! renders → sort → encode → write-if-changed.
//!
//! Two policies live here rather than in the stages:
//!
//! - **Prior artifact handling.** An absent artifact is a normal first run
//!   and degrades to an empty cache. An artifact that exists but fails to
//!   decode aborts the build: a corrupt file is something the user should
//!   hear about, not silently regenerate over.
//! - **Idempotent writes.** The freshly encoded document is compared against
//!   the existing file; identical bytes mean no write at all, leaving the
//!   file's timestamp untouched. Fatal errors anywhere leave the existing
//!   artifact exactly as it was.

use crate::artifact::{self, ArtifactError};
use crate::cache::CacheStore;
use crate::config::{self, ConfigError, Overrides, SortMode};
use crate::media::MediaBackend;
use crate::process::{self, ProcessError, RunStats};
use crate::scan::{self, ScanError};
use crate::types::MediaItem;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid gallery directory: {0}")]
    InvalidRoot(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a build run.
#[derive(Debug)]
pub struct BuildReport {
    pub artifact_path: PathBuf,
    pub stats: RunStats,
    /// False when the regenerated document was byte-identical to the
    /// existing file and nothing was written.
    pub wrote: bool,
}

/// Derive the artifact location: a sibling of the gallery directory named
/// `<dirname>.html`.
pub fn artifact_path(dir: &Path) -> Result<PathBuf, BuildError> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BuildError::InvalidRoot(dir.to_path_buf()))?;
    Ok(dir.with_file_name(format!("{name}.html")))
}

/// Run the full pipeline for one gallery directory.
pub fn build(
    dir: &Path,
    overrides: &Overrides,
    backend: &(impl MediaBackend + ?Sized),
) -> Result<BuildReport, BuildError> {
    let artifact_path = artifact_path(dir)?;
    let base = dir.parent().unwrap_or(Path::new("")).to_path_buf();

    // Prior artifact: absent is a first run, corrupt is fatal.
    let prior_text = match std::fs::read_to_string(&artifact_path) {
        Ok(text) => {
            info!("parsing existing {}", artifact_path.display());
            Some(text)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };
    let prior = prior_text.as_deref().map(artifact::decode).transpose()?;

    let run = config::resolve(overrides, prior.as_ref().map(|a| &a.config))?;
    let cache = CacheStore::new(prior, run.gallery.height);

    let mut items = scan::scan(dir, run.exclude.as_ref())?;
    let pending = process::plan(&mut items, &cache, run.gallery.height);
    info!(
        "processing {} items ({} pending, {} from cache)",
        items.len(),
        pending.len(),
        items.len() - pending.len()
    );

    let failed = process::execute(&mut items, &pending, backend, &base, run.workers)?;

    sort_items(&mut items, run.gallery.sort_by);
    let encoded = artifact::encode(&items, &run.gallery)?;

    let changed = prior_text.as_deref() != Some(encoded.as_str());
    if changed {
        std::fs::write(&artifact_path, &encoded)?;
    }

    Ok(BuildReport {
        artifact_path,
        stats: RunStats {
            total: items.len(),
            cached: items.len() - pending.len(),
            computed: pending.len() - failed,
            failed,
        },
        wrote: changed,
    })
}

/// Put items into their final presentation order.
///
/// Creation-date mode tie-breaks on path so the order is total: two photos
/// shot in the same second always land in the same order.
pub fn sort_items(items: &mut [MediaItem], mode: SortMode) {
    match mode {
        SortMode::FilePath => items.sort_by(|a, b| a.path.cmp(&b.path)),
        SortMode::CreationDate => items.sort_by(|a, b| {
            a.effective_timestamp()
                .cmp(&b.effective_timestamp())
                .then_with(|| a.path.cmp(&b.path))
        }),
    }
}
