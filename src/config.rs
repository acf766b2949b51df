//! Gallery configuration: persisted parameters and per-run resolution.
//!
//! Generation parameters live in two places. [`GalleryConfig`] is the
//! persisted trio (preview height, sort mode, exclusion pattern) embedded in
//! the artifact header so a bare re-run reproduces the previous gallery.
//! [`Overrides`] is what the CLI supplied for this invocation. [`resolve`]
//! merges the two (explicit flags win, then the prior artifact's values,
//! then stock defaults) and validates the result before any scanning
//! happens, so bad input never costs a directory walk.

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stock preview height in pixels.
pub const DEFAULT_HEIGHT: u32 = 160;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid 'height' value: {0} (must be positive)")]
    InvalidHeight(u32),
    #[error("invalid 'exclude' pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Presentation order for gallery entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum SortMode {
    /// Ascending by effective timestamp (media creation time, falling back
    /// to file modification time), with path as tie-break.
    #[default]
    #[serde(rename = "creation_date")]
    #[value(name = "creation_date")]
    CreationDate,
    /// Lexical ascending by relative path.
    #[serde(rename = "file_path")]
    #[value(name = "file_path")]
    FilePath,
}

/// Generation parameters persisted in the artifact header.
///
/// A prior artifact's config is carried forward on re-runs unless the caller
/// overrides individual values, so `galpage photos` regenerates with the
/// same height/sort/exclusions the gallery was originally built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Pixel height of each preview.
    pub height: u32,
    /// Entry ordering in the generated gallery.
    pub sort_by: SortMode,
    /// Regular expression of paths to exclude, matched against the
    /// `/`-prefixed slash-normalized relative path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            sort_by: SortMode::default(),
            exclude: None,
        }
    }
}

/// Values the caller supplied explicitly for this run.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub height: Option<u32>,
    pub sort_by: Option<SortMode>,
    pub exclude: Option<String>,
    pub workers: Option<usize>,
}

/// Fully resolved per-run configuration.
#[derive(Debug)]
pub struct RunConfig {
    pub gallery: GalleryConfig,
    /// Compiled exclusion pattern, when one is configured.
    pub exclude: Option<Regex>,
    /// Worker pool size for preview recomputation.
    pub workers: usize,
}

/// Merge explicit overrides with a prior artifact's config and validate.
///
/// Precedence per field: override → prior artifact → stock default.
pub fn resolve(
    overrides: &Overrides,
    prior: Option<&GalleryConfig>,
) -> Result<RunConfig, ConfigError> {
    let gallery = GalleryConfig {
        height: overrides
            .height
            .or(prior.map(|p| p.height))
            .unwrap_or(DEFAULT_HEIGHT),
        sort_by: overrides
            .sort_by
            .or(prior.map(|p| p.sort_by))
            .unwrap_or_default(),
        exclude: overrides
            .exclude
            .clone()
            .or_else(|| prior.and_then(|p| p.exclude.clone())),
    };

    if gallery.height == 0 {
        return Err(ConfigError::InvalidHeight(gallery.height));
    }

    let exclude = gallery
        .exclude
        .as_deref()
        .map(Regex::new)
        .transpose()?;

    Ok(RunConfig {
        gallery,
        exclude,
        workers: effective_workers(overrides.workers),
    })
}

/// Resolve the worker pool size.
///
/// - `None` → number of available cores
/// - `Some(0)` → clamped to 1
pub fn effective_workers(requested: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.map(|n| n.max(1)).unwrap_or(cores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_all_defaults() {
        let run = resolve(&Overrides::default(), None).unwrap();
        assert_eq!(run.gallery.height, DEFAULT_HEIGHT);
        assert_eq!(run.gallery.sort_by, SortMode::CreationDate);
        assert!(run.gallery.exclude.is_none());
        assert!(run.exclude.is_none());
        assert!(run.workers >= 1);
    }

    #[test]
    fn resolve_prior_config_carried_forward() {
        let prior = GalleryConfig {
            height: 240,
            sort_by: SortMode::FilePath,
            exclude: Some(r"\.bak".into()),
        };
        let run = resolve(&Overrides::default(), Some(&prior)).unwrap();
        assert_eq!(run.gallery, prior);
        assert!(run.exclude.is_some());
    }

    #[test]
    fn resolve_overrides_beat_prior() {
        let prior = GalleryConfig {
            height: 240,
            sort_by: SortMode::FilePath,
            exclude: Some(r"\.bak".into()),
        };
        let overrides = Overrides {
            height: Some(320),
            sort_by: Some(SortMode::CreationDate),
            exclude: Some("drafts/".into()),
            workers: None,
        };
        let run = resolve(&overrides, Some(&prior)).unwrap();
        assert_eq!(run.gallery.height, 320);
        assert_eq!(run.gallery.sort_by, SortMode::CreationDate);
        assert_eq!(run.gallery.exclude.as_deref(), Some("drafts/"));
    }

    #[test]
    fn resolve_rejects_zero_height() {
        let overrides = Overrides {
            height: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve(&overrides, None),
            Err(ConfigError::InvalidHeight(0))
        ));
    }

    #[test]
    fn resolve_rejects_bad_pattern() {
        let overrides = Overrides {
            exclude: Some("([unclosed".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve(&overrides, None),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn workers_zero_clamps_to_one() {
        assert_eq!(effective_workers(Some(0)), 1);
    }

    #[test]
    fn workers_explicit_value_respected() {
        assert_eq!(effective_workers(Some(3)), 3);
    }

    #[test]
    fn workers_default_at_least_one() {
        assert!(effective_workers(None) >= 1);
    }

    #[test]
    fn sort_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&SortMode::CreationDate).unwrap(),
            r#""creation_date""#
        );
        assert_eq!(
            serde_json::from_str::<SortMode>(r#""file_path""#).unwrap(),
            SortMode::FilePath
        );
    }

    #[test]
    fn gallery_config_json_omits_absent_exclude() {
        let json = serde_json::to_string(&GalleryConfig::default()).unwrap();
        assert!(!json.contains("exclude"));
    }
}
