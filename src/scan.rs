//! Directory scanning: discover the media subjects a gallery is built from.
//!
//! Walks the gallery directory, keeps files whose extension maps to a
//! supported [`MediaFormat`], and collapses files that share a stem into one
//! subject. A phone that saves `IMG_1.JPG` plus `IMG_1.MP4` for a live photo
//! yields a single item, represented by the still image. Format priority
//! is still, then animated, then video, with lexical extension order as
//! tie-break.
//!
//! Items are keyed by their slash-normalized path relative to the *parent*
//! of the scanned directory (so `photos/2021Q1/IMG_6189.JPG` for a scan of
//! `photos/`), which is exactly the hyperlink target relative to the
//! artifact file written next to the directory.
//!
//! Exclusion patterns are matched against the `/`-prefixed path of the
//! *canonical* file per subject; a match drops the whole subject before it
//! reaches the cache or the output.
//!
//! Any filesystem walk error aborts the scan; a partial directory tree
//! would silently drop gallery entries.

use crate::types::{MediaFormat, MediaItem, MediaMeta};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid gallery directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One discovered file, before collision resolution.
struct Candidate {
    format: MediaFormat,
    /// Extension as it appears on disk, used as the collision tie-break.
    ext: String,
    path: String,
    file_size: u64,
    file_modify: DateTime<Utc>,
}

/// Scan a gallery directory into media items, one per subject.
///
/// The result is sorted by path; `media_create`, `preview_src`, and
/// `preview_height` are left empty for the planner and executor to fill.
pub fn scan(dir: &Path, exclude: Option<&Regex>) -> Result<Vec<MediaItem>, ScanError> {
    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::InvalidRoot(dir.to_path_buf()))?
        .to_string();

    // Group candidates by stem (path with the extension stripped) so that
    // same-subject files collapse into one entry.
    let mut subjects: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();

    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(format) = MediaFormat::from_path(entry.path()) else {
            continue;
        };
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walkdir entries are under the scan root");
        let path = format!("{}/{}", dir_name, to_slash(rel));
        let stem = to_slash(&rel.with_extension(""));

        let md = entry.metadata()?;
        subjects.entry(stem).or_default().push(Candidate {
            format,
            ext,
            path,
            file_size: md.len(),
            file_modify: md.modified()?.into(),
        });
    }

    let mut items = Vec::new();
    for (_, mut candidates) in subjects {
        // Still images take precedence over animated media and video for
        // the same subject; ties broken by extension.
        candidates.sort_by(|a, b| (a.format, &a.ext).cmp(&(b.format, &b.ext)));
        let chosen = candidates.into_iter().next().expect("non-empty group");

        if let Some(rx) = exclude
            && rx.is_match(&format!("/{}", chosen.path))
        {
            continue;
        }

        items.push(MediaItem {
            path: chosen.path,
            meta: MediaMeta {
                file_size: chosen.file_size,
                file_modify: chosen.file_modify,
                media_create: None,
                preview_height: 0,
            },
            preview_src: String::new(),
        });
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

/// Render a relative path with forward slashes regardless of platform.
fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Create `<tmp>/photos` with the given files and return the tempdir.
    fn setup(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("photos");
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, *file).unwrap();
        }
        tmp
    }

    fn paths(items: &[MediaItem]) -> Vec<&str> {
        items.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn scan_finds_supported_files() {
        let tmp = setup(&["a.jpg", "b.png", "c.gif", "d.webp", "e.webm", "f.mp4"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(items.len(), 6);
    }

    #[test]
    fn scan_skips_unsupported_extensions() {
        let tmp = setup(&["a.jpg", "notes.txt", "raw.CR2", "noext"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(paths(&items), vec!["photos/a.jpg"]);
    }

    #[test]
    fn scan_walks_nested_directories() {
        let tmp = setup(&["2021Q1/a.jpg", "2021Q2/deep/b.png"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(
            paths(&items),
            vec!["photos/2021Q1/a.jpg", "photos/2021Q2/deep/b.png"]
        );
    }

    #[test]
    fn scan_collision_prefers_still_over_video() {
        let tmp = setup(&["subject.jpg", "subject.mp4"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(paths(&items), vec!["photos/subject.jpg"]);
    }

    #[test]
    fn scan_collision_prefers_animated_over_video() {
        let tmp = setup(&["clip.gif", "clip.webm"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(paths(&items), vec!["photos/clip.gif"]);
    }

    #[test]
    fn scan_collision_uppercase_extensions() {
        let tmp = setup(&["IMG_1.JPG", "IMG_1.MP4"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        assert_eq!(paths(&items), vec!["photos/IMG_1.JPG"]);
    }

    #[test]
    fn scan_exclusion_drops_matching_paths() {
        let tmp = setup(&["keep.jpg", "drafts/skip.jpg"]);
        let rx = Regex::new("/photos/drafts/").unwrap();
        let items = scan(&tmp.path().join("photos"), Some(&rx)).unwrap();
        assert_eq!(paths(&items), vec!["photos/keep.jpg"]);
    }

    #[test]
    fn scan_exclusion_pattern_sees_leading_slash() {
        let tmp = setup(&["a.jpg"]);
        let rx = Regex::new("^/photos/a\\.jpg$").unwrap();
        let items = scan(&tmp.path().join("photos"), Some(&rx)).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn scan_populates_filesystem_metadata_only() {
        let tmp = setup(&["a.jpg"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        let item = &items[0];
        assert_eq!(item.meta.file_size, "a.jpg".len() as u64);
        assert!(item.meta.media_create.is_none());
        assert!(!item.has_preview());
    }

    #[test]
    fn scan_result_sorted_by_path() {
        let tmp = setup(&["z.jpg", "m/b.png", "a.gif"]);
        let items = scan(&tmp.path().join("photos"), None).unwrap();
        let mut sorted = paths(&items);
        sorted.sort();
        assert_eq!(paths(&items), sorted);
    }

    #[test]
    fn scan_missing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"), None);
        assert!(matches!(result, Err(ScanError::Walk(_))));
    }
}
