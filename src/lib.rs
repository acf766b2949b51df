//! # galpage
//!
//! A single-file HTML gallery generator with incremental preview caching.
//! Point it at a directory of photos and videos and it writes `<dir>.html`
//! next to it: a self-contained page of hyperlinked inline previews, with
//! the generation parameters and per-item cache metadata embedded in the
//! markup itself.
//!
//! # Architecture: One Incremental Pipeline
//!
//! Every run executes the same fixed sequence:
//!
//! ```text
//! scan      directory    →  items            (filesystem facts only)
//! cache     <dir>.html   →  prior records    (from the previous run)
//! plan      items+cache  →  cached | pending
//! execute   pending      →  previews         (bounded worker pool)
//! order     items        →  final sequence
//! encode    items        →  <dir>.html       (written only if changed)
//! ```
//!
//! The artifact is the cache: there is no side database or manifest file.
//! An item whose size, modification time, and preview height all match its
//! record in the previous output is reused verbatim. Re-running against an
//! unchanged directory costs a directory walk and produces byte-identical
//! output, which the driver detects and skips writing entirely.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | walks the directory, collapses same-stem files into one subject, applies exclusions |
//! | [`artifact`] | encodes/decodes the self-describing HTML document (previews + embedded metadata) |
//! | [`cache`] | prior-run lookup with exact size/mtime/height validity |
//! | [`process`] | partitions cached vs pending and recomputes pending items on a bounded rayon pool |
//! | [`build`] | the driver: stage composition, presentation ordering, write-if-changed |
//! | [`config`] | persisted generation parameters, CLI-override resolution, validation |
//! | [`media`] | metadata extraction and preview rendering behind the [`MediaBackend`](media::MediaBackend) trait |
//! | [`types`] | `MediaItem` and friends, shared by every stage |
//!
//! # Design Decisions
//!
//! ## The Output Is the Cache
//!
//! Cache state rides inside the generated page as base64-encoded JSON
//! attributes. Deleting the HTML file resets the cache; copying the
//! directory plus its HTML file preserves it. There is nothing else to
//! manage, version, or garbage-collect.
//!
//! ## Byte-Stable Encoding
//!
//! The codec is deterministic: no generation timestamps, no map-order
//! dependence. That single property is what turns "did anything change?"
//! into a byte comparison, keeping re-runs from churning file mtimes (and
//! whatever backup or sync tool watches them).
//!
//! ## Still Images In-Process, Everything Else Through ffmpeg
//!
//! JPEG and PNG previews are produced with the `image` crate: decode,
//! orient, resize, encode, no subprocess. Animated images and videos sample
//! frames through ffmpeg/ffprobe into a looping animated WebP. The split
//! keeps the common case fast and dependency-free while still giving videos
//! real animated previews.

pub mod artifact;
pub mod build;
pub mod cache;
pub mod config;
pub mod media;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
