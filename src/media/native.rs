//! Production media backend.
//!
//! | Media | Metadata | Preview |
//! |---|---|---|
//! | JPEG | custom EXIF parser ([`exif`](super::exif)) | `image` crate decode → orient → resize → JPEG/PNG |
//! | PNG | none | `image` crate decode → resize → JPEG/PNG |
//! | GIF/WebP | none | ffmpeg frame split → sample → animated WebP |
//! | WebM/MP4 | sidecar JSON → ffprobe | ffprobe duration → frame sampling → animated WebP |
//!
//! Still images never leave the process. Animated media and video shell out
//! to ffmpeg/ffprobe, staging frames in self-cleaning temp directories.
//!
//! Video creation times come from an ordered fallback chain, first success
//! wins: a `<stem>.JSON` sidecar (pre-captured ffprobe output), then
//! `<stem>.json`, then running ffprobe itself.

use super::backend::{BackendError, MediaBackend, MediaInfo, Preview};
use super::exif;
use crate::types::{MediaFormat, Orientation};
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage, imageops};
use serde::Deserialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Backend using the `image` crate for stills and ffmpeg for everything else.
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for NativeBackend {
    fn extract_metadata(&self, path: &Path) -> Result<MediaInfo, BackendError> {
        match MediaFormat::from_path(path) {
            Some(MediaFormat::Jpeg) => {
                let bytes = std::fs::read(path)?;
                let data = exif::read_exif(&bytes);
                Ok(MediaInfo {
                    created: data.date_time,
                    orientation: data
                        .orientation
                        .map(Orientation::from_exif)
                        .unwrap_or_default(),
                })
            }
            Some(format) if format.is_video() => Ok(MediaInfo {
                created: video_creation_time(path)?,
                orientation: Orientation::Identity,
            }),
            _ => Ok(MediaInfo::default()),
        }
    }

    fn render_preview(
        &self,
        path: &Path,
        height: u32,
        orientation: Orientation,
    ) -> Result<Preview, BackendError> {
        match MediaFormat::from_path(path) {
            Some(format) if format.is_still() => render_still(path, height, orientation),
            Some(format) if format.is_animated() => render_animated(path, height, format),
            Some(format) if format.is_video() => render_video(path, height),
            _ => Err(BackendError::ProcessingFailed(format!(
                "unsupported media file: {}",
                path.display()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Still images
// ---------------------------------------------------------------------------

fn render_still(path: &Path, height: u32, orientation: Orientation) -> Result<Preview, BackendError> {
    let img = ImageReader::open(path)?.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("failed to decode {}: {e}", path.display()))
    })?;
    let img = resize_to_height(apply_orientation(img, orientation), height);

    let mut buf = Cursor::new(Vec::new());
    if img.color().has_alpha() {
        img.write_to(&mut buf, ImageFormat::Png).map_err(|e| {
            BackendError::ProcessingFailed(format!("PNG encode failed: {e}"))
        })?;
        Ok(Preview {
            mime: "image/png",
            bytes: buf.into_inner(),
        })
    } else {
        // JPEG cannot carry alpha; normalize the sample format too
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(Preview {
            mime: "image/jpeg",
            bytes: buf.into_inner(),
        })
    }
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Identity => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.flipv().rotate90(),
        Orientation::Rotate90 => img.rotate90(),
        Orientation::Transverse => img.flipv().rotate270(),
        Orientation::Rotate270 => img.rotate270(),
    }
}

/// Bring an image to the target height.
///
/// Taller images are scaled down preserving aspect ratio. Shorter images are
/// not upscaled: they are centered on a transparent canvas of the target
/// height, which keeps small originals crisp at the cost of a PNG preview.
fn resize_to_height(img: DynamicImage, height: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if h < height {
        let mut canvas = RgbaImage::new(w, height);
        let offset_y = i64::from((height - h) / 2);
        imageops::overlay(&mut canvas, &img.to_rgba8(), 0, offset_y);
        DynamicImage::ImageRgba8(canvas)
    } else if h > height {
        let target_w = ((u64::from(w) * u64::from(height)) / u64::from(h)).max(1) as u32;
        img.resize_exact(target_w, height, FilterType::Lanczos3)
    } else {
        img
    }
}

// ---------------------------------------------------------------------------
// Animated images (ffmpeg frame sampling)
// ---------------------------------------------------------------------------

fn render_animated(
    path: &Path,
    height: u32,
    format: MediaFormat,
) -> Result<Preview, BackendError> {
    let frames_dir = TempDir::new()?;
    let split = run(Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .arg(frames_dir.path().join("frame_%08d.png")));
    if let Err(err) = split {
        if format == MediaFormat::Webp {
            // ffmpeg builds commonly lack an animated-WebP decoder
            return Err(BackendError::ProcessingFailed(
                "animated WebP decode not supported".into(),
            ));
        }
        return Err(err);
    }

    let total = std::fs::read_dir(frames_dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
        .count();
    if total == 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "no frames decoded from {}",
            path.display()
        )));
    }

    // Sample a handful of frames, spread across the animation
    let samples = match total {
        0..=1 => 1,
        2..=16 => 2,
        17..=256 => 4,
        _ => 8,
    };
    let period = (total / samples).max(1);

    let sampled_dir = TempDir::new()?;
    let mut frame = 0;
    let mut written = 0;
    while frame < total {
        let src = frames_dir.path().join(format!("frame_{:08}.png", frame + 1));
        let img = ImageReader::open(&src)?.decode().map_err(|e| {
            BackendError::ProcessingFailed(format!("failed to decode frame {}: {e}", frame + 1))
        })?;
        let img = resize_to_height(img, height);
        written += 1;
        img.save(sampled_dir.path().join(format!("frame_{written:04}.png")))
            .map_err(|e| BackendError::ProcessingFailed(format!("frame write failed: {e}")))?;
        frame += period;
    }

    assemble_webp(sampled_dir.path(), "frame_%04d.png", 4)
}

// ---------------------------------------------------------------------------
// Videos (ffprobe + ffmpeg)
// ---------------------------------------------------------------------------

fn render_video(path: &Path, height: u32) -> Result<Preview, BackendError> {
    let duration = video_duration(path)?;
    let tmp = TempDir::new()?;

    if duration < 10.0 {
        // Short video: one decode pass, fps filter picks the frames
        let frames = if duration < 5.0 { 4 } else { 8 };
        run(Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args(["-vf", &format!("scale=-1:{height},fps={frames}/{duration}")])
            .arg(tmp.path().join("frame_%04d.jpeg")))?;
    } else {
        // Long video: seeking is much cheaper than decoding everything
        for i in 1..=10u32 {
            let seek = format!("{:.6}", duration * f64::from(i) / 11.0);
            run(Command::new("ffmpeg")
                .args(["-ss", &seek, "-i"])
                .arg(path)
                .args(["-vf", &format!("scale=-1:{height}"), "-vframes", "1"])
                .arg(tmp.path().join(format!("frame_{i:04}.jpeg"))))?;
        }
    }

    assemble_webp(tmp.path(), "frame_%04d.jpeg", 2)
}

/// Combine numbered frames in `dir` into a looping animated WebP.
fn assemble_webp(dir: &Path, pattern: &str, rate: u32) -> Result<Preview, BackendError> {
    let preview_path = dir.join("preview.webp");
    run(Command::new("ffmpeg")
        .args(["-r", &rate.to_string(), "-i"])
        .arg(dir.join(pattern))
        .args(["-loop", "0"])
        .arg(&preview_path))?;
    Ok(Preview {
        mime: "image/webp",
        bytes: std::fs::read(&preview_path)?,
    })
}

fn video_duration(path: &Path) -> Result<f64, BackendError> {
    let out = run(Command::new("ffprobe")
        .arg("-i")
        .arg(path)
        .args(["-show_entries", "format=duration", "-v", "quiet", "-of", "csv=p=0"]))?;
    let text = String::from_utf8_lossy(&out);
    let text = text.trim();
    text.parse().map_err(|e| {
        BackendError::ProcessingFailed(format!("unparsable video duration {text:?}: {e}"))
    })
}

#[derive(Deserialize)]
struct Probe {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Deserialize, Default)]
struct ProbeFormat {
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    creation_time: Option<DateTime<Utc>>,
}

fn video_creation_time(path: &Path) -> Result<Option<DateTime<Utc>>, BackendError> {
    let json = match read_sidecar(path) {
        Some(bytes) => bytes,
        None => run(Command::new("ffprobe")
            .args(["-v", "quiet"])
            .arg(path)
            .args(["-print_format", "json", "-show_format"]))?,
    };
    let probe: Probe = serde_json::from_slice(&json).map_err(|e| {
        BackendError::ProcessingFailed(format!("ffprobe output for {}: {e}", path.display()))
    })?;
    Ok(probe.format.tags.creation_time)
}

/// Pre-captured ffprobe output next to the video: `<stem>.JSON`, then
/// `<stem>.json`.
fn read_sidecar(path: &Path) -> Option<Vec<u8>> {
    for ext in ["JSON", "json"] {
        let sidecar: PathBuf = path.with_extension(ext);
        if let Ok(bytes) = std::fs::read(&sidecar) {
            return Some(bytes);
        }
    }
    None
}

fn run(cmd: &mut Command) -> Result<Vec<u8>, BackendError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(BackendError::ProcessingFailed(format!(
            "{program} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{ImageEncoder, RgbImage, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    /// Create a PNG with a transparent pixel so alpha survives the pipeline.
    fn create_test_png_with_alpha(path: &Path, width: u32, height: u32) {
        let mut img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        img.save(path).unwrap();
    }

    fn preview_dimensions(preview: &Preview) -> (u32, u32) {
        let img = image::load_from_memory(&preview.bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn still_downscales_to_target_height() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("photo.jpg");
        create_test_jpeg(&src, 400, 300);

        let backend = NativeBackend::new();
        let preview = backend
            .render_preview(&src, 150, Orientation::Identity)
            .unwrap();

        assert_eq!(preview.mime, "image/jpeg");
        assert_eq!(preview_dimensions(&preview), (200, 150));
    }

    #[test]
    fn still_shorter_than_target_is_letterboxed_as_png() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("small.jpg");
        create_test_jpeg(&src, 100, 40);

        let backend = NativeBackend::new();
        let preview = backend
            .render_preview(&src, 80, Orientation::Identity)
            .unwrap();

        // Padding is transparent, so the preview keeps alpha and becomes PNG
        assert_eq!(preview.mime, "image/png");
        assert_eq!(preview_dimensions(&preview), (100, 80));
    }

    #[test]
    fn still_at_exact_height_unchanged() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("exact.jpg");
        create_test_jpeg(&src, 123, 160);

        let backend = NativeBackend::new();
        let preview = backend
            .render_preview(&src, 160, Orientation::Identity)
            .unwrap();
        assert_eq!(preview_dimensions(&preview), (123, 160));
    }

    #[test]
    fn still_with_alpha_encodes_as_png() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("alpha.png");
        create_test_png_with_alpha(&src, 50, 200);

        let backend = NativeBackend::new();
        let preview = backend
            .render_preview(&src, 100, Orientation::Identity)
            .unwrap();
        assert_eq!(preview.mime, "image/png");
    }

    #[test]
    fn orientation_rotation_swaps_dimensions() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("sideways.jpg");
        create_test_jpeg(&src, 20, 40);

        let backend = NativeBackend::new();
        // 20x40 rotated 90° → 40x20, then scaled to height 10 → 20x10
        let preview = backend
            .render_preview(&src, 10, Orientation::Rotate90)
            .unwrap();
        assert_eq!(preview_dimensions(&preview), (20, 10));
    }

    #[test]
    fn undecodable_still_fails() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("broken.jpg");
        fs::write(&src, "definitely not a jpeg").unwrap();

        let backend = NativeBackend::new();
        let result = backend.render_preview(&src, 160, Orientation::Identity);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn unsupported_extension_fails() {
        let backend = NativeBackend::new();
        let result = backend.render_preview(Path::new("file.tiff"), 160, Orientation::Identity);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn metadata_plain_jpeg_is_empty() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("plain.jpg");
        create_test_jpeg(&src, 10, 10);

        let backend = NativeBackend::new();
        let info = backend.extract_metadata(&src).unwrap();
        assert_eq!(info, MediaInfo::default());
    }

    #[test]
    fn metadata_missing_jpeg_is_io_error() {
        let backend = NativeBackend::new();
        let result = backend.extract_metadata(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn metadata_png_is_empty_without_reading() {
        let backend = NativeBackend::new();
        // PNG has no metadata source; even a missing file yields defaults
        let info = backend.extract_metadata(Path::new("absent.png")).unwrap();
        assert_eq!(info, MediaInfo::default());
    }

    #[test]
    fn video_creation_time_from_sidecar() {
        let tmp = TempDir::new().unwrap();
        let video = tmp.path().join("clip.mp4");
        fs::write(&video, "fake video").unwrap();
        fs::write(
            tmp.path().join("clip.json"),
            r#"{"format":{"tags":{"creation_time":"2021-07-04T12:30:00.000000Z"}}}"#,
        )
        .unwrap();

        let backend = NativeBackend::new();
        let info = backend.extract_metadata(&video).unwrap();
        assert_eq!(
            info.created,
            Some(Utc.with_ymd_and_hms(2021, 7, 4, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn video_sidecar_uppercase_takes_precedence() {
        let tmp = TempDir::new().unwrap();
        let video = tmp.path().join("clip.webm");
        fs::write(&video, "fake video").unwrap();
        fs::write(
            tmp.path().join("clip.JSON"),
            r#"{"format":{"tags":{"creation_time":"2020-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();
        fs::write(
            tmp.path().join("clip.json"),
            r#"{"format":{"tags":{"creation_time":"2021-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();

        let backend = NativeBackend::new();
        let info = backend.extract_metadata(&video).unwrap();
        assert_eq!(
            info.created,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn video_sidecar_without_tags_is_none() {
        let tmp = TempDir::new().unwrap();
        let video = tmp.path().join("clip.mp4");
        fs::write(&video, "fake video").unwrap();
        fs::write(tmp.path().join("clip.json"), r#"{"format":{}}"#).unwrap();

        let backend = NativeBackend::new();
        let info = backend.extract_metadata(&video).unwrap();
        assert_eq!(info.created, None);
    }

    #[test]
    fn video_corrupt_sidecar_is_error() {
        let tmp = TempDir::new().unwrap();
        let video = tmp.path().join("clip.mp4");
        fs::write(&video, "fake video").unwrap();
        fs::write(tmp.path().join("clip.json"), "{ not json").unwrap();

        let backend = NativeBackend::new();
        let result = backend.extract_metadata(&video);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
