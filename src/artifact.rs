//! The persisted gallery artifact: a self-describing HTML document.
//!
//! One file serves two readers. A browser sees a plain page of hyperlinked
//! inline previews. The next `galpage` run sees a cache: the header line
//! carries the generation config, and every entry line carries the media
//! metadata it was built from, both as base64-encoded JSON attributes.
//!
//! ```text
//! <html data-magic="galpage" data-gallery="eyJoZWlnaHQi...">
//! <body>
//! <a href="photos/IMG_6189.JPG" target="_blank"><img src="data:image/jpeg;base64,..." title="IMG_6189.JPG; 2021-07-04 12:30:00" data-media="eyJmaWxlX3Npe..."/></a>
//! </body>
//! </html>
//! ```
//!
//! Encoding is deterministic: the same items and config always produce the
//! same bytes, which is what lets the driver skip rewriting an unchanged
//! gallery. Decoding is line-oriented and deliberately narrow: only the
//! `<html …>` header and `<a …>…</a>` entry lines are structural, anything
//! else is ignored. It is strict about those lines, though. A malformed tag,
//! a missing or repeated magic marker, or an undecodable blob is a hard
//! error rather than a silently shorter gallery.
//!
//! The tag parser is hand-rolled: the grammar is a single flat tag with
//! double-quoted attributes, which does not justify an XML dependency.

use crate::config::GalleryConfig;
use crate::types::{MediaItem, MediaMeta};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// Marker distinguishing generated galleries from arbitrary HTML files.
const MAGIC: &str = "galpage";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("gallery header line missing")]
    MissingHeader,
    #[error("gallery header appeared multiple times")]
    DuplicateHeader,
    #[error("missing magic marker")]
    MissingMagic,
    #[error("malformed gallery markup: {0}")]
    Malformed(String),
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("metadata JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid path encoding: {0}")]
    PathEncoding(#[from] std::string::FromUtf8Error),
}

/// A decoded artifact: the persisted config plus its items, in file order.
#[derive(Debug)]
pub struct Artifact {
    pub config: GalleryConfig,
    pub items: Vec<MediaItem>,
}

/// Encode items and config into the artifact document.
///
/// Items without a preview are omitted, so a failed preview render never
/// leaves a broken entry in the page. Byte-for-byte deterministic for the
/// same inputs.
pub fn encode(items: &[MediaItem], config: &GalleryConfig) -> Result<String, ArtifactError> {
    let mut out = String::new();
    let config_blob = BASE64.encode(serde_json::to_vec(config)?);
    out.push_str(&format!(
        "<html data-magic=\"{MAGIC}\" data-gallery=\"{config_blob}\">\n"
    ));
    out.push_str("<body>\n");

    for item in items.iter().filter(|i| i.has_preview()) {
        let href = escape_html(&encode_path(&item.path));
        let title = escape_html(&format!(
            "{}; {}",
            item.file_name(),
            item.effective_timestamp().format("%Y-%m-%d %H:%M:%S")
        ));
        let media_blob = BASE64.encode(serde_json::to_vec(&item.meta)?);
        out.push_str(&format!(
            "<a href=\"{href}\" target=\"_blank\"><img src=\"{}\" title=\"{title}\" data-media=\"{media_blob}\"/></a>\n",
            item.preview_src
        ));
    }

    out.push_str("</body>\n</html>\n");
    Ok(out)
}

/// Decode an artifact document back into config and items.
pub fn decode(text: &str) -> Result<Artifact, ArtifactError> {
    let mut config = None;
    let mut headers = 0usize;
    let mut items = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("<html") && line.ends_with('>') {
            headers += 1;
            if headers > 1 {
                return Err(ArtifactError::DuplicateHeader);
            }
            config = Some(decode_header(line)?);
        } else if line.starts_with("<a ") && line.ends_with("</a>") {
            items.push(decode_entry(line)?);
        }
    }

    match config {
        Some(config) => Ok(Artifact { config, items }),
        None => Err(ArtifactError::MissingHeader),
    }
}

fn decode_header(line: &str) -> Result<GalleryConfig, ArtifactError> {
    let (tag, rest) = parse_tag(line)?;
    if tag.name != "html" || tag.self_closing || !rest.is_empty() {
        return Err(ArtifactError::Malformed(line.to_string()));
    }
    if tag.attr("data-magic") != Some(MAGIC) {
        return Err(ArtifactError::MissingMagic);
    }
    match tag.attr("data-gallery") {
        Some(blob) => Ok(serde_json::from_slice(&BASE64.decode(blob)?)?),
        None => Ok(GalleryConfig::default()),
    }
}

fn decode_entry(line: &str) -> Result<MediaItem, ArtifactError> {
    let malformed = || ArtifactError::Malformed(line.to_string());

    let (anchor, rest) = parse_tag(line)?;
    if anchor.name != "a" || anchor.self_closing {
        return Err(malformed());
    }
    let (img, rest) = parse_tag(rest.trim_start())?;
    if img.name != "img" || !img.self_closing || rest.trim() != "</a>" {
        return Err(malformed());
    }

    let href = anchor.attr("href").ok_or_else(malformed)?;
    let path = urlencoding::decode(&unescape_html(href, line)?)?.into_owned();
    let preview_src = unescape_html(img.attr("src").ok_or_else(malformed)?, line)?;
    let media_blob = img.attr("data-media").ok_or_else(malformed)?;
    let meta: MediaMeta = serde_json::from_slice(&BASE64.decode(media_blob)?)?;

    Ok(MediaItem {
        path,
        meta,
        preview_src,
    })
}

/// A parsed opening tag: name plus attribute list.
struct Tag<'a> {
    name: &'a str,
    attrs: Vec<(&'a str, &'a str)>,
    self_closing: bool,
}

impl<'a> Tag<'a> {
    fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

/// Parse one tag at the start of `s`, returning it and the remaining input.
///
/// Grammar: `<name( attr="value")*(/)?>`. Attribute values are double-quoted
/// and may contain entity references but no raw quotes.
fn parse_tag(s: &str) -> Result<(Tag<'_>, &str), ArtifactError> {
    let malformed = || ArtifactError::Malformed(s.to_string());
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return Err(malformed());
    }

    let mut i = 1;
    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == name_start {
        return Err(malformed());
    }
    let name = &s[name_start..i];

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        match bytes.get(i) {
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            Some(_) => {
                let attr_start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
                    i += 1;
                }
                if i == attr_start || bytes.get(i) != Some(&b'=') {
                    return Err(malformed());
                }
                let attr_name = &s[attr_start..i];
                i += 1;
                if bytes.get(i) != Some(&b'"') {
                    return Err(malformed());
                }
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(malformed());
                }
                attrs.push((attr_name, &s[value_start..i]));
                i += 1;
            }
            None => return Err(malformed()),
        }
    }

    Ok((
        Tag {
            name,
            attrs,
            self_closing,
        },
        &s[i..],
    ))
}

/// Percent-encode a slash path, segment by segment, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(s: &str, line: &str) -> Result<String, ArtifactError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let entity_end = rest
            .find(';')
            .ok_or_else(|| ArtifactError::Malformed(line.to_string()))?;
        match &rest[..=entity_end] {
            "&amp;" => out.push('&'),
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" | "&#34;" => out.push('"'),
            "&#39;" | "&apos;" => out.push('\''),
            _ => return Err(ArtifactError::Malformed(line.to_string())),
        }
        rest = &rest[entity_end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
