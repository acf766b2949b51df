//! Minimal EXIF parser for JPEG files.
//!
//! Extracts two things from the APP1 TIFF block:
//! - creation timestamp: DateTimeOriginal (Exif sub-IFD, tag 0x9003),
//!   falling back to DateTime (IFD0, tag 0x0132)
//! - Orientation (IFD0, tag 0x0112), returned as the raw tag value
//!
//! Zero external dependencies — pure Rust, ~150 lines. Tolerant by design:
//! any structural problem (not a JPEG, no APP1, truncated IFD) yields empty
//! data rather than an error, since most files simply carry no EXIF.

use chrono::{DateTime, NaiveDateTime, Utc};

/// EXIF fields extracted from a JPEG file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifData {
    pub date_time: Option<DateTime<Utc>>,
    /// Raw orientation tag value (1-8), if present.
    pub orientation: Option<u16>,
}

/// Parse EXIF data out of JPEG bytes.
pub fn read_exif(data: &[u8]) -> ExifData {
    let Some(tiff) = find_app1_tiff(data) else {
        return ExifData::default();
    };
    parse_tiff(tiff)
}

// ---------------------------------------------------------------------------
// JPEG: locate the APP1 / Exif segment
// ---------------------------------------------------------------------------

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Walk JPEG segments until the APP1 Exif segment; return its TIFF payload.
fn find_app1_tiff(data: &[u8]) -> Option<&[u8]> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Start-of-scan / end-of-image: no metadata segments past this
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            return None;
        }
        let segment = &data[pos + 4..pos + 2 + length];
        if marker == 0xE1 && segment.starts_with(EXIF_HEADER) {
            return Some(&segment[EXIF_HEADER.len()..]);
        }
        pos += 2 + length;
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF: IFD traversal
// ---------------------------------------------------------------------------

const TAG_ORIENTATION: u16 = 0x0112;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

fn parse_tiff(tiff: &[u8]) -> ExifData {
    let mut out = ExifData::default();
    let le = match tiff.get(..2) {
        Some(b"II") => true,
        Some(b"MM") => false,
        _ => return out,
    };
    if read_u16(tiff, 2, le) != Some(42) {
        return out;
    }
    let Some(ifd0) = read_u32(tiff, 4, le) else {
        return out;
    };

    let mut date_time = None;
    let mut date_time_original = None;
    let mut exif_ifd = None;

    for_each_entry(tiff, ifd0 as usize, le, |tag, typ, count, value_pos| {
        match tag {
            TAG_ORIENTATION => out.orientation = short_value(tiff, le, typ, count, value_pos),
            TAG_DATE_TIME => date_time = ascii_value(tiff, le, typ, count, value_pos),
            TAG_EXIF_IFD => exif_ifd = read_u32(tiff, value_pos, le),
            _ => {}
        }
    });

    if let Some(offset) = exif_ifd {
        for_each_entry(tiff, offset as usize, le, |tag, typ, count, value_pos| {
            if tag == TAG_DATE_TIME_ORIGINAL {
                date_time_original = ascii_value(tiff, le, typ, count, value_pos);
            }
        });
    }

    // First parsable timestamp wins: DateTimeOriginal, then DateTime
    out.date_time = date_time_original
        .as_deref()
        .and_then(parse_exif_timestamp)
        .or_else(|| date_time.as_deref().and_then(parse_exif_timestamp));
    out
}

/// Visit each 12-byte entry of the IFD at `offset`.
/// The callback receives (tag, type, count, position-of-value-field).
fn for_each_entry(tiff: &[u8], offset: usize, le: bool, mut f: impl FnMut(u16, u16, u32, usize)) {
    let Some(count) = read_u16(tiff, offset, le) else {
        return;
    };
    for i in 0..count as usize {
        let entry = offset + 2 + i * 12;
        let (Some(tag), Some(typ), Some(value_count)) = (
            read_u16(tiff, entry, le),
            read_u16(tiff, entry + 2, le),
            read_u32(tiff, entry + 4, le),
        ) else {
            return;
        };
        f(tag, typ, value_count, entry + 8);
    }
}

/// Read an ASCII-typed value, inline or via offset depending on length.
fn ascii_value(tiff: &[u8], le: bool, typ: u16, count: u32, value_pos: usize) -> Option<String> {
    if typ != 2 {
        return None;
    }
    let len = count as usize;
    let start = if len <= 4 {
        value_pos
    } else {
        read_u32(tiff, value_pos, le)? as usize
    };
    let bytes = tiff.get(start..start.checked_add(len)?)?;
    let text = bytes.split(|&b| b == 0).next()?;
    Some(String::from_utf8_lossy(text).trim().to_string())
}

/// Read a SHORT-typed value (always inline; two bytes fit the value field).
fn short_value(tiff: &[u8], le: bool, typ: u16, count: u32, value_pos: usize) -> Option<u16> {
    if typ != 3 || count == 0 {
        return None;
    }
    read_u16(tiff, value_pos, le)
}

/// Parse the `YYYY:MM:DD HH:MM:SS` EXIF timestamp format.
fn parse_exif_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn read_u16(data: &[u8], pos: usize, le: bool) -> Option<u16> {
    let bytes = [*data.get(pos)?, *data.get(pos + 1)?];
    Some(if le {
        u16::from_le_bytes(bytes)
    } else {
        u16::from_be_bytes(bytes)
    })
}

fn read_u32(data: &[u8], pos: usize, le: bool) -> Option<u32> {
    let bytes = [
        *data.get(pos)?,
        *data.get(pos + 1)?,
        *data.get(pos + 2)?,
        *data.get(pos + 3)?,
    ];
    Some(if le {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}
