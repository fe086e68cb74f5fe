//! EXIF TIFF sub-parser.
//!
//! Reads just enough of the TIFF IFD structure to pull the four
//! text-bearing tags SD tools write into: ImageDescription, UserComment
//! (via the Exif sub-IFD), XPComment and XPTitle. Both byte orders are
//! supported; every read is bounds-checked and failure means the tag is
//! simply absent.

use log::trace;

use crate::decoding::{
    decode_user_comment, repair_utf16_misdecode, NulStats, TextEncoding,
};

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;
const TAG_XP_TITLE: u16 = 0x9C9B;
const TAG_XP_COMMENT: u16 = 0x9C9C;

/// Decoded text tags from one EXIF block.
#[derive(Debug, Default)]
pub(crate) struct ExifTexts {
    pub image_description: Option<String>,
    pub user_comment: Option<String>,
    pub xp_comment: Option<String>,
    pub xp_title: Option<String>,
}

impl ExifTexts {
    pub fn is_empty(&self) -> bool {
        self.image_description.is_none()
            && self.user_comment.is_none()
            && self.xp_comment.is_none()
            && self.xp_title.is_none()
    }

    /// Tag texts in selection-priority order (UserComment first — it is
    /// where A1111 writes the parameter block).
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        [
            self.user_comment.as_deref(),
            self.image_description.as_deref(),
            self.xp_comment.as_deref(),
            self.xp_title.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endian {
    Le,
    Be,
}

/// Bounds-checked view over the TIFF block. All offsets are relative to
/// the byte after `Exif\0\0`.
struct Tiff<'a> {
    data: &'a [u8],
    endian: Endian,
}

impl<'a> Tiff<'a> {
    fn u16_at(&self, off: usize) -> Option<u16> {
        let b = self.data.get(off..off + 2)?;
        Some(match self.endian {
            Endian::Le => u16::from_le_bytes([b[0], b[1]]),
            Endian::Be => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    fn u32_at(&self, off: usize) -> Option<u32> {
        let b = self.data.get(off..off + 4)?;
        Some(match self.endian {
            Endian::Le => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            Endian::Be => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    fn bytes_at(&self, off: usize, len: usize) -> Option<&'a [u8]> {
        self.data.get(off..off.checked_add(len)?)
    }
}

/// Byte width of a TIFF field type.
fn type_size(field_type: u16) -> usize {
    match field_type {
        1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => 2,         // SHORT, SSHORT
        4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
        5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
        _ => 1,
    }
}

/// Parse an EXIF payload (starting with `Exif\0\0`) into its text tags.
pub(crate) fn parse_exif(payload: &[u8]) -> ExifTexts {
    let mut texts = ExifTexts::default();
    let Some(tiff_bytes) = payload.strip_prefix(EXIF_PREFIX) else {
        return texts;
    };

    let endian = match tiff_bytes.get(..2) {
        Some(b"II") => Endian::Le,
        Some(b"MM") => Endian::Be,
        _ => return texts,
    };
    let tiff = Tiff {
        data: tiff_bytes,
        endian,
    };
    if tiff.u16_at(2) != Some(42) {
        return texts;
    }
    let Some(ifd0) = tiff.u32_at(4) else {
        return texts;
    };

    read_ifd(&tiff, ifd0 as usize, &mut texts, true);
    texts
}

/// Read one IFD's entries. `follow_sub` limits Exif sub-IFD recursion to
/// a single hop from IFD0.
fn read_ifd(tiff: &Tiff<'_>, offset: usize, texts: &mut ExifTexts, follow_sub: bool) {
    let Some(count) = tiff.u16_at(offset) else {
        return;
    };

    for i in 0..count as usize {
        let base = offset + 2 + i * 12;
        let (Some(tag), Some(field_type), Some(value_count)) = (
            tiff.u16_at(base),
            tiff.u16_at(base + 2),
            tiff.u32_at(base + 4),
        ) else {
            return;
        };

        match tag {
            TAG_EXIF_IFD if follow_sub => {
                // Endian-aware pointer read, like every other offset.
                if let Some(sub) = tiff.u32_at(base + 8) {
                    trace!("exif sub-ifd at {sub:#x}");
                    read_ifd(tiff, sub as usize, texts, false);
                }
            }
            TAG_IMAGE_DESCRIPTION | TAG_USER_COMMENT | TAG_XP_COMMENT | TAG_XP_TITLE => {
                let Some(value) = entry_value(tiff, base, field_type, value_count) else {
                    continue;
                };
                let decoded = match tag {
                    TAG_IMAGE_DESCRIPTION => decode_description(value),
                    TAG_USER_COMMENT => decode_user_comment(value),
                    _ => decode_xp_text(value),
                };
                let Some(decoded) = decoded.map(|s| repair_utf16_misdecode(&s)) else {
                    continue;
                };
                let slot = match tag {
                    TAG_IMAGE_DESCRIPTION => &mut texts.image_description,
                    TAG_USER_COMMENT => &mut texts.user_comment,
                    TAG_XP_COMMENT => &mut texts.xp_comment,
                    _ => &mut texts.xp_title,
                };
                if slot.is_none() {
                    *slot = Some(decoded);
                }
            }
            _ => {}
        }
    }
}

/// Raw bytes of an entry value: inline when it fits the 4-byte field,
/// otherwise at the pointed-to offset.
fn entry_value<'a>(
    tiff: &Tiff<'a>,
    entry_base: usize,
    field_type: u16,
    count: u32,
) -> Option<&'a [u8]> {
    let len = type_size(field_type).checked_mul(count as usize)?;
    if len <= 4 {
        tiff.bytes_at(entry_base + 8, len)
    } else {
        let offset = tiff.u32_at(entry_base + 8)? as usize;
        tiff.bytes_at(offset, len)
    }
}

// ---------------------------------------------------------------------------
// Tag decoders
// ---------------------------------------------------------------------------

/// ImageDescription: nominally ASCII, but tools write UTF-16 (with or
/// without BOM) and Shift_JIS into it.
fn decode_description(bytes: &[u8]) -> Option<String> {
    let trimmed = trim_trailing_nuls(bytes);
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix(&[0xFE, 0xFF][..]) {
        return Some(TextEncoding::Utf16Be.decode_lossy(rest));
    }
    if let Some(rest) = trimmed.strip_prefix(&[0xFF, 0xFE][..]) {
        return Some(TextEncoding::Utf16Le.decode_lossy(rest));
    }
    let stats = NulStats::of(trimmed);
    if stats.utf16_likely() {
        return Some(stats.preferred_utf16().decode_lossy(trimmed));
    }
    if let Some(text) = TextEncoding::Utf8.decode_strict(trimmed) {
        return Some(text);
    }
    // UTF-8 had errors; Shift_JIS is the usual culprit.
    Some(TextEncoding::ShiftJis.decode_lossy(trimmed))
}

/// XPComment / XPTitle: a BYTE array holding UTF-16LE, NUL padded.
fn decode_xp_text(bytes: &[u8]) -> Option<String> {
    let text = TextEncoding::Utf16Le.decode_lossy(trim_trailing_nuls(bytes));
    let text = text.trim_end_matches('\0');
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == 0 {
        end -= 1;
    }
    &bytes[..end]
}
