//! Container format identification.

use serde::Serialize;

/// Containers the extractor understands.
///
/// The caller names the container via a hint string (typically the file
/// extension); the reader then validates the container signature before
/// walking it. Anything outside the three supported containers maps to
/// `Unknown` and produces an empty result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaFormat {
    Png,
    Jpeg,
    WebP,
    Unknown,
}

impl MetaFormat {
    /// Map a format hint (case-insensitive) to a container format.
    ///
    /// Recognized hints: `png`, `jpg`, `jpeg` (plus the `jpe`/`jfif`
    /// aliases), `webp`. Everything else is `Unknown`.
    pub fn from_hint(hint: &str) -> Self {
        match hint.to_lowercase().as_str() {
            "png" => MetaFormat::Png,
            "jpg" | "jpeg" | "jpe" | "jfif" => MetaFormat::Jpeg,
            "webp" => MetaFormat::WebP,
            _ => MetaFormat::Unknown,
        }
    }

    /// Lowercase format name as it appears in the result record.
    pub fn as_str(self) -> &'static str {
        match self {
            MetaFormat::Png => "png",
            MetaFormat::Jpeg => "jpeg",
            MetaFormat::WebP => "webp",
            MetaFormat::Unknown => "unknown",
        }
    }

    /// Check the container signature at the head of `data`.
    ///
    /// `Unknown` never matches. A hint whose signature fails yields an
    /// empty record rather than an error.
    pub fn signature_matches(self, data: &[u8]) -> bool {
        match self {
            // PNG: 89 50 4E 47 0D 0A 1A 0A
            MetaFormat::Png => data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),

            // JPEG: SOI marker FF D8
            MetaFormat::Jpeg => data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8,

            // WebP: "RIFF" at 0, "WEBP" at 8
            MetaFormat::WebP => {
                data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
            }

            MetaFormat::Unknown => false,
        }
    }
}
