//! Result record and pipeline candidate types.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::MetaFormat;

/// Generation metadata extracted from one image.
///
/// `raw` preserves the exact decoded text of every source the container
/// yielded, keyed by its container-defined name (PNG chunk keys; `EXIF`,
/// `XMP`, `Comment` and a synthetic `parameters` for JPEG/WebP). `fields`
/// is the normalized view: prompt, negative prompt and settings keys from
/// an A1111 block, plus sampler parameters resolved from a ComfyUI graph.
///
/// Both maps are empty when the container is unrecognized or carries no
/// metadata; extraction never fails.
#[derive(Clone, Debug, Serialize)]
pub struct ImageMeta {
    /// Container the bytes were parsed as.
    pub format: MetaFormat,
    /// Normalized fields; values are strings, numbers, booleans, arrays
    /// or nested objects (`<key>_json` entries hold parsed JSON).
    pub fields: BTreeMap<String, Value>,
    /// Source-keyed original text, byte-for-byte as decoded.
    pub raw: BTreeMap<String, String>,
}

impl ImageMeta {
    /// Empty record for a format.
    pub(crate) fn empty(format: MetaFormat) -> Self {
        Self {
            format,
            fields: BTreeMap::new(),
            raw: BTreeMap::new(),
        }
    }
}

/// Where a candidate parameter text came from.
///
/// Order doubles as the selector tie-break: when two candidates score the
/// same, the earlier variant wins (EXIF text is the most trustworthy
/// carrier, a free-form JPEG comment the least).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum TextSource {
    Exif,
    XmpAttribute,
    XmpText,
    JpegComment,
}

/// A parameter-text candidate flowing through selection.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub source: TextSource,
    pub text: String,
}

impl Candidate {
    pub fn new(source: TextSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }
}
