//! # sdmeta
//!
//! Extraction of Stable-Diffusion generation metadata (prompts, sampler
//! settings, workflow graphs) from PNG, JPEG and WebP files.
//!
//! ## Overview
//!
//! sdmeta reads the metadata side-channels SD tools write into:
//! - **PNG** text chunks (`tEXt`, `zTXt`, `iTXt`)
//! - **JPEG** APP1 EXIF, APP1 XMP (standard + Extended), and COM segments
//! - **WebP** RIFF `EXIF` and `XMP ` chunks
//!
//! Payload text arrives in whatever encoding the producing tool chose;
//! a scoring decoder panel covers Latin-1, UTF-8, UTF-16 and Shift_JIS.
//! When normal extraction comes up empty or garbled, a recovery layer
//! re-scans the file for UTF-16 parameter text and embedded JSON.
//!
//! Extraction never fails: any input yields an [`ImageMeta`], possibly
//! with empty maps. The caller supplies the bytes and a format hint; no
//! I/O happens here.
//!
//! ## Usage
//!
//! ```no_run
//! let data: &[u8] = &[]; // your image bytes
//! let meta = sdmeta::parse_image_meta(data, "png");
//! if let Some(prompt) = meta.fields.get("prompt") {
//!     println!("prompt: {prompt}");
//! }
//! ```
//!
//! ### Controlling extraction
//!
//! ```no_run
//! use sdmeta::{ExtractRequest, MetaFormat};
//!
//! let data: &[u8] = &[]; // your image bytes
//! let meta = ExtractRequest::new(data)
//!     .with_format(MetaFormat::Jpeg)
//!     .with_recovery(false) // container parsing only
//!     .extract();
//! println!("{}", meta.format.as_str());
//! ```
//!
//! ## What this crate does NOT do
//!
//! - **No pixel decoding**: dimensions, thumbnails and color are out of
//!   scope. Use an image codec crate.
//! - **No writing**: extraction only.
//! - **No format sniffing**: the caller names the container; only its
//!   signature is validated.

#![forbid(unsafe_code)]

mod a1111;
mod comfy;
mod decoding;
mod exif;
mod format;
mod jpeg;
mod meta;
mod normalize;
mod png;
mod recover;
mod webp;
mod xmp;

pub use format::MetaFormat;
pub use meta::ImageMeta;

use std::collections::BTreeMap;

use log::debug;

use meta::{Candidate, TextSource};

/// Extract generation metadata from an image buffer.
///
/// `format_hint` is typically the file extension: `png`, `jpg`, `jpeg`
/// or `webp`, case-insensitive. Anything else yields an empty record
/// with format `unknown`.
pub fn parse_image_meta(data: &[u8], format_hint: &str) -> ImageMeta {
    ExtractRequest::new(data).with_format_hint(format_hint).extract()
}

/// Metadata extraction request builder.
///
/// # Example
///
/// ```no_run
/// use sdmeta::ExtractRequest;
///
/// let data: &[u8] = &[]; // your image bytes
/// let meta = ExtractRequest::new(data).with_format_hint("webp").extract();
/// # let _ = meta;
/// ```
pub struct ExtractRequest<'a> {
    data: &'a [u8],
    format: MetaFormat,
    recovery: bool,
}

impl<'a> ExtractRequest<'a> {
    /// Create a request. Without a format the result is `unknown`/empty;
    /// recovery is enabled by default.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            format: MetaFormat::Unknown,
            recovery: true,
        }
    }

    /// Set the container format directly.
    pub fn with_format(mut self, format: MetaFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the container format from a hint string (see
    /// [`MetaFormat::from_hint`]).
    pub fn with_format_hint(mut self, hint: &str) -> Self {
        self.format = MetaFormat::from_hint(hint);
        self
    }

    /// Enable or disable the recovery layer.
    ///
    /// Recovery re-scans the whole file when standard extraction finds
    /// no parameter block (or a garbled one). It is the only part of
    /// extraction that is more than a single pass over the container.
    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.recovery = enabled;
        self
    }

    /// Run the extraction. Never fails; degraded inputs degrade to
    /// emptier maps.
    pub fn extract(self) -> ImageMeta {
        let raw = match self.format {
            MetaFormat::Png => self.collect_png(),
            MetaFormat::Jpeg => self.collect_jpeg(),
            MetaFormat::WebP => self.collect_webp(),
            MetaFormat::Unknown => return ImageMeta::empty(MetaFormat::Unknown),
        };
        let Some(mut raw) = raw else {
            // Signature mismatch: empty record, no recovery pass.
            return ImageMeta::empty(self.format);
        };

        if self.recovery && needs_recovery(&raw) {
            if let Some(block) = recover::recover(self.data) {
                raw.insert("parameters".to_string(), block);
            }
        }

        let fields = normalize::normalize(&raw);
        ImageMeta {
            format: self.format,
            fields,
            raw,
        }
    }

    /// PNG: the chunk map is the raw map.
    fn collect_png(&self) -> Option<BTreeMap<String, String>> {
        if !MetaFormat::Png.signature_matches(self.data) {
            return None;
        }
        Some(png::read_text_chunks(self.data))
    }

    /// JPEG: synthesize `EXIF`/`XMP`/`Comment` entries and select the
    /// best A1111 block across all candidate sources.
    fn collect_jpeg(&self) -> Option<BTreeMap<String, String>> {
        if !MetaFormat::Jpeg.signature_matches(self.data) {
            return None;
        }
        let segments = jpeg::read_segments(self.data);

        let mut raw = BTreeMap::new();
        let mut candidates = Vec::new();

        if let Some(payload) = &segments.exif {
            let texts = exif::parse_exif(payload);
            if let Some(first) = texts.texts().next() {
                raw.insert("EXIF".to_string(), first.to_string());
            }
            for text in texts.texts() {
                candidates.push(Candidate::new(TextSource::Exif, text));
            }
        }
        collect_xmp_candidates(segments.xmp.as_deref(), &mut raw, &mut candidates);
        if let Some(comment) = &segments.comment {
            raw.insert("Comment".to_string(), comment.clone());
            candidates.push(Candidate::new(TextSource::JpegComment, comment.clone()));
        }

        select_into(&mut raw, &candidates);
        Some(raw)
    }

    /// WebP: like JPEG minus the comment segment.
    fn collect_webp(&self) -> Option<BTreeMap<String, String>> {
        if !MetaFormat::WebP.signature_matches(self.data) {
            return None;
        }
        let chunks = webp::read_chunks(self.data);

        let mut raw = BTreeMap::new();
        let mut candidates = Vec::new();

        if let Some(payload) = &chunks.exif {
            let texts = exif::parse_exif(payload);
            if let Some(first) = texts.texts().next() {
                raw.insert("EXIF".to_string(), first.to_string());
            }
            for text in texts.texts() {
                candidates.push(Candidate::new(TextSource::Exif, text));
            }
        }
        collect_xmp_candidates(chunks.xmp.as_deref(), &mut raw, &mut candidates);

        select_into(&mut raw, &candidates);
        Some(raw)
    }
}

/// Register XMP text and its parameter attributes as candidates.
fn collect_xmp_candidates(
    xmp: Option<&str>,
    raw: &mut BTreeMap<String, String>,
    candidates: &mut Vec<Candidate>,
) {
    let Some(xmp) = xmp else {
        return;
    };
    raw.insert("XMP".to_string(), xmp.to_string());
    for (key, value) in xmp::parameter_attributes(xmp) {
        debug!("xmp attribute candidate: {key}");
        candidates.push(Candidate::new(TextSource::XmpAttribute, value));
    }
    candidates.push(Candidate::new(TextSource::XmpText, xmp));
}

/// Run selection and store the winner as the synthetic `parameters`.
fn select_into(raw: &mut BTreeMap<String, String>, candidates: &[Candidate]) {
    if let Some((source, block)) = a1111::select_parameters(candidates) {
        debug!("selected parameters from {source:?}");
        raw.insert("parameters".to_string(), block);
    }
}

/// Recovery runs when no parameters were selected, or the selected text
/// looks like a failed decode.
fn needs_recovery(raw: &BTreeMap<String, String>) -> bool {
    match raw.get("parameters") {
        None => true,
        Some(block) => decoding::looks_garbled(block),
    }
}

// ---------------------------------------------------------------------------
