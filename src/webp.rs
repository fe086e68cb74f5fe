//! WebP RIFF chunk reader.
//!
//! Walks the RIFF chunk list for `EXIF` and `XMP ` chunks. WebP stores
//! the EXIF payload bare (TIFF header first); the `Exif\0\0` prefix is
//! restored before the payload reaches the TIFF parser.

use crate::decoding::decode_xmp_text;
use crate::MetaFormat;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Metadata chunks pulled from a WebP container.
#[derive(Debug, Default)]
pub(crate) struct WebpChunks {
    /// EXIF payload, `Exif\0\0` prefix restored when missing.
    pub exif: Option<Vec<u8>>,
    /// Decoded `XMP ` chunk.
    pub xmp: Option<String>,
}

/// Walk the RIFF chunks of a WebP buffer.
pub(crate) fn read_chunks(data: &[u8]) -> WebpChunks {
    let mut chunks = WebpChunks::default();
    if !MetaFormat::WebP.signature_matches(data) {
        return chunks;
    }

    let mut pos = 12;
    while pos + 8 <= data.len() {
        let tag = &data[pos..pos + 4];
        let size = u32::from_le_bytes([
            data[pos + 4],
            data[pos + 5],
            data[pos + 6],
            data[pos + 7],
        ]) as usize;
        pos += 8;
        if pos + size > data.len() {
            break;
        }
        let body = &data[pos..pos + size];
        // Chunks are padded to even length.
        pos += size + (size & 1);

        match tag {
            b"EXIF" => {
                let payload = if body.starts_with(EXIF_PREFIX) {
                    body.to_vec()
                } else {
                    let mut prefixed = EXIF_PREFIX.to_vec();
                    prefixed.extend_from_slice(body);
                    prefixed
                };
                chunks.exif = Some(payload);
            }
            b"XMP " => {
                chunks.xmp = decode_xmp_text(body);
            }
            _ => {}
        }
    }

    chunks
}
