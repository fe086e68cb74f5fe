//! JPEG marker-segment reader.
//!
//! Walks the marker stream collecting the APP1 EXIF payload, standard and
//! Extended XMP fragments, and the first COM comment. Extended XMP spans
//! multiple APP1 segments keyed by GUID; fragments are reassembled in
//! offset order and truncated to the declared total before decoding.

use std::collections::BTreeMap;

use log::debug;

use crate::decoding::{decode_best_effort, decode_xmp_text};
use crate::MetaFormat;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXT_PREFIX: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";

/// Metadata-bearing payloads pulled from the marker stream.
#[derive(Debug, Default)]
pub(crate) struct JpegSegments {
    /// EXIF APP1 payload, including the `Exif\0\0` header.
    pub exif: Option<Vec<u8>>,
    /// Standard XMP followed by reassembled Extended XMP, decoded.
    pub xmp: Option<String>,
    /// First COM segment, best-effort decoded.
    pub comment: Option<String>,
}

/// One Extended XMP packet under reassembly.
#[derive(Debug)]
struct XmpAssembly {
    /// Declared total length of the full packet.
    total: usize,
    /// Fragment payloads keyed by declared offset.
    chunks: BTreeMap<u32, Vec<u8>>,
}

impl XmpAssembly {
    /// Concatenate fragments in ascending offset order, clamped to the
    /// declared total.
    fn assemble(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for chunk in self.chunks.values() {
            buf.extend_from_slice(chunk);
        }
        buf.truncate(self.total);
        buf
    }
}

/// Walk the marker stream of a JPEG buffer.
///
/// Terminates on EOI, SOS, or any malformed segment, keeping whatever was
/// collected up to that point.
pub(crate) fn read_segments(data: &[u8]) -> JpegSegments {
    let mut segs = JpegSegments::default();
    if !MetaFormat::Jpeg.signature_matches(data) {
        return segs;
    }

    let mut std_xmp: Vec<&[u8]> = Vec::new();
    let mut extended: BTreeMap<String, XmpAssembly> = BTreeMap::new();

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            // Lost marker sync.
            break;
        }
        // Fill bytes before the marker.
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            break;
        }
        let marker = data[pos + 1];
        pos += 2;

        // EOI, or SOS: entropy-coded data follows, nothing left to read.
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        // Stuffed bytes, TEM and restart markers carry no length.
        if marker == 0x00 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        if pos + 2 > data.len() {
            break;
        }
        let seg_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if seg_len < 2 || pos + seg_len > data.len() {
            break;
        }
        let payload = &data[pos + 2..pos + seg_len];
        pos += seg_len;

        match marker {
            0xE1 => read_app1(payload, &mut segs, &mut std_xmp, &mut extended),
            0xFE => {
                if segs.comment.is_none() {
                    segs.comment = decode_best_effort(payload);
                }
            }
            _ => {}
        }
    }

    // Standard fragments first, then each GUID's reassembled packet.
    let mut xmp_text = String::new();
    for frag in std_xmp {
        if let Some(text) = decode_xmp_text(frag) {
            xmp_text.push_str(&text);
        }
    }
    for (guid, assembly) in &extended {
        let bytes = assembly.assemble();
        debug!(
            "extended xmp {guid}: {} bytes from {} fragments",
            bytes.len(),
            assembly.chunks.len()
        );
        if let Some(text) = decode_xmp_text(&bytes) {
            xmp_text.push_str(&text);
        }
    }
    if !xmp_text.is_empty() {
        segs.xmp = Some(xmp_text);
    }

    segs
}

/// Classify an APP1 payload by its namespace prefix.
fn read_app1<'a>(
    payload: &'a [u8],
    segs: &mut JpegSegments,
    std_xmp: &mut Vec<&'a [u8]>,
    extended: &mut BTreeMap<String, XmpAssembly>,
) {
    if payload.starts_with(EXIF_PREFIX) {
        // Later EXIF APP1 wins; writers that emit two put the real one last.
        segs.exif = Some(payload.to_vec());
    } else if payload.starts_with(XMP_PREFIX) {
        std_xmp.push(&payload[XMP_PREFIX.len()..]);
    } else if payload.starts_with(XMP_EXT_PREFIX) {
        read_extended_xmp(&payload[XMP_EXT_PREFIX.len()..], extended);
    }
}

/// Extended XMP fragment: 32-byte ASCII GUID, u32be total, u32be offset,
/// then the fragment payload.
fn read_extended_xmp(body: &[u8], extended: &mut BTreeMap<String, XmpAssembly>) {
    if body.len() < 40 {
        return;
    }
    let guid = String::from_utf8_lossy(&body[..32]).into_owned();
    let total = u32::from_be_bytes([body[32], body[33], body[34], body[35]]) as usize;
    let offset = u32::from_be_bytes([body[36], body[37], body[38], body[39]]);
    let payload = body[40..].to_vec();

    let assembly = extended.entry(guid).or_insert_with(|| XmpAssembly {
        total,
        chunks: BTreeMap::new(),
    });
    assembly.chunks.insert(offset, payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn jpeg(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        for s in segments {
            out.extend_from_slice(s);
        }
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn ext_xmp_segment(guid: &str, total: u32, offset: u32, payload: &[u8]) -> Vec<u8> {
        let mut body = XMP_EXT_PREFIX.to_vec();
        body.extend_from_slice(guid.as_bytes());
        body.extend_from_slice(&total.to_be_bytes());
        body.extend_from_slice(&offset.to_be_bytes());
        body.extend_from_slice(payload);
        segment(0xE1, &body)
    }

    #[test]
    fn exif_payload_captured() {
        let mut body = EXIF_PREFIX.to_vec();
        body.extend_from_slice(b"II*\x00\x08\x00\x00\x00\x00\x00");
        let data = jpeg(&[segment(0xE1, &body)]);
        let segs = read_segments(&data);
        assert_eq!(segs.exif.as_deref(), Some(body.as_slice()));
    }

    #[test]
    fn later_exif_overwrites() {
        let mut first = EXIF_PREFIX.to_vec();
        first.extend_from_slice(b"old");
        let mut second = EXIF_PREFIX.to_vec();
        second.extend_from_slice(b"new");
        let data = jpeg(&[segment(0xE1, &first), segment(0xE1, &second)]);
        let segs = read_segments(&data);
        assert_eq!(segs.exif.as_deref(), Some(second.as_slice()));
    }

    #[test]
    fn standard_xmp_decoded() {
        let mut body = XMP_PREFIX.to_vec();
        body.extend_from_slice(b"<x:xmpmeta>hello</x:xmpmeta>");
        let data = jpeg(&[segment(0xE1, &body)]);
        let segs = read_segments(&data);
        assert_eq!(segs.xmp.as_deref(), Some("<x:xmpmeta>hello</x:xmpmeta>"));
    }

    #[test]
    fn extended_xmp_reassembled_in_offset_order() {
        let guid = "0123456789ABCDEF0123456789ABCDEF";
        let part1 = b"<rdf:RDF>first";
        let part2 = b" second</rdf:RDF>";
        let total = (part1.len() + part2.len()) as u32;

        // Fragments arrive out of order; offsets put them right.
        let data = jpeg(&[
            ext_xmp_segment(guid, total, part1.len() as u32, part2),
            ext_xmp_segment(guid, total, 0, part1),
        ]);
        let segs = read_segments(&data);
        assert_eq!(
            segs.xmp.as_deref(),
            Some("<rdf:RDF>first second</rdf:RDF>")
        );
    }

    #[test]
    fn extended_xmp_truncated_to_declared_total() {
        let guid = "0123456789ABCDEF0123456789ABCDEF";
        let data = jpeg(&[ext_xmp_segment(guid, 4, 0, b"keepDROPPED")]);
        let segs = read_segments(&data);
        assert_eq!(segs.xmp.as_deref(), Some("keep"));
    }

    #[test]
    fn standard_precedes_extended() {
        let guid = "0123456789ABCDEF0123456789ABCDEF";
        let mut std_body = XMP_PREFIX.to_vec();
        std_body.extend_from_slice(b"STD");
        let data = jpeg(&[
            ext_xmp_segment(guid, 3, 0, b"EXT"),
            segment(0xE1, &std_body),
        ]);
        let segs = read_segments(&data);
        assert_eq!(segs.xmp.as_deref(), Some("STDEXT"));
    }

    #[test]
    fn comment_decoded() {
        let data = jpeg(&[segment(0xFE, b"a cat\nSteps: 20")]);
        let segs = read_segments(&data);
        assert_eq!(segs.comment.as_deref(), Some("a cat\nSteps: 20"));
    }

    #[test]
    fn first_comment_kept() {
        let data = jpeg(&[segment(0xFE, b"first"), segment(0xFE, b"second")]);
        let segs = read_segments(&data);
        assert_eq!(segs.comment.as_deref(), Some("first"));
    }

    #[test]
    fn stops_at_sos() {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xFE, b"before"));
        data.extend(segment(0xDA, b"\x01\x00"));
        // Scan data that happens to look like a COM segment.
        data.extend(segment(0xFE, b"after"));
        data.extend_from_slice(&[0xFF, 0xD9]);
        let segs = read_segments(&data);
        assert_eq!(segs.comment.as_deref(), Some("before"));
    }

    #[test]
    fn restart_markers_skipped() {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xD0, 0xFF, 0xD7]);
        data.extend(segment(0xFE, b"text"));
        data.extend_from_slice(&[0xFF, 0xD9]);
        let segs = read_segments(&data);
        assert_eq!(segs.comment.as_deref(), Some("text"));
    }

    #[test]
    fn not_a_jpeg_empty() {
        let segs = read_segments(b"GIF89a");
        assert!(segs.exif.is_none() && segs.xmp.is_none() && segs.comment.is_none());
    }

    #[test]
    fn never_panics_on_truncation() {
        let guid = "0123456789ABCDEF0123456789ABCDEF";
        let data = jpeg(&[
            segment(0xFE, b"comment"),
            ext_xmp_segment(guid, 8, 0, b"fragment"),
        ]);
        for len in 0..data.len() {
            let _ = read_segments(&data[..len]);
        }
    }
}
