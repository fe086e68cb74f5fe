//! PNG text-chunk reader.
//!
//! Walks the chunk stream and collects `tEXt`, `zTXt` and `iTXt` chunks
//! into a key → text map. CRCs are ignored; a truncated or undecodable
//! chunk is skipped and the walk keeps whatever it already has.

use std::collections::BTreeMap;
use std::io::Read;

use crate::MetaFormat;

/// Extract all text chunks from a PNG buffer.
///
/// Returns an empty map when the signature doesn't match. Stops at `IEND`
/// or at the first truncated chunk.
pub(crate) fn read_text_chunks(data: &[u8]) -> BTreeMap<String, String> {
    let mut chunks = BTreeMap::new();
    if !MetaFormat::Png.signature_matches(data) {
        return chunks;
    }

    let mut pos = 8;
    loop {
        if pos + 8 > data.len() {
            break;
        }
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        pos += 8;

        if chunk_type == b"IEND" {
            break;
        }
        if pos + len > data.len() {
            break;
        }
        let body = &data[pos..pos + len];
        // Data + CRC (unchecked).
        pos += len + 4;

        let parsed = match chunk_type {
            b"tEXt" => parse_text(body),
            b"zTXt" => parse_ztxt(body),
            b"iTXt" => parse_itxt(body),
            _ => None,
        };
        if let Some((key, value)) = parsed {
            if !key.is_empty() {
                chunks.insert(key, value);
            }
        }
    }

    chunks
}

/// `tEXt`: key `\0` value, both Latin-1.
fn parse_text(body: &[u8]) -> Option<(String, String)> {
    let nul = body.iter().position(|&b| b == 0)?;
    let key = latin1(&body[..nul]);
    let value = latin1(&body[nul + 1..]);
    Some((key, value))
}

/// `zTXt`: key `\0` method-byte, then a zlib stream, decoded as Latin-1.
fn parse_ztxt(body: &[u8]) -> Option<(String, String)> {
    let nul = body.iter().position(|&b| b == 0)?;
    let key = latin1(&body[..nul]);
    // Compression method 0 = deflate; anything else is unknown.
    if body.get(nul + 1) != Some(&0) {
        return None;
    }
    let decompressed = inflate(&body[nul + 2..])?;
    Some((key, latin1(&decompressed)))
}

/// `iTXt`: key `\0` flag method lang `\0` translated-key `\0` text (UTF-8,
/// deflated when flag = 1).
fn parse_itxt(body: &[u8]) -> Option<(String, String)> {
    let nul = body.iter().position(|&b| b == 0)?;
    let key = String::from_utf8(body[..nul].to_vec()).ok()?;

    let mut pos = nul + 1;
    let compression_flag = *body.get(pos)?;
    pos += 2; // flag + method

    // Language tag, then translated keyword, both NUL-terminated.
    for _ in 0..2 {
        let end = body.get(pos..)?.iter().position(|&b| b == 0)?;
        pos += end + 1;
    }

    let text_bytes = body.get(pos..)?;
    let value = if compression_flag == 1 {
        String::from_utf8(inflate(text_bytes)?).ok()?
    } else {
        String::from_utf8(text_bytes.to_vec()).ok()?
    };
    Some((key, value))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inflate a zlib stream. `None` on a corrupt stream.
fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn chunk(chunk_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0, 0, 0, 0]); // CRC, unchecked
        out
    }

    fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        for c in chunks {
            out.extend_from_slice(c);
        }
        out.extend(chunk(b"IEND", &[]));
        out
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn text_chunk() {
        let data = png(&[chunk(b"tEXt", b"parameters\0a cat\nSteps: 20")]);
        let chunks = read_text_chunks(&data);
        assert_eq!(
            chunks.get("parameters").map(String::as_str),
            Some("a cat\nSteps: 20")
        );
    }

    #[test]
    fn text_chunk_latin1_value() {
        let mut body = b"Title\0caf".to_vec();
        body.push(0xE9); // é in Latin-1
        let data = png(&[chunk(b"tEXt", &body)]);
        let chunks = read_text_chunks(&data);
        assert_eq!(chunks.get("Title").map(String::as_str), Some("café"));
    }

    #[test]
    fn ztxt_chunk() {
        let mut body = b"parameters\0\0".to_vec();
        body.extend(deflate(b"a dog\nSteps: 12"));
        let data = png(&[chunk(b"zTXt", &body)]);
        let chunks = read_text_chunks(&data);
        assert_eq!(
            chunks.get("parameters").map(String::as_str),
            Some("a dog\nSteps: 12")
        );
    }

    #[test]
    fn ztxt_bad_method_skipped() {
        let mut body = b"parameters\0\x01".to_vec();
        body.extend(deflate(b"text"));
        let data = png(&[chunk(b"zTXt", &body)]);
        assert!(read_text_chunks(&data).is_empty());
    }

    #[test]
    fn ztxt_corrupt_stream_skipped() {
        let body = b"parameters\0\0not a zlib stream";
        let data = png(&[chunk(b"zTXt", body)]);
        assert!(read_text_chunks(&data).is_empty());
    }

    #[test]
    fn itxt_uncompressed() {
        // key \0 flag=0 method=0 lang \0 translated \0 text
        let body = b"prompt\0\0\0en\0\0{\"3\":{}}";
        let data = png(&[chunk(b"iTXt", body)]);
        let chunks = read_text_chunks(&data);
        assert_eq!(chunks.get("prompt").map(String::as_str), Some("{\"3\":{}}"));
    }

    #[test]
    fn itxt_compressed() {
        let mut body = b"workflow\0\x01\0\0\0".to_vec();
        body.extend(deflate("グラフ data".as_bytes()));
        let data = png(&[chunk(b"iTXt", &body)]);
        let chunks = read_text_chunks(&data);
        assert_eq!(
            chunks.get("workflow").map(String::as_str),
            Some("グラフ data")
        );
    }

    #[test]
    fn multiple_chunks_collected() {
        let data = png(&[
            chunk(b"IHDR", &[0u8; 13]),
            chunk(b"tEXt", b"parameters\0p"),
            chunk(b"tEXt", b"prompt\0{}"),
        ]);
        let chunks = read_text_chunks(&data);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn stops_at_iend() {
        let mut data = png(&[chunk(b"tEXt", b"a\0before")]);
        // Text chunk after IEND must be ignored.
        data.extend(chunk(b"tEXt", b"b\0after"));
        let chunks = read_text_chunks(&data);
        assert!(chunks.contains_key("a"));
        assert!(!chunks.contains_key("b"));
    }

    #[test]
    fn truncated_chunk_keeps_earlier() {
        let mut data = SIGNATURE.to_vec();
        data.extend(chunk(b"tEXt", b"k\0kept"));
        // Declares 100 bytes but provides 2.
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(b"tEXt");
        data.extend_from_slice(&[0, 0]);
        let chunks = read_text_chunks(&data);
        assert_eq!(chunks.get("k").map(String::as_str), Some("kept"));
    }

    #[test]
    fn bad_signature_empty() {
        assert!(read_text_chunks(b"not a png at all").is_empty());
        assert!(read_text_chunks(&[]).is_empty());
    }

    #[test]
    fn only_iend_empty() {
        let data = png(&[]);
        assert!(read_text_chunks(&data).is_empty());
    }

    #[test]
    fn never_panics_on_truncation() {
        let data = png(&[chunk(b"tEXt", b"parameters\0some text here")]);
        for len in 0..data.len() {
            let _ = read_text_chunks(&data[..len]);
        }
    }
}
