//! Encoding-aware text decoding with candidate scoring.
//!
//! Metadata payloads arrive in whatever encoding the producing tool felt
//! like: Latin-1 PNG text, UTF-16 EXIF strings with or without BOM,
//! Shift_JIS UserComments, UTF-8 XMP. Decoding is therefore a panel: try
//! every plausible encoding, score each decoded candidate, keep the best.
//!
//! All scoring is heuristic and tuned for Stable-Diffusion parameter text
//! (ASCII-heavy key/value lines with occasional CJK prompts).

use encoding_rs::{SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

/// Encodings the panel can try.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TextEncoding {
    /// ISO-8859-1: every byte maps 1:1 to the same code point.
    Latin1,
    Utf8,
    Utf16Le,
    Utf16Be,
    ShiftJis,
}

impl TextEncoding {
    /// Decode without replacement. `None` on any malformed sequence.
    pub fn decode_strict(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Latin1 => Some(latin1(bytes)),
            TextEncoding::Utf8 => UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|c| c.into_owned()),
            TextEncoding::Utf16Le => UTF_16LE
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|c| c.into_owned()),
            TextEncoding::Utf16Be => UTF_16BE
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|c| c.into_owned()),
            TextEncoding::ShiftJis => SHIFT_JIS
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|c| c.into_owned()),
        }
    }

    /// Decode with U+FFFD replacement for malformed sequences.
    pub fn decode_lossy(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Latin1 => latin1(bytes),
            TextEncoding::Utf8 => UTF_8.decode_without_bom_handling(bytes).0.into_owned(),
            TextEncoding::Utf16Le => UTF_16LE.decode_without_bom_handling(bytes).0.into_owned(),
            TextEncoding::Utf16Be => UTF_16BE.decode_without_bom_handling(bytes).0.into_owned(),
            TextEncoding::ShiftJis => SHIFT_JIS.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }

    /// Map an XML `encoding="..."` declaration name to a panel encoding.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "utf-16" | "utf-16le" | "utf16le" => Some(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Some(TextEncoding::Utf16Be),
            "shift_jis" | "shift-jis" | "sjis" | "windows-31j" => Some(TextEncoding::ShiftJis),
            _ => None,
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// NUL statistics — BOM-less UTF-16 detection
// ---------------------------------------------------------------------------

/// NUL-byte distribution over a payload.
///
/// ASCII text encoded as UTF-16LE puts a NUL at every odd position,
/// UTF-16BE at every even position. A high overall NUL ratio therefore
/// signals UTF-16, and the parity signals endianness.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NulStats {
    pub len: usize,
    pub nuls: usize,
    pub at_even: usize,
    pub at_odd: usize,
}

impl NulStats {
    pub fn of(bytes: &[u8]) -> Self {
        let mut stats = NulStats {
            len: bytes.len(),
            nuls: 0,
            at_even: 0,
            at_odd: 0,
        };
        for (i, &b) in bytes.iter().enumerate() {
            if b == 0 {
                stats.nuls += 1;
                if i % 2 == 0 {
                    stats.at_even += 1;
                } else {
                    stats.at_odd += 1;
                }
            }
        }
        stats
    }

    pub fn ratio(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.nuls as f64 / self.len as f64
        }
    }

    /// NUL density above the UTF-16 threshold.
    pub fn utf16_likely(&self) -> bool {
        self.ratio() > 0.2
    }

    /// Endianness suggested by NUL parity.
    pub fn preferred_utf16(&self) -> TextEncoding {
        if self.at_odd >= self.at_even {
            TextEncoding::Utf16Le
        } else {
            TextEncoding::Utf16Be
        }
    }
}

/// Ratio of valid Shift_JIS lead/trail byte pairs in the payload.
///
/// Above a small threshold the panel tries Shift_JIS first, so that
/// Shift_JIS text full of incidental high bytes doesn't lose a tie.
pub(crate) fn shift_jis_pair_ratio(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut pairs = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        let lead = bytes[i];
        let trail = bytes[i + 1];
        let lead_ok = (0x81..=0x9F).contains(&lead) || (0xE0..=0xFC).contains(&lead);
        let trail_ok = (0x40..=0x7E).contains(&trail) || (0x80..=0xFC).contains(&trail);
        if lead_ok && trail_ok {
            pairs += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs as f64 / bytes.len() as f64
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Plausibility score for a decoded candidate. Higher is better.
pub(crate) fn score_text(s: &str) -> f64 {
    let mut replacement = 0usize;
    let mut cjk = 0usize;
    let mut kana = 0usize;
    let mut ascii_printable = 0usize;
    let mut bad_controls = 0usize;
    let mut separators = 0usize;

    for c in s.chars() {
        match c {
            '\u{FFFD}' => replacement += 1,
            '\t' | '\n' | '\r' => {}
            c if (c as u32) < 0x20 => bad_controls += 1,
            ',' | ':' | ';' => {
                separators += 1;
                ascii_printable += 1;
            }
            c if c.is_ascii_graphic() || c == ' ' => ascii_printable += 1,
            // CJK unified ideographs
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' if !utf16_artifact(c) => cjk += 1,
            // Hiragana + katakana
            '\u{3040}'..='\u{30FF}' if !utf16_artifact(c) => kana += 1,
            _ => {}
        }
    }

    -100.0 * replacement as f64
        + 5.0 * cjk as f64
        + 4.0 * kana as f64
        + 0.3 * ascii_printable as f64
        - 5.0 * bad_controls as f64
        + 0.5 * separators as f64
}

/// Code points whose UTF-16 halves read as a pair of single-byte text
/// bytes — two printable ASCII bytes, a zero pad, or a Shift_JIS
/// lead/trail pair. That is what 8-bit data mis-read as UTF-16 turns
/// into, so these carry no CJK/kana weight.
fn utf16_artifact(c: char) -> bool {
    let u = c as u32;
    let hi = (u >> 8) as u8;
    let lo = (u & 0xFF) as u8;
    let ascii = |b: u8| (0x20..=0x7E).contains(&b);
    let sjis_pair = matches!(hi, 0x81..=0x9F | 0xE0..=0xFC)
        && matches!(lo, 0x40..=0x7E | 0x80..=0xFC);
    lo == 0 || (ascii(hi) && ascii(lo)) || sjis_pair
}

/// Extra weight for text that carries A1111 parameter markers.
pub(crate) fn sd_marker_bonus(s: &str) -> f64 {
    let mut bonus = 0.0;
    if s.contains("Negative prompt:") {
        bonus += 5.0;
    }
    if s.contains("Steps:") {
        bonus += 4.0;
    }
    for marker in ["Sampler:", "CFG scale:", "Seed:", "Size:"] {
        if s.contains(marker) {
            bonus += 2.0;
        }
    }
    // Smart apostrophe is a good sign; U+0019 is a classic UTF-16
    // mis-decode artifact of it.
    if s.contains('\u{2019}') {
        bonus += 1.0;
    }
    if s.contains('\u{0019}') {
        bonus -= 3.0;
    }

    let total = s.chars().count();
    if total > 0 {
        let printable = s
            .chars()
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .count();
        bonus += printable as f64 / total as f64;
    }
    bonus
}

/// Score for candidates expected to hold SD parameter text.
pub(crate) fn score_sd_text(s: &str) -> f64 {
    score_text(s) + sd_marker_bonus(s)
}

/// Decode with every encoding in `order`, return the best-scoring result.
///
/// Ties go to the earlier encoding, so callers encode their preference by
/// ordering the panel.
pub(crate) fn decode_best(
    bytes: &[u8],
    order: &[TextEncoding],
    scorer: fn(&str) -> f64,
) -> Option<(String, TextEncoding)> {
    let mut best: Option<(String, TextEncoding, f64)> = None;
    for &enc in order {
        let text = enc.decode_lossy(bytes);
        let score = scorer(&text);
        match &best {
            Some((_, _, s)) if *s >= score => {}
            _ => best = Some((text, enc, score)),
        }
    }
    best.map(|(text, enc, _)| (text, enc))
}

// ---------------------------------------------------------------------------
// EXIF UserComment
// ---------------------------------------------------------------------------

const UC_ASCII: &[u8] = b"ASCII\0\0\0";
const UC_UNICODE: &[u8] = b"UNICODE\0";
const UC_JIS: &[u8] = b"JIS\0\0\0\0\0";

/// Decode an EXIF UserComment payload (tag 0x9286).
///
/// The 8-byte encoding tag is advisory at best; tools routinely write
/// `UNICODE` with either endianness or no tag at all. The tag only
/// reorders the panel. NUL code points are stripped from the winner.
pub(crate) fn decode_user_comment(bytes: &[u8]) -> Option<String> {
    let (body, marked) = split_user_comment_prefix(bytes);
    if body.is_empty() {
        return None;
    }

    let mut order: Vec<TextEncoding> = Vec::with_capacity(6);
    match marked {
        Some(TextEncoding::ShiftJis) => order.push(TextEncoding::ShiftJis),
        Some(TextEncoding::Utf16Le) => {
            order.push(TextEncoding::Utf16Le);
            order.push(TextEncoding::Utf16Be);
        }
        _ => {
            let stats = NulStats::of(body);
            if stats.utf16_likely() {
                order.push(stats.preferred_utf16());
            } else if shift_jis_pair_ratio(body) > 0.05 {
                order.push(TextEncoding::ShiftJis);
            }
        }
    }
    for enc in [
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::ShiftJis,
        TextEncoding::Latin1,
    ] {
        if !order.contains(&enc) {
            order.push(enc);
        }
    }

    let (text, _) = decode_best(body, &order, score_sd_text)?;
    let cleaned: String = text.chars().filter(|&c| c != '\0').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Split off the 8-byte UserComment encoding tag when present.
fn split_user_comment_prefix(bytes: &[u8]) -> (&[u8], Option<TextEncoding>) {
    if bytes.len() >= 8 {
        let marked = match &bytes[..8] {
            p if p == UC_ASCII => Some(TextEncoding::Latin1),
            p if p == UC_UNICODE => Some(TextEncoding::Utf16Le),
            p if p == UC_JIS => Some(TextEncoding::ShiftJis),
            _ => None,
        };
        if marked.is_some() {
            return (&bytes[8..], marked);
        }
    }
    (bytes, None)
}

// ---------------------------------------------------------------------------
// XMP payloads
// ---------------------------------------------------------------------------

/// Decode an XMP packet: BOM first, NUL parity second, panel third.
///
/// After a BOM-less panel decode, an `encoding="..."` declaration in the
/// result gets one re-decode with the declared encoding, adopted if it
/// scores no worse.
pub(crate) fn decode_xmp_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    // BOM wins over every heuristic.
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some(TextEncoding::Utf8.decode_lossy(&bytes[3..]));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(TextEncoding::Utf16Be.decode_lossy(&bytes[2..]));
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(TextEncoding::Utf16Le.decode_lossy(&bytes[2..]));
    }

    let stats = NulStats::of(bytes);
    if stats.utf16_likely() {
        return Some(stats.preferred_utf16().decode_lossy(bytes));
    }

    let mut order = vec![
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::ShiftJis,
    ];
    if shift_jis_pair_ratio(bytes) > 0.05 {
        order.rotate_right(1);
    }
    let (text, chosen) = decode_best(bytes, &order, score_text)?;

    // Honor a self-declared encoding if it doesn't make things worse.
    if let Some(declared) = declared_encoding(&text) {
        if declared != chosen {
            let redecoded = declared.decode_lossy(bytes);
            if score_text(&redecoded) >= score_text(&text) {
                return Some(redecoded);
            }
        }
    }
    Some(text)
}

/// Pull the encoding name out of an `encoding="..."` XML declaration.
fn declared_encoding(text: &str) -> Option<TextEncoding> {
    let at = text.find("encoding")?;
    let rest = &text[at + "encoding".len()..];
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    TextEncoding::from_label(&inner[..end])
}

// ---------------------------------------------------------------------------
// Free-form payloads (JPEG COM and friends)
// ---------------------------------------------------------------------------

/// Best-effort decode of a payload with no declared encoding.
pub(crate) fn decode_best_effort(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    let stats = NulStats::of(bytes);
    let mut order: Vec<TextEncoding> = Vec::with_capacity(6);
    if stats.utf16_likely() {
        order.push(stats.preferred_utf16());
    } else if shift_jis_pair_ratio(bytes) > 0.05 {
        order.push(TextEncoding::ShiftJis);
    }
    for enc in [
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::ShiftJis,
        TextEncoding::Latin1,
    ] {
        if !order.contains(&enc) {
            order.push(enc);
        }
    }
    decode_best(bytes, &order, score_sd_text).map(|(text, _)| text)
}

// ---------------------------------------------------------------------------
// Post-decode repair and quality checks
// ---------------------------------------------------------------------------

/// Repair a UTF-16 endianness mis-decode.
///
/// BE text decoded as LE turns ASCII into code units like U+4100 — the
/// low byte of most units is zero. When at least 30% of units look like
/// that, re-assemble the original byte stream (each unit as a big-endian
/// pair) and decode it as UTF-16LE.
pub(crate) fn repair_utf16_misdecode(s: &str) -> String {
    let units: Vec<u16> = s.encode_utf16().collect();
    if units.is_empty() {
        return s.to_string();
    }
    let zero_low = units.iter().filter(|&&u| u & 0x00FF == 0).count();
    if (zero_low as f64) / (units.len() as f64) < 0.3 {
        return s.to_string();
    }

    let mut bytes = Vec::with_capacity(units.len() * 2);
    for u in units {
        bytes.push((u >> 8) as u8);
        bytes.push((u & 0xFF) as u8);
    }
    TextEncoding::Utf16Le.decode_lossy(&bytes)
}

/// Does this text look like a failed decode?
///
/// Replacement characters, embedded NULs, or mostly-high code points with
/// almost no ASCII letters all mean the chosen encoding was wrong.
pub(crate) fn looks_garbled(s: &str) -> bool {
    if s.contains('\u{FFFD}') || s.contains('\0') {
        return true;
    }
    let total = s.chars().count();
    if total == 0 {
        return false;
    }
    let high = s.chars().filter(|&c| (c as u32) > 0x7F).count();
    let letters = s.chars().filter(|c| c.is_ascii_alphabetic()).count();
    high as f64 / total as f64 > 0.5 && (letters as f64) < 0.1 * total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn utf16be(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn latin1_maps_bytes_one_to_one() {
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(TextEncoding::Latin1.decode_lossy(&bytes), "café");
        assert_eq!(
            TextEncoding::Latin1.decode_strict(&bytes).as_deref(),
            Some("café")
        );
    }

    #[test]
    fn strict_utf8_rejects_invalid() {
        assert!(TextEncoding::Utf8.decode_strict(&[0xFF, 0xFE, 0x41]).is_none());
        assert_eq!(
            TextEncoding::Utf8.decode_strict(b"hello").as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn nul_stats_parity() {
        // "hi" as UTF-16LE: NULs at odd positions.
        let le = utf16le("hi");
        let stats = NulStats::of(&le);
        assert!(stats.utf16_likely());
        assert_eq!(stats.preferred_utf16(), TextEncoding::Utf16Le);

        let be = utf16be("hi");
        let stats = NulStats::of(&be);
        assert_eq!(stats.preferred_utf16(), TextEncoding::Utf16Be);
    }

    #[test]
    fn score_prefers_clean_ascii() {
        let clean = "Steps: 20, Sampler: Euler";
        let garbled = "\u{FFFD}\u{FFFD}\u{FFFD}";
        assert!(score_text(clean) > score_text(garbled));
    }

    #[test]
    fn score_rewards_cjk() {
        let cjk = "美しい風景の写真";
        assert!(score_text(cjk) > 0.0);
    }

    #[test]
    fn sd_bonus_counts_markers() {
        let text = "a cat\nNegative prompt: blurry\nSteps: 20, Sampler: Euler, CFG scale: 7";
        // 5 + 4 + 2 + 2 + printable-ratio
        assert!(sd_marker_bonus(text) > 13.0);
    }

    #[test]
    fn user_comment_unicode_le() {
        let mut payload = b"UNICODE\0".to_vec();
        payload.extend(utf16le("a dog\nSteps: 10"));
        assert_eq!(
            decode_user_comment(&payload).as_deref(),
            Some("a dog\nSteps: 10")
        );
    }

    #[test]
    fn user_comment_unicode_be() {
        // Tag says UNICODE but the bytes are BE; the wrong-endian decode
        // loses on score because its code units are ASCII byte pairs.
        let mut payload = b"UNICODE\0".to_vec();
        payload.extend(utf16be("Negative prompt: cartoon\nSteps: 10"));
        assert_eq!(
            decode_user_comment(&payload).as_deref(),
            Some("Negative prompt: cartoon\nSteps: 10")
        );
    }

    #[test]
    fn user_comment_ascii_prefix() {
        let mut payload = b"ASCII\0\0\0".to_vec();
        payload.extend(b"plain text");
        assert_eq!(decode_user_comment(&payload).as_deref(), Some("plain text"));
    }

    #[test]
    fn user_comment_latin1_high_bytes() {
        // ASCII-tagged but carrying Latin-1; invalid as UTF-8, so the
        // panel's last resort takes it on score.
        let mut payload = b"ASCII\0\0\0".to_vec();
        payload.extend_from_slice(b"caf\xE9, Steps: 5");
        assert_eq!(
            decode_user_comment(&payload).as_deref(),
            Some("café, Steps: 5")
        );
    }

    #[test]
    fn user_comment_jis() {
        let mut payload = b"JIS\0\0\0\0\0".to_vec();
        // "こんにちは" in Shift_JIS
        payload.extend([0x82, 0xB1, 0x82, 0xF1, 0x82, 0xC9, 0x82, 0xBF, 0x82, 0xCD]);
        assert_eq!(decode_user_comment(&payload).as_deref(), Some("こんにちは"));
    }

    #[test]
    fn user_comment_bare_utf16_by_parity() {
        let payload = utf16le("Negative prompt: evil\nSteps: 99");
        assert_eq!(
            decode_user_comment(&payload).as_deref(),
            Some("Negative prompt: evil\nSteps: 99")
        );
    }

    #[test]
    fn user_comment_strips_nuls() {
        let mut payload = b"ASCII\0\0\0".to_vec();
        payload.extend(b"text\0with\0nuls\0");
        assert_eq!(
            decode_user_comment(&payload).as_deref(),
            Some("textwithnuls")
        );
    }

    #[test]
    fn user_comment_empty_after_prefix() {
        assert!(decode_user_comment(b"ASCII\0\0\0").is_none());
        assert!(decode_user_comment(b"").is_none());
    }

    #[test]
    fn xmp_bom_wins_over_parity() {
        // BE BOM followed by BE text whose parity alone would also say BE;
        // now feed LE BOM with LE bytes to check the LE path too.
        let mut be = vec![0xFE, 0xFF];
        be.extend(utf16be("<x/>"));
        assert_eq!(decode_xmp_text(&be).as_deref(), Some("<x/>"));

        let mut le = vec![0xFF, 0xFE];
        le.extend(utf16le("<x/>"));
        assert_eq!(decode_xmp_text(&le).as_deref(), Some("<x/>"));
    }

    #[test]
    fn xmp_utf8_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend(b"<x:xmpmeta/>");
        assert_eq!(decode_xmp_text(&data).as_deref(), Some("<x:xmpmeta/>"));
    }

    #[test]
    fn xmp_bomless_utf16_by_parity() {
        let data = utf16le("<x:xmpmeta>body</x:xmpmeta>");
        assert_eq!(
            decode_xmp_text(&data).as_deref(),
            Some("<x:xmpmeta>body</x:xmpmeta>")
        );
    }

    #[test]
    fn xmp_plain_utf8() {
        let data = b"<x:xmpmeta>\xE4\xB8\xAD</x:xmpmeta>";
        assert_eq!(decode_xmp_text(data).as_deref(), Some("<x:xmpmeta>中</x:xmpmeta>"));
    }

    #[test]
    fn declared_encoding_parsed() {
        assert_eq!(
            declared_encoding(r#"<?xml version="1.0" encoding="UTF-8"?>"#),
            Some(TextEncoding::Utf8)
        );
        assert_eq!(
            declared_encoding(r#"<?xml encoding='shift_jis'?>"#),
            Some(TextEncoding::ShiftJis)
        );
        assert_eq!(declared_encoding("<x/>"), None);
    }

    #[test]
    fn repair_misdecoded_be() {
        // "Hi" as UTF-16BE decoded as LE gives U+4800 U+6900.
        let bytes = utf16be("Hi");
        let wrong = TextEncoding::Utf16Le.decode_lossy(&bytes);
        assert_ne!(wrong, "Hi");
        assert_eq!(repair_utf16_misdecode(&wrong), "Hi");
    }

    #[test]
    fn repair_leaves_good_text_alone() {
        let text = "Steps: 20, Sampler: Euler";
        assert_eq!(repair_utf16_misdecode(text), text);
    }

    #[test]
    fn garbled_detection() {
        assert!(looks_garbled("text with \u{FFFD} inside"));
        assert!(looks_garbled("nul\0byte"));
        assert!(looks_garbled("桅灥湲瑳汥潬桅灥湲瑳汥潬"));
        assert!(!looks_garbled("a cat\nSteps: 20"));
        assert!(!looks_garbled("美しい風景, Steps: 20, masterpiece photo"));
        assert!(!looks_garbled(""));
    }

    #[test]
    fn shift_jis_ratio_detects_sjis() {
        // Shift_JIS "こんにちは" — five lead/trail pairs.
        let sjis = [0x82, 0xB1, 0x82, 0xF1, 0x82, 0xC9, 0x82, 0xBF, 0x82, 0xCD];
        assert!(shift_jis_pair_ratio(&sjis) > 0.05);
        assert!(shift_jis_pair_ratio(b"plain ascii text") < 0.05);
    }

    #[test]
    fn decode_best_tie_goes_to_first() {
        // Pure ASCII scores identically under Latin-1 and UTF-8.
        let (_, enc) = decode_best(
            b"hello",
            &[TextEncoding::Utf8, TextEncoding::Latin1],
            score_text,
        )
        .unwrap();
        assert_eq!(enc, TextEncoding::Utf8);
    }
}
