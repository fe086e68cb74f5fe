//! Salvage paths for parameter text the container walk missed.
//!
//! Runs when selection produced nothing, or produced something that looks
//! like a failed decode. Three escalating strategies: a targeted UTF-16
//! window scan around the `Negative prompt:` byte pattern, whole-file
//! re-decodes, and a JSON scan for embedded `sd-metadata`-style objects.
//! First success wins.

use log::debug;
use serde_json::{Map, Value};

use crate::a1111::{first_settings_line, locate_block};
use crate::decoding::TextEncoding;

const NEGATIVE_LABEL: &str = "Negative prompt:";

/// Try every recovery strategy against the raw file bytes.
pub(crate) fn recover(data: &[u8]) -> Option<String> {
    recover_utf16_window(data)
        .or_else(|| recover_whole_file(data))
        .or_else(|| recover_json_scan(data))
}

// ---------------------------------------------------------------------------
// Step 1: targeted UTF-16 window scan
// ---------------------------------------------------------------------------

/// Search the file for the UTF-16 encodings of `Negative prompt:` and
/// decode a window around each hit with the matching endianness.
///
/// Window bounds keep the hit's byte parity, so code units stay aligned.
fn recover_utf16_window(data: &[u8]) -> Option<String> {
    let le: Vec<u8> = NEGATIVE_LABEL
        .encode_utf16()
        .flat_map(|u| u.to_le_bytes())
        .collect();
    let be: Vec<u8> = NEGATIVE_LABEL
        .encode_utf16()
        .flat_map(|u| u.to_be_bytes())
        .collect();

    for (encoding, pattern) in [(TextEncoding::Utf16Le, le), (TextEncoding::Utf16Be, be)] {
        for hit in find_all(data, &pattern) {
            let mut start = hit.saturating_sub(4096);
            if (hit - start) % 2 == 1 {
                // Keep the window on the hit's byte parity.
                start += 1;
            }
            let end = (hit + 8192).min(data.len());
            let text = encoding.decode_lossy(&data[start..end]);
            if let Some(block) = locate_block(&text) {
                debug!("recovered block from {encoding:?} window at {hit}");
                return Some(block.to_string());
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Steps 2–3: whole-file re-decode
// ---------------------------------------------------------------------------

/// Decode the entire file as UTF-16LE, UTF-16BE, then Shift_JIS.
///
/// Each pass runs the locator; failing that, a settings line alone is
/// enough — everything from the start of the decoded text through that
/// line is returned.
fn recover_whole_file(data: &[u8]) -> Option<String> {
    for encoding in [
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
        TextEncoding::ShiftJis,
    ] {
        let text = encoding.decode_lossy(data);
        if let Some(block) = locate_block(&text) {
            debug!("recovered block from whole-file {encoding:?}");
            return Some(block.to_string());
        }
        if let Some(end) = first_settings_line(&text) {
            debug!("recovered settings tail from whole-file {encoding:?}");
            return Some(text[..end].to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Step 4: JSON scan
// ---------------------------------------------------------------------------

const JSON_MARKERS: [&str; 5] = [
    "sd-metadata",
    "sd_metadata",
    "\"prompt\"",
    "\"Negative prompt\"",
    NEGATIVE_LABEL,
];

/// Look for metadata-shaped JSON anywhere in the file.
///
/// For each marker, the nearest enclosing `{...}` (by backward brace
/// search with forward matching) is parsed; a recognized object converts
/// to A1111 text.
fn recover_json_scan(data: &[u8]) -> Option<String> {
    let text = TextEncoding::Utf8.decode_lossy(data);
    for marker in JSON_MARKERS {
        let Some(at) = text.find(marker) else {
            continue;
        };
        let Some(obj) = enclosing_json_object(&text, at) else {
            continue;
        };
        if let Some(converted) = convert_metadata_object(&obj) {
            debug!("recovered parameters from embedded json near {marker:?}");
            return Some(converted);
        }
    }
    None
}

/// Parse the nearest `{...}` enclosing byte position `at`.
///
/// Walks candidate open braces outward from the marker; the first slice
/// that parses as a JSON object wins. Attempts are capped — a file full
/// of stray braces is not worth quadratic effort.
fn enclosing_json_object(text: &str, at: usize) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut attempts = 0;
    for open in (0..=at).rev().filter(|&i| bytes[i] == b'{') {
        attempts += 1;
        if attempts > 32 {
            return None;
        }
        let Some(close) = matching_brace(bytes, open) else {
            continue;
        };
        if close < at {
            continue;
        }
        if let Ok(Value::Object(obj)) = serde_json::from_str(&text[open..=close]) {
            return Some(obj);
        }
    }
    None
}

/// Index of the `}` closing the `{` at `open`, string-literal aware.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Turn a parsed object into A1111 text if it carries metadata.
fn convert_metadata_object(obj: &Map<String, Value>) -> Option<String> {
    for key in ["sd-metadata", "sd_metadata"] {
        if let Some(Value::Object(inner)) = obj.get(key) {
            return forge_to_a1111(inner);
        }
    }
    if let Some(Value::String(parameters)) = obj.get("parameters") {
        return Some(parameters.clone());
    }
    if obj.contains_key("prompt") || obj.contains_key("Prompt") {
        return forge_to_a1111(obj);
    }
    None
}

// ---------------------------------------------------------------------------
// Forge/JSON → A1111 text
// ---------------------------------------------------------------------------

/// Render a Forge-style metadata object as an A1111 block.
///
/// Line 1 is the prompt (right-trimmed only), line 2 always carries the
/// `Negative prompt:` label, line 3 joins whichever settings are set.
pub(crate) fn forge_to_a1111(m: &Map<String, Value>) -> Option<String> {
    let prompt = scalar(m, &["prompt", "Prompt"]);
    let negative = scalar(m, &["negativePrompt", "Negative prompt", "negative_prompt"]);

    let mut settings: Vec<String> = Vec::new();
    if let Some(v) = scalar(m, &["steps", "Steps"]) {
        settings.push(format!("Steps: {v}"));
    }
    if let Some(v) = scalar(m, &["sampler", "Sampler"]) {
        settings.push(format!("Sampler: {v}"));
    }
    if let Some(v) = scalar(m, &["cfgScale", "cfg", "CFG scale"]) {
        settings.push(format!("CFG scale: {v}"));
    }
    if let Some(v) = scalar(m, &["seed", "Seed"]) {
        settings.push(format!("Seed: {v}"));
    }
    let width = scalar(m, &["width", "Width"]);
    let height = scalar(m, &["height", "Height"]);
    if let (Some(w), Some(h)) = (width, height) {
        settings.push(format!("Size: {w}x{h}"));
    }
    if let Some(v) = scalar(m, &["model", "Model"]).or_else(|| {
        m.get("hashes")
            .and_then(|h| h.get("model"))
            .and_then(scalar_value)
    }) {
        settings.push(format!("Model: {v}"));
    }

    if prompt.is_none() && negative.is_none() && settings.is_empty() {
        return None;
    }

    let mut out = String::new();
    out.push_str(prompt.as_deref().unwrap_or("").trim_end());
    out.push('\n');
    out.push_str("Negative prompt: ");
    out.push_str(negative.as_deref().unwrap_or(""));
    if !settings.is_empty() {
        out.push('\n');
        out.push_str(&settings.join(", "));
    }
    Some(out)
}

/// First present key rendered as plain text.
fn scalar(m: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| m.get(*k).and_then(scalar_value))
}

fn scalar_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------

/// All occurrences of `needle` in `haystack`.
fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter_map(|(i, w)| (w == needle).then_some(i))
        .collect()
}
