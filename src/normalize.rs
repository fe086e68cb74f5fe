//! Raw-text normalization into structured fields.
//!
//! Takes the source-keyed `raw` map and produces `fields`: the A1111
//! parameter block split into prompt + settings keys, JSON-bearing values
//! parsed into `<key>_json` entries, and ComfyUI graph results merged on
//! top.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::comfy;

static KV_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.*)$").expect("kv pattern"));

/// Raw keys copied into `fields` verbatim (whitespace → underscores).
const RECOGNIZED_RAW_KEYS: [&str; 4] = ["prompt", "negative_prompt", "Prompt", "Negative prompt"];

/// Build the normalized field map from raw source texts.
pub(crate) fn normalize(raw: &BTreeMap<String, String>) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();

    if let Some(parameters) = raw.get("parameters") {
        normalize_parameters(parameters, &mut fields);
    }

    for key in RECOGNIZED_RAW_KEYS {
        if let Some(value) = raw.get(key) {
            fields.insert(key.replace(char::is_whitespace, "_"), Value::from(value.clone()));
        }
    }

    // Values that look like JSON documents get a parsed twin.
    for (key, value) in raw {
        let trimmed = value.trim();
        let json_shaped = (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'));
        if json_shaped {
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                fields.insert(format!("{key}_json"), parsed);
            }
        }
    }

    if let Some(updates) = comfy::extract_comfy(&fields) {
        for (key, value) in updates {
            fields.insert(key, value);
        }
    }

    fields
}

/// Split an A1111 block: first line is the prompt, later `Key: Value`
/// lines become fields, and the comma-joined settings line is broken into
/// its individual pairs.
fn normalize_parameters(parameters: &str, fields: &mut BTreeMap<String, Value>) {
    fields.insert(
        "parameters_raw".to_string(),
        Value::from(parameters.to_string()),
    );

    let mut lines = parameters.split(['\n']).map(|l| l.strip_suffix('\r').unwrap_or(l));
    if let Some(first) = lines.next() {
        fields.insert("prompt".to_string(), Value::from(first.to_string()));
    }
    for line in lines {
        let Some(caps) = KV_LINE.captures(line) else {
            continue;
        };
        fields.insert(
            caps[1].trim().to_string(),
            Value::from(caps[2].trim().to_string()),
        );
        if let Some(pairs) = split_settings_line(line) {
            for (key, value) in pairs {
                fields.insert(key, Value::from(value));
            }
        }
    }
}

/// Break `Steps: 20, Sampler: Euler, ...` into pairs.
///
/// Only applies to lines with at least two `Key: Value` segments, so a
/// `Negative prompt: worst, ugly` line stays whole. A segment without a
/// colon (a comma inside a value) is glued back onto the previous value.
fn split_settings_line(line: &str) -> Option<Vec<(String, String)>> {
    let segments: Vec<&str> = line.split(", ").collect();
    let pair_count = segments.iter().filter(|s| s.contains(": ")).count();
    if pair_count < 2 {
        return None;
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in segments {
        match segment.split_once(": ") {
            Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
            None => {
                if let Some(last) = pairs.last_mut() {
                    last.1.push_str(", ");
                    last.1.push_str(segment);
                }
            }
        }
    }
    Some(pairs)
}
