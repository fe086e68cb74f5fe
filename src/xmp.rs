//! XMP attribute extraction.
//!
//! SD tools that write XMP put the parameter block into an RDF attribute
//! (`parameters="..."` or `sd-metadata="..."`) rather than element text.
//! A regex pulls the first occurrence of each known attribute; values are
//! HTML-unescaped before entering candidate selection.

use std::sync::LazyLock;

use regex::Regex;

/// Attribute names that carry parameter text, in candidate-priority order.
const PARAMETER_KEYS: [&str; 4] = ["sd-metadata", "sd_metadata", "parameters", "Parameters"];

// Negated classes instead of a lazy dot-all + backreference (which the
// regex crate doesn't do); they also span newlines.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(sd-metadata|sd_metadata|parameters|Parameters)\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
    )
    .expect("attribute pattern")
});

/// Extract parameter-bearing attributes from combined XMP text.
///
/// Returns `(key, unescaped value)` pairs, first occurrence per key, in
/// the fixed key order.
pub(crate) fn parameter_attributes(xmp: &str) -> Vec<(String, String)> {
    let mut found: Vec<Option<String>> = vec![None; PARAMETER_KEYS.len()];
    for caps in ATTR_RE.captures_iter(xmp) {
        let key = &caps[1];
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if let Some(slot) = PARAMETER_KEYS.iter().position(|&k| k == key) {
            if found[slot].is_none() {
                found[slot] = Some(html_unescape(value));
            }
        }
    }

    PARAMETER_KEYS
        .iter()
        .zip(found)
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

/// Decode the XML entities attribute values can carry: the five named
/// ones plus numeric references.
pub(crate) fn html_unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let decoded = rest
            .find(';')
            .filter(|&end| end <= 9)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                digits.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
