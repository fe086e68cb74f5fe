//! A1111 parameter-block location and candidate selection.
//!
//! An A1111 block is: prompt lines, a `Negative prompt:` line (possibly
//! spanning several lines), and a final comma-separated settings line.
//! The locator anchors on the negative-prompt label and extends through
//! the settings line, returning an exact substring of the source — no
//! trimming, no line-ending normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::meta::{Candidate, TextSource};

const NEGATIVE_LABEL: &str = "Negative prompt:";

static STEPS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[\t ]*Steps:[^\n]*").expect("steps pattern"));

static SETTINGS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[\t ]*(?:Sampler|CFG scale|Seed|Size|Model|Schedule type|Denoising strength|Hires steps):[^\n]*",
    )
    .expect("settings pattern")
});

/// Extract the A1111 block from one text source.
///
/// Returns a byte-identical substring of `text` running from its start
/// through the end of the settings line — or through the end of text if
/// no settings line follows the negative prompt. `None` when the text
/// has no `Negative prompt:` label at all.
pub(crate) fn locate_block(text: &str) -> Option<&str> {
    let label_at = text.find(NEGATIVE_LABEL)?;

    // Tail begins after the first newline past the label; with no
    // newline, the whole source is the block.
    let Some(nl) = text[label_at..].find('\n') else {
        return Some(text);
    };
    let tail_start = label_at + nl + 1;
    let tail = &text[tail_start..];

    match first_settings_line(tail) {
        Some(end) => Some(&text[..tail_start + end]),
        None => Some(text),
    }
}

/// End offset of the first settings line in `tail`, `Steps:` preferred.
pub(crate) fn first_settings_line(tail: &str) -> Option<usize> {
    STEPS_LINE
        .find(tail)
        .or_else(|| SETTINGS_LINE.find(tail))
        .map(|m| m.end())
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Score a located block for how much it looks like real parameters.
fn score_block(block: &str) -> f64 {
    let lower = block.to_lowercase();
    let mut score = 0.0;
    if lower.contains("negative prompt:") {
        score += 5.0;
    }
    if lower.contains("steps:") {
        score += 4.0;
    }
    for marker in ["sampler:", "cfg scale:", "seed:", "size:"] {
        if lower.contains(marker) {
            score += 2.0;
        }
    }

    match block.lines().filter(|l| !l.trim().is_empty()).count() {
        3 => score += 3.0,
        2 => score += 2.0,
        n if n >= 4 => score += 1.0,
        _ => {}
    }

    let len = block.len();
    if len > 50 && len < 4000 {
        score += 1.0;
    }
    score
}

/// Pick the best A1111 block across all candidate sources.
///
/// Every candidate is run through the locator; located blocks compete on
/// score, with ties broken by source priority and then input order.
pub(crate) fn select_parameters(candidates: &[Candidate]) -> Option<(TextSource, String)> {
    let mut best: Option<(TextSource, &str, f64)> = None;
    for candidate in candidates {
        let Some(block) = locate_block(&candidate.text) else {
            continue;
        };
        let score = score_block(block);
        let better = match &best {
            None => true,
            Some((source, _, s)) => {
                score > *s || (score == *s && candidate.source < *source)
            }
        };
        if better {
            best = Some((candidate.source, block, score));
        }
    }
    best.map(|(source, block, _)| (source, block.to_string()))
}
