//! Block Alignment Layer
//!
//! Splits one translated string back into per-block fragments matching the
//! spatial layout of the original OCR text blocks. Translation services give
//! no token alignment, so the split leans on sentence punctuation when the
//! counts line up and otherwise falls back to a length-proportional cut
//! snapped to word boundaries.

use tracing::debug;

use crate::vision::TextBlock;

/// How far past a proportional cut point a following space is still preferred
pub const WORD_SNAP_WINDOW: usize = 10;

/// Join the non-empty block texts into the single string sent to translation
pub fn combined_text(blocks: &[TextBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.has_text())
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into sentences
///
/// A sentence ends after `.`, `!` or `?` followed by whitespace. Results are
/// trimmed and empty entries dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            if chars.peek().is_some_and(|next| next.is_whitespace()) {
                push_trimmed(&mut sentences, &current);
                current.clear();
                while chars.peek().is_some_and(|next| next.is_whitespace()) {
                    chars.next();
                }
            }
        }
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

/// Distribute a translated string across the original text blocks
///
/// Returns one fragment per block with non-empty trimmed text, in block
/// order. Empty or whitespace-only blocks are skipped entirely. Degenerate
/// inputs (empty translation, zero original characters) yield all-empty
/// fragments of the correct length.
pub fn align(translated: &str, blocks: &[TextBlock]) -> Vec<String> {
    let valid: Vec<&TextBlock> = blocks.iter().filter(|b| b.has_text()).collect();
    if valid.is_empty() {
        return Vec::new();
    }
    if translated.is_empty() {
        return vec![String::new(); valid.len()];
    }

    if let Some(fragments) = align_by_sentences(translated, &valid) {
        debug!(blocks = valid.len(), "aligned by sentence counts");
        return fragments;
    }

    debug!(blocks = valid.len(), "falling back to proportional alignment");
    align_proportional(translated, &valid)
}

/// Sentence-count alignment: exact match between translated sentences and
/// the sum of per-block sentence counts
fn align_by_sentences(translated: &str, blocks: &[&TextBlock]) -> Option<Vec<String>> {
    let per_block: Vec<Vec<String>> = blocks.iter().map(|b| split_sentences(&b.text)).collect();
    let total: usize = per_block.iter().map(|s| s.len()).sum();
    if total == 0 {
        return None;
    }

    let translated_sentences = split_sentences(translated);
    if translated_sentences.len() != total {
        return None;
    }

    let mut fragments = Vec::with_capacity(blocks.len());
    let mut cursor = 0;
    for sentences in &per_block {
        let count = sentences.len();
        if count == 0 {
            fragments.push(String::new());
            continue;
        }
        fragments.push(translated_sentences[cursor..cursor + count].join(" "));
        cursor += count;
    }

    Some(fragments)
}

/// Proportional character-count fallback with word-boundary snapping
fn align_proportional(translated: &str, blocks: &[&TextBlock]) -> Vec<String> {
    let counts: Vec<usize> = blocks.iter().map(|b| b.text.chars().count()).collect();
    let total_chars: usize = counts.iter().sum();
    if total_chars == 0 {
        return vec![String::new(); blocks.len()];
    }

    let chars: Vec<char> = translated.chars().collect();
    let translated_len = chars.len();

    let mut fragments = Vec::with_capacity(blocks.len());
    let mut start = 0usize;

    for count in counts {
        let proportion = count as f64 / total_chars as f64;
        let mut end = start + (proportion * translated_len as f64).round() as usize;
        end = end.clamp(start, translated_len);

        if end < translated_len {
            end = snap_to_word_boundary(&chars, start, end);
        }

        let fragment: String = chars[start..end].iter().collect();
        fragments.push(fragment.trim().to_string());
        start = end;
    }

    fragments
}

/// Move a cut offset to the nearest space
///
/// Ties between a preceding and following space go to the following one. A
/// following space with no preceding candidate is only taken when it is
/// within [`WORD_SNAP_WINDOW`] characters of the cut.
fn snap_to_word_boundary(chars: &[char], start: usize, end: usize) -> usize {
    let after = chars[end..].iter().position(|c| *c == ' ').map(|i| end + i);
    let before = chars[start..end]
        .iter()
        .rposition(|c| *c == ' ')
        .map(|i| start + i);

    match (after, before) {
        (Some(a), Some(b)) => {
            if a - end <= end - b {
                a
            } else {
                b
            }
        }
        (Some(a), None) if a - end < WORD_SNAP_WINDOW => a,
        (None, Some(b)) => b,
        _ => end,
    }
}
