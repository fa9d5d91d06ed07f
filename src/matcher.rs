//! Question-number extraction from raw OCR text.
//!
//! OCR output for worksheet anchors is noisy: full-width digits and brackets
//! from CJK fonts, circled numbers, and letters misread for digits. Everything
//! is first folded to ASCII with NFKC, then matched against the numbering
//! styles worksheets actually use (`3.`, `(3)`, `[3]`, `Q3`, `문3`, `3번`).

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::trace;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, StructureError};
use crate::logging::PATTERN_MATCH;

/// Sanitized content identifiers longer than this get a hash suffix.
pub const MAX_IDENTIFIER_TEXT: usize = 50;
const HASH_SUFFIX_BYTES: usize = 5;

static QUESTION_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?i:q|no\.?)|문제|문항|문|#)?\s*[\(\[<]?\s*([0-9OoIl|SsBZz]{1,4})\s*[\)\]>]?\s*(?:번|\.|\)|:|,)?$",
    )
    .expect("question number pattern is valid")
});

/// Fold text to its ASCII-compatible form: full-width digits, brackets and
/// punctuation become ASCII, circled numbers become plain digits, and
/// surrounding whitespace is removed. Applying it twice is a no-op.
pub fn normalize(text: &str) -> String {
    text.nfkc()
        .map(|c| match c {
            '〔' | '【' | '〖' => '[',
            '〕' | '】' | '〗' => ']',
            '〈' | '《' => '<',
            '〉' | '》' => '>',
            '。' => '.',
            '、' => ',',
            '·' | '・' => '.',
            other => other,
        })
        // Folded brackets can compose with a following mark (`<` + U+0338).
        .nfkc()
        .collect::<String>()
        .trim()
        .to_string()
}

fn confusable_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        'O' | 'o' => Some('0'),
        'I' | 'l' | '|' => Some('1'),
        'Z' | 'z' => Some('2'),
        'S' | 's' => Some('5'),
        'B' => Some('8'),
        _ => None,
    }
}

fn match_token(token: &str) -> Option<String> {
    let captures = QUESTION_NUMBER.captures(token)?;
    let raw = captures.get(1)?.as_str();
    // Letters alone are far more likely to be words than misread digits.
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = raw.chars().map(confusable_digit).collect::<Option<_>>()?;
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Extract a normalized question number from OCR text.
///
/// Returns the number without decoration or leading zeros, e.g. `"（０３）"`
/// gives `"3"`. Returns `None` for anything that does not look like a
/// question number; never panics.
pub fn extract_identifier(text: &str) -> Option<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    let found = match_token(&normalized).or_else(|| {
        normalized
            .split_whitespace()
            .next()
            .filter(|first| first.len() < normalized.len())
            .and_then(match_token)
    });

    trace!(target: PATTERN_MATCH, input = text, normalized = %normalized, found = ?found, "extract identifier");
    found
}

/// Numeric value of [`extract_identifier`], if it fits.
pub fn extract_number(text: &str) -> Option<i64> {
    extract_identifier(text)?.parse().ok()
}

fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest[..HASH_SUFFIX_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Build an identifier for anchors named by their content (e.g. a
/// `question_type` header) rather than by a number.
///
/// The result is `type_{layout_id}_{text}` where whitespace runs in the text
/// become `_` and anything other than ASCII alphanumerics, `_` and Hangul is
/// dropped. Text longer than [`MAX_IDENTIFIER_TEXT`] characters is cut and
/// suffixed with a hash of the full text.
pub fn generate_identifier(layout_id: u64, raw_text: &str) -> Result<String> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(StructureError::invalid(format!(
            "cannot generate identifier for layout {layout_id}: text is empty"
        )));
    }

    let sanitized: String = normalize(trimmed)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|&c| c.is_ascii_alphanumeric() || c == '_' || is_hangul(c))
        .collect();

    let identifier = if sanitized.chars().count() > MAX_IDENTIFIER_TEXT {
        let head: String = sanitized.chars().take(MAX_IDENTIFIER_TEXT).collect();
        format!("type_{layout_id}_{head}_{}", short_hash(trimmed))
    } else if sanitized.is_empty() {
        format!("type_{layout_id}_{}", short_hash(trimmed))
    } else {
        format!("type_{layout_id}_{sanitized}")
    };
    Ok(identifier)
}
