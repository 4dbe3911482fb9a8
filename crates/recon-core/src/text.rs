//! Text cleaning for values copied out of spreadsheets and Swagger pages.

use unicode_normalization::UnicodeNormalization;

const INVISIBLE_CHARS: [char; 3] = ['\u{00A0}', '\u{200B}', '\u{FEFF}'];

/// Applies NFKC, then strips non-breaking/zero-width characters and
/// surrounding whitespace.
pub fn clean_text(raw: &str) -> String {
    raw.nfkc()
        .filter(|ch| !INVISIBLE_CHARS.contains(ch))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Truncates to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = raw.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}
