use crate::model::Level;

/// Only this many bytes of the first line are scanned for a level token.
pub const LEVEL_SCAN_LIMIT: usize = 256;

/// Severity tokens, matched case-insensitively as whole words.
pub const LEVEL_TOKENS: &[(&str, Level)] = &[
    ("FATAL", Level::Fatal),
    ("ERROR", Level::Error),
    ("WARN", Level::Warn),
    ("WARNING", Level::Warn),
    ("INFO", Level::Info),
    ("DEBUG", Level::Debug),
    ("TRACE", Level::Trace),
];

/// Largest prefix of `s` no longer than `max` bytes that ends on a char boundary.
pub(crate) fn bounded_prefix(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Level of a record from its first line, using the given token table.
/// The first word that matches a table entry wins.
pub fn detect_level_with(first_line: &str, table: &[(&str, Level)]) -> Level {
    let window = bounded_prefix(first_line, LEVEL_SCAN_LIMIT);
    window
        .split(|c: char| !c.is_ascii() || !is_word_byte(c as u8))
        .filter(|word| !word.is_empty())
        .find_map(|word| {
            table
                .iter()
                .find(|(token, _)| word.eq_ignore_ascii_case(token))
                .map(|(_, level)| *level)
        })
        .unwrap_or(Level::Unknown)
}

/// Level of a record, scanning only its first line.
pub fn detect_level(text: &str) -> Level {
    let first_line = text.split('\n').next().unwrap_or("");
    detect_level_with(first_line, LEVEL_TOKENS)
}
