//! Timestamp detection anchored at the start of a line.
//!
//! Patterns are small templates compiled once into token vectors:
//! - `D` one ASCII digit
//! - `S` date/time separator (`T` or a space)
//! - `P` a space or a digit (syslog pads single-digit days with a space)
//! - `M` a three-letter English month abbreviation
//! - any other byte matches itself

use std::sync::LazyLock;

use crate::error::ConfigError;

const MONTHS: [&[u8]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun",
    b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

/// Formats recognised without any configuration.
pub const BUILTIN_PATTERNS: &[&str] = &[
    // 2024-01-02T10:00:00Z, 2024-01-02 10:00:00.123
    "DDDD-DD-DDSDD:DD:DD",
    // 2024/01/02 10:00:00
    "DDDD/DD/DD DD:DD:DD",
    // 20240102 10:00:00
    "DDDDDDDD DD:DD:DD",
    // Jan  2 10:00:00, Jan 12 10:00:00
    "M PD DD:DD:DD",
    // 02/Jan/2024:10:00:00 (common log format)
    "DD/M/DDDD:DD:DD:DD",
    // 10:00:00.123 (time-only prefixes)
    "DD:DD:DD",
];

static BUILTIN: LazyLock<TimestampDetector> = LazyLock::new(TimestampDetector::default);

/// Returns true if the line starts with one of the built-in timestamp formats.
pub fn contains_timestamp(line: &str) -> bool {
    BUILTIN.contains_timestamp(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Digit,
    DateTimeSep,
    DigitOrSpace,
    Month,
    Literal(u8),
}

impl Token {
    fn from_template_byte(b: u8) -> Self {
        match b {
            b'D' => Token::Digit,
            b'S' => Token::DateTimeSep,
            b'P' => Token::DigitOrSpace,
            b'M' => Token::Month,
            other => Token::Literal(other),
        }
    }

    /// Single-byte tokens only; `Month` is handled by the caller.
    fn accepts(self, b: u8) -> bool {
        match self {
            Token::Digit => b.is_ascii_digit(),
            Token::DateTimeSep => b == b'T' || b == b' ',
            Token::DigitOrSpace => b == b' ' || b.is_ascii_digit(),
            Token::Literal(l) => b == l,
            Token::Month => false,
        }
    }
}

/// A compiled timestamp template.
#[derive(Debug, Clone)]
pub struct TimestampPattern {
    template: String,
    tokens: Vec<Token>,
}

impl TimestampPattern {
    /// Compile a template. Empty templates and templates without a single
    /// digit token are rejected: they would match almost anything.
    pub fn compile(template: &str) -> Result<Self, ConfigError> {
        if template.is_empty() {
            return Err(ConfigError::InvalidTimestampPattern(
                "pattern must not be empty".to_string(),
            ));
        }
        let tokens: Vec<Token> = template.bytes().map(Token::from_template_byte).collect();
        if !tokens.contains(&Token::Digit) {
            return Err(ConfigError::InvalidTimestampPattern(format!(
                "pattern {:?} contains no digit placeholder 'D'",
                template
            )));
        }
        Ok(Self {
            template: template.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Match the template against the beginning of `line`.
    fn matches_prefix(&self, line: &[u8]) -> bool {
        let mut pos = 0;
        for &token in &self.tokens {
            if token == Token::Month {
                let Some(candidate) = line.get(pos..pos + 3) else {
                    return false;
                };
                if !MONTHS.iter().any(|m| *m == candidate) {
                    return false;
                }
                pos += 3;
                continue;
            }
            match line.get(pos) {
                Some(&b) if token.accepts(b) => pos += 1,
                _ => return false,
            }
        }
        true
    }
}

/// Set of timestamp patterns checked at the start of each line.
#[derive(Debug, Clone)]
pub struct TimestampDetector {
    patterns: Vec<TimestampPattern>,
}

impl TimestampDetector {
    /// Built-in patterns plus the given extra templates.
    pub fn with_patterns(extra: &[String]) -> Result<Self, ConfigError> {
        let mut detector = Self::default();
        for template in extra {
            detector.patterns.push(TimestampPattern::compile(template)?);
        }
        Ok(detector)
    }

    pub fn patterns(&self) -> &[TimestampPattern] {
        &self.patterns
    }

    /// Returns true if the line starts with a recognised timestamp. A single
    /// leading `[` or `(` is skipped so bracketed timestamps match too.
    pub fn contains_timestamp(&self, line: &str) -> bool {
        let bytes = line.as_bytes();
        let bytes = match bytes.first() {
            Some(b'[') | Some(b'(') => &bytes[1..],
            _ => bytes,
        };
        self.patterns.iter().any(|p| p.matches_prefix(bytes))
    }
}

impl Default for TimestampDetector {
    fn default() -> Self {
        Self {
            patterns: BUILTIN_PATTERNS
                .iter()
                .filter_map(|t| TimestampPattern::compile(t).ok())
                .collect(),
        }
    }
}
