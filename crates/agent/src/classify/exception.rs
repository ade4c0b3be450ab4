/// Line prefixes that mark a record as an exception trace. Checked after
/// leading whitespace is removed.
pub const EXCEPTION_MARKERS: &[&str] = &[
    "Caused by: ",
    "Traceback (most recent call last)",
    "for call at",
];

/// Class-name suffixes of exception types (Java, Python, .NET, JS conventions).
pub const EXCEPTION_SUFFIXES: &[&str] = &["Exception", "Error"];

/// Stack frame prefix; only counted on indented lines.
const FRAME_PREFIX: &str = "at ";

/// Result of scanning a record for an exception.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionScan {
    pub is_exception: bool,
    pub exception_type: Option<String>,
}

fn is_class_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

fn is_exception_class(token: &str, suffixes: &[&str]) -> bool {
    let segment = token.rsplit('.').next().unwrap_or("");
    segment.starts_with(|c: char| c.is_ascii_uppercase())
        && suffixes
            .iter()
            .any(|suffix| segment.len() > suffix.len() && segment.ends_with(*suffix))
}

/// Class-name-like tokens in `line` ending with one of `suffixes`, e.g.
/// `java.lang.NullPointerException` or `ValueError`, each paired with the text
/// that follows it. The last `.` segment must start with an uppercase letter
/// and carry more than just the suffix.
fn class_name_tokens<'a>(
    line: &'a str,
    suffixes: &'a [&'a str],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    let mut rest = line;
    std::iter::from_fn(move || loop {
        let start = rest.find(is_class_name_char)?;
        let tail = &rest[start..];
        let end = tail.find(|c: char| !is_class_name_char(c)).unwrap_or(tail.len());
        let token = tail[..end].trim_end_matches('.');
        rest = &tail[end..];
        if is_exception_class(token, suffixes) {
            return Some((token, rest));
        }
    })
}

/// A type named on its own line, or followed by `:` as in `ValueError: bad input`.
fn is_exception_header(line: &str, token: &str, after: &str) -> bool {
    after.starts_with(':') || line.trim() == token
}

fn has_marker(line: &str, markers: &[&str]) -> bool {
    let trimmed = line.trim_start();
    let indented = trimmed.len() < line.len();
    markers.iter().any(|m| trimmed.starts_with(*m))
        || (indented && trimmed.starts_with(FRAME_PREFIX))
}

/// Scan the whole record.
///
/// A marker line (stack frame, `Caused by: `, traceback header) flags the
/// record, and then the first class-name token anywhere is its type. Without
/// a marker only a header-shaped token counts, so prose such as
/// `handles TimeoutError` does not make a record an exception.
pub fn detect_exception_with(text: &str, markers: &[&str], suffixes: &[&str]) -> ExceptionScan {
    let has_stack = text.split('\n').any(|line| has_marker(line, markers));

    let exception_type = text.split('\n').find_map(|line| {
        class_name_tokens(line, suffixes)
            .find(|&(token, after)| has_stack || is_exception_header(line, token, after))
            .map(|(token, _)| token.to_string())
    });

    ExceptionScan {
        is_exception: has_stack || exception_type.is_some(),
        exception_type,
    }
}

pub fn detect_exception(text: &str) -> ExceptionScan {
    detect_exception_with(text, EXCEPTION_MARKERS, EXCEPTION_SUFFIXES)
}
