//! First-line classification: does a physical line open a new logical record?
//!
//! The policy is an ordered rule table. Rules are evaluated top to bottom and
//! the first matching rule decides; a line matching no rule is a first line.

/// Outcome of a classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The line opens a new logical record
    FirstLine,
    /// The line belongs to the currently open record
    Continuation,
}

/// One entry of the classification policy.
pub struct FirstLineRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub kind: LineKind,
}

impl std::fmt::Debug for FirstLineRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirstLineRule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

pub const FIRST_LINE_RULES: &[FirstLineRule] = &[
    FirstLineRule {
        name: "empty",
        matches: str::is_empty,
        kind: LineKind::Continuation,
    },
    // Closes a multi-line structured block opened earlier
    FirstLineRule {
        name: "closing_brace",
        matches: |l| l == "}",
        kind: LineKind::Continuation,
    },
    FirstLineRule {
        name: "tab_indent",
        matches: |l| l.starts_with('\t'),
        kind: LineKind::Continuation,
    },
    FirstLineRule {
        name: "space_indent",
        matches: |l| l.starts_with("  "),
        kind: LineKind::Continuation,
    },
    // Chained exception
    FirstLineRule {
        name: "caused_by",
        matches: |l| l.starts_with("Caused by: "),
        kind: LineKind::Continuation,
    },
    // RPC call-site continuation
    FirstLineRule {
        name: "call_site",
        matches: |l| l.starts_with("for call at"),
        kind: LineKind::Continuation,
    },
];

/// The first rule matching `line`, if any.
pub fn matching_rule(line: &str) -> Option<&'static FirstLineRule> {
    FIRST_LINE_RULES.iter().find(|rule| (rule.matches)(line))
}

pub fn classify_line(line: &str) -> LineKind {
    matching_rule(line)
        .map(|rule| rule.kind)
        .unwrap_or(LineKind::FirstLine)
}

/// Returns true if `line` begins a new logical record.
pub fn is_first_line(line: &str) -> bool {
    classify_line(line) == LineKind::FirstLine
}
