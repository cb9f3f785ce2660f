//! Version constraint matching for release-gated benchmarks.
//!
//! A constraint is `>=V`, `>V`, a bare `V` (exact match), or empty (always
//! matches). Both the constraint literal and the candidate tag may carry a
//! leading `v` and surrounding whitespace.
//!
//! Unparseable versions never raise: they compare as `0.0.0`. Callers that
//! need strict validation should check [`ParsedVersion::is_parsed`] first.

use std::cmp::Ordering;

use semver::Version;

/// Result of parsing a version literal. `Unparsed` keeps the raw input and
/// behaves as the zero version in comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedVersion {
    Parsed(Version),
    Unparsed(String),
}

impl ParsedVersion {
    pub fn parse(raw: &str) -> Self {
        let literal = strip_prefix(raw);
        match Version::parse(literal) {
            Ok(v) => ParsedVersion::Parsed(v),
            Err(_) => ParsedVersion::Unparsed(raw.to_string()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedVersion::Parsed(_))
    }

    /// The version used for ordering; zero when unparsed.
    pub fn version(&self) -> Version {
        match self {
            ParsedVersion::Parsed(v) => v.clone(),
            ParsedVersion::Unparsed(_) => Version::new(0, 0, 0),
        }
    }

    /// Semantic-version precedence (build metadata ignored).
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.version().cmp_precedence(&other.version())
    }
}

/// Trim whitespace and drop one leading `v`.
pub fn strip_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Any,
    AtLeast,
    GreaterThan,
    Exact,
}

fn split_operator(constraint: &str) -> (Operator, &str) {
    let c = constraint.trim();
    if c.is_empty() {
        (Operator::Any, c)
    } else if let Some(rest) = c.strip_prefix(">=") {
        (Operator::AtLeast, rest)
    } else if let Some(rest) = c.strip_prefix('>') {
        (Operator::GreaterThan, rest)
    } else {
        (Operator::Exact, c)
    }
}

/// Does `tag` satisfy `constraint`?
pub fn matches(constraint: &str, tag: &str) -> bool {
    let (op, literal) = split_operator(constraint);
    if op == Operator::Any {
        return true;
    }

    let wanted = ParsedVersion::parse(literal);
    let candidate = ParsedVersion::parse(tag);
    let ord = candidate.cmp_precedence(&wanted);

    match op {
        Operator::Any => true,
        Operator::AtLeast => ord != Ordering::Less,
        Operator::GreaterThan => ord == Ordering::Greater,
        Operator::Exact => ord == Ordering::Equal,
    }
}
