//! Turns free-form model output into a [`ParsedResult`].
//!
//! Two tiers run in order: a strict parse of the whole text as the structured
//! response object, then a heuristic recovery parse over markdown-ish text.
//! Parsing never fails; when nothing can be recovered the raw text comes back
//! as the explanation.

pub mod heuristic;
pub mod structured;

/// Extracted judgment. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResult {
    pub violation_type: Option<String>,
    pub refactored_code: Option<String>,
    pub explanation: Option<String>,
}

impl ParsedResult {
    /// Valid iff all three fields are present and non-blank.
    pub fn is_valid(&self) -> bool {
        [
            &self.violation_type,
            &self.refactored_code,
            &self.explanation,
        ]
        .iter()
        .all(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// Raw text as explanation, nothing else. Never valid.
    pub fn unstructured(raw: &str) -> Self {
        Self {
            violation_type: None,
            refactored_code: None,
            explanation: Some(raw.to_string()),
        }
    }

    fn is_empty(&self) -> bool {
        self.violation_type.is_none() && self.refactored_code.is_none() && self.explanation.is_none()
    }
}

/// Which tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Structured,
    Heuristic,
    Unstructured,
}

/// Stateless two-tier parser. The language only steers which fenced block
/// the recovery tier prefers.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    language: Option<String>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_language(language: &str) -> Self {
        let language = language.trim();
        Self {
            language: (!language.is_empty()).then(|| language.to_lowercase()),
        }
    }

    pub fn parse(&self, raw: &str) -> ParsedResult {
        self.parse_with_tier(raw).0
    }

    pub fn parse_with_tier(&self, raw: &str) -> (ParsedResult, ParseTier) {
        if let Some(result) = structured::parse(raw) {
            return (result, ParseTier::Structured);
        }

        let recovered = heuristic::parse(raw, self.language.as_deref());
        if recovered.is_empty() {
            return (ParsedResult::unstructured(raw), ParseTier::Unstructured);
        }
        (recovered, ParseTier::Heuristic)
    }
}

const PRINCIPLES: [(&str, &str); 5] = [
    ("single responsibility principle", "SRP"),
    ("open-closed principle", "OCP"),
    ("liskov substitution principle", "LSP"),
    ("interface segregation principle", "ISP"),
    ("dependency inversion principle", "DIP"),
];

/// Clean up a violation token: drop wrapping quotes and trailing `:`/`.`,
/// map full principle names to their acronym, keep anything else verbatim.
pub fn canonical_violation(token: &str) -> Option<String> {
    let cleaned = token
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim_end_matches([':', '.'])
        .trim();
    if cleaned.is_empty() {
        return None;
    }

    let folded = cleaned
        .to_lowercase()
        .replace("open/closed", "open-closed")
        .replace("open closed", "open-closed");
    let folded = folded.trim_start_matches("the ");
    for (name, acronym) in PRINCIPLES {
        let short = name.trim_end_matches(" principle");
        if folded == name || folded == short {
            return Some(acronym.to_string());
        }
        if let Some(rest) = folded.strip_prefix(name)
            && rest.trim_start().starts_with('(')
        {
            return Some(acronym.to_string());
        }
    }
    Some(cleaned.to_string())
}

/// `Some(trimmed)` for non-blank text.
fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
