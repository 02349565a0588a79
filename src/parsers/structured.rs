use serde::Deserialize;

use crate::parsers::{ParsedResult, canonical_violation, non_blank};

/// Wire shape of the structured response. Aliases cover the camelCase and
/// short spellings models commonly substitute; extra keys are ignored.
#[derive(Deserialize)]
struct StructuredResponse {
    #[serde(alias = "violationType", alias = "violation")]
    violation_type: Option<String>,
    #[serde(alias = "refactoredCode")]
    refactored_code: Option<String>,
    explanation: Option<String>,
}

/// Strict tier: the whole text (optionally one ```json fence around all of it)
/// must deserialize as the response object. `None` means "not structured".
pub fn parse(raw: &str) -> Option<ParsedResult> {
    let body = unwrap_json_fence(raw.trim());
    if !body.starts_with('{') {
        return None;
    }

    let parsed: StructuredResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!("structured parse rejected response: {e}");
            return None;
        }
    };

    // An object with none of the known keys is some other JSON, not our response.
    if parsed.violation_type.is_none()
        && parsed.refactored_code.is_none()
        && parsed.explanation.is_none()
    {
        return None;
    }

    Some(ParsedResult {
        violation_type: parsed.violation_type.as_deref().and_then(canonical_violation),
        refactored_code: parsed.refactored_code.as_deref().and_then(non_blank),
        explanation: parsed.explanation.as_deref().and_then(non_blank),
    })
}

/// Strip a single fence that wraps the entire text, e.g. "```json\n{..}\n```".
fn unwrap_json_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    let (tag, body) = inner.split_once('\n').unwrap_or(("", inner));
    let tag = tag.trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return text;
    }
    if body.contains("```") {
        return text;
    }
    body.trim()
}
