//! Recovery tier for responses that are not a bare structured object.
//!
//! Best effort by nature: each field is located independently and left absent
//! when it cannot be found. Rules, in order of precedence:
//! - a fenced or inline JSON object that the strict tier accepts wins outright;
//! - violation: the first `**token**`/`__token__` outside code that names a
//!   known principle (or NONE), else a heading or first line naming one, else
//!   the first emphasized token;
//! - code: the first block fenced with the request language, else the first
//!   tagged block, else the first block;
//! - explanation: text after the last closing fence, or after the violation
//!   marker when the response has no code at all.

use std::sync::LazyLock;

use regex::Regex;

use crate::parsers::{ParsedResult, canonical_violation, non_blank, structured};

const FENCE: &str = "```";

const MAX_MARKER_WORDS: usize = 6;

const KNOWN_VIOLATIONS: [&str; 6] = ["SRP", "OCP", "LSP", "ISP", "DIP", "NONE"];

// Static literal patterns; compilation cannot fail.
static FENCED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([\w+#.-]*)[ \t]*\r?\n(.*?)```").expect("fenced block regex")
});

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^*\n]{1,80})\*\*").expect("bold marker regex")
});

static UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__([^_\n]{1,80})__").expect("underscore marker regex")
});

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+$").expect("identifier regex")
});

/// `### SRP`, `Violation: OCP`, or a bare token on its own line.
static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#*\s*(?:[\w ]+:\s*)?(\S.*)$").expect("label line regex")
});

#[derive(Debug)]
struct FencedBlock<'a> {
    tag: &'a str,
    body: &'a str,
    /// Byte offset of the opening fence.
    open: usize,
    /// Byte offset just past the closing fence.
    close_end: usize,
}

pub fn parse(raw: &str, language: Option<&str>) -> ParsedResult {
    let blocks = fenced_blocks(raw);

    if let Some(embedded) = embedded_structured(raw, &blocks) {
        return embedded;
    }

    let prose = prose_segments(raw, &blocks);
    let prose_end = prose.last().map_or(raw.len(), |(offset, text)| offset + text.len());
    let marker = find_marker(&prose);
    let violation_type = marker.as_ref().and_then(|(token, _)| canonical_violation(token));

    let refactored_code = select_code_block(&blocks, language).and_then(|b| clean_code(b.body));

    let explanation = match blocks.last() {
        Some(last) => clean_explanation(&raw[last.close_end..]),
        None => marker.and_then(|(_, end)| clean_explanation(&raw[end..prose_end.max(end)])),
    };

    ParsedResult {
        violation_type,
        refactored_code,
        explanation,
    }
}

/// Closed fences in order. A trailing unclosed fence never matches.
fn fenced_blocks(raw: &str) -> Vec<FencedBlock<'_>> {
    FENCED_BLOCK_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(FencedBlock {
                tag: caps.get(1).map_or("", |m| m.as_str()),
                body: caps.get(2).map_or("", |m| m.as_str()),
                open: whole.start(),
                close_end: whole.end(),
            })
        })
        .collect()
}

/// Structured output wrapped in prose: a json-tagged (or untagged) fenced
/// object, or the outermost `{...}` span of the text.
fn embedded_structured(raw: &str, blocks: &[FencedBlock<'_>]) -> Option<ParsedResult> {
    let fenced = blocks
        .iter()
        .filter(|b| b.tag.is_empty() || b.tag.eq_ignore_ascii_case("json"))
        .find_map(|b| structured::parse(b.body));
    if fenced.is_some() {
        return fenced;
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    structured::parse(&raw[start..=end])
}

/// Text outside fenced blocks, with each segment's byte offset into `raw`.
fn prose_segments<'a>(raw: &'a str, blocks: &[FencedBlock<'a>]) -> Vec<(usize, &'a str)> {
    let mut segments = Vec::with_capacity(blocks.len() + 1);
    let mut cursor = 0;
    for block in blocks {
        segments.push((cursor, &raw[cursor..block.open]));
        cursor = block.close_end;
    }
    // Text after an unclosed fence is code, not prose.
    let tail_end = raw[cursor..]
        .find(FENCE)
        .map_or(raw.len(), |i| cursor + i);
    segments.push((cursor, &raw[cursor..tail_end]));
    segments
}

/// Locate the violation marker. Returns the token and the byte offset just
/// past it in `raw`.
fn find_marker(prose: &[(usize, &str)]) -> Option<(String, usize)> {
    let emphasized: Vec<(String, usize)> = prose
        .iter()
        .flat_map(|(offset, text)| emphasized_tokens(text, *offset))
        .collect();

    if let Some(known) = emphasized.iter().find(|(token, _)| is_known_violation(token)) {
        return Some(known.clone());
    }
    let plain = prose
        .first()
        .and_then(|(offset, first)| plain_marker(first, *offset));
    plain.or_else(|| emphasized.into_iter().next())
}

/// `**token**` and `__token__` spans that look like a label, ordered by position.
/// An underscore span that is a bare identifier (`__init__`) is a Python name,
/// not emphasis, unless it names a known violation.
fn emphasized_tokens(text: &str, offset: usize) -> Vec<(String, usize)> {
    let bold = BOLD_RE.captures_iter(text).map(|caps| (caps, false));
    let underscore = UNDERSCORE_RE.captures_iter(text).map(|caps| (caps, true));

    let mut found: Vec<(String, usize)> = bold
        .chain(underscore)
        .filter_map(|(caps, underscored)| {
            let end = caps.get(0)?.end();
            let inner = caps.get(1)?.as_str().trim();
            if !is_marker_token(inner) {
                return None;
            }
            if underscored && IDENTIFIER_RE.is_match(inner) && !is_known_violation(inner) {
                return None;
            }
            Some((inner.to_string(), offset + end))
        })
        .collect();
    found.sort_by_key(|(_, end)| *end);
    found
}

fn is_known_violation(token: &str) -> bool {
    canonical_violation(token)
        .is_some_and(|v| KNOWN_VIOLATIONS.iter().any(|k| v.eq_ignore_ascii_case(k)))
}

/// A heading (`### SRP`) or a first line such as `Violation: OCP`. Without
/// emphasis only a known principle counts, so plain prose is never a marker.
fn plain_marker(text: &str, offset: usize) -> Option<(String, usize)> {
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            line_start = line_end;
            continue;
        }
        let unemphasized = trimmed.replace("**", "");
        let token = LABEL_LINE_RE
            .captures(unemphasized.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_matches(|c| c == '*' || c == '_').trim().to_string())?;
        return (is_marker_token(&token) && is_known_violation(&token))
            .then(|| (token, offset + line_end));
    }
    None
}

fn is_marker_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty()
        && !token.starts_with('<')
        && token.split_whitespace().count() <= MAX_MARKER_WORDS
}

fn select_code_block<'a, 'b>(
    blocks: &'b [FencedBlock<'a>],
    language: Option<&str>,
) -> Option<&'b FencedBlock<'a>> {
    let code_blocks = || blocks.iter().filter(|b| !b.tag.eq_ignore_ascii_case("json"));
    language
        .and_then(|lang| code_blocks().find(|b| b.tag.eq_ignore_ascii_case(lang)))
        .or_else(|| code_blocks().find(|b| !b.tag.is_empty()))
        .or_else(|| code_blocks().next())
}

/// Drop surrounding blank lines but keep the first line's indentation.
fn clean_code(body: &str) -> Option<String> {
    let body = body.trim_start_matches(['\n', '\r']).trim_end();
    (!body.trim().is_empty()).then(|| body.to_string())
}

/// Strip emphasis and a leading "Explanation:" label.
fn clean_explanation(text: &str) -> Option<String> {
    let stripped = text.replace("**", "");
    let stripped = stripped.trim().trim_matches(|c| c == '*' || c == '_').trim();
    let stripped = match stripped.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("explanation") => rest,
        _ => stripped,
    };
    non_blank(stripped)
}
