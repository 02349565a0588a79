//! The three-part output contract every template embeds, and the matching
//! JSON schema handed to backends that accept one.

use serde_json::{Value, json};

/// Field names of the structured response object.
pub const FIELD_VIOLATION: &str = "violation_type";
pub const FIELD_CODE: &str = "refactored_code";
pub const FIELD_EXPLANATION: &str = "explanation";

/// Output-format block: a bold violation marker, a fenced code block tagged with
/// the lower-cased language, then the explanation.
pub fn output_contract(language: &str) -> String {
    let fence = language.trim().to_lowercase();
    format!(
        "**Important:** Your output must follow *exactly* this format, with no additional commentary before or after.\n\n\
         **<VIOLATION TYPE>**\n\
         ```{fence}\n\
         <Refactored code>\n\
         ```\n\
         <Explanation of the refactoring>\n\n\
         Only output the text above. Do not include extra analysis or preamble.\n"
    )
}

/// JSON schema for `{violation_type, refactored_code, explanation}`.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            FIELD_VIOLATION: { "type": "string" },
            FIELD_CODE: { "type": "string" },
            FIELD_EXPLANATION: { "type": "string" }
        },
        "required": [FIELD_VIOLATION, FIELD_CODE, FIELD_EXPLANATION]
    })
}

/// System message carrying the schema for chat-style backends.
pub fn schema_instruction() -> String {
    format!(
        "Please respond using this JSON structure:\n{}",
        response_schema()
    )
}
