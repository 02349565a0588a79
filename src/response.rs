use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::parsers::ParsedResult;

/// Caller-facing record. Every key is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResult {
    pub violation_type: String,
    pub refactored_code: String,
    pub explanation: String,
    pub total_duration_nanos: u64,
}

impl CanonicalResult {
    /// Absent fields become empty strings; nothing else changes.
    pub fn normalize(parsed: ParsedResult, total_elapsed_ns: u64) -> Self {
        Self {
            violation_type: parsed.violation_type.unwrap_or_default(),
            refactored_code: parsed.refactored_code.unwrap_or_default(),
            explanation: parsed.explanation.unwrap_or_default(),
            total_duration_nanos: total_elapsed_ns,
        }
    }
}

/// JSON envelope every tool returns as its single text content.
#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub status: &'static str,
    pub content: serde_json::Value,
    pub metadata: ToolMetadata,
}

#[derive(Debug, Default, Serialize)]
pub struct ToolMetadata {
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(serialize_with = "serialize_finite_f64")]
    pub duration_seconds: f64,
}

/// Serialize f64, clamping non-finite values (NaN, Inf) to 0.0.
fn serialize_finite_f64<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(if v.is_finite() { *v } else { 0.0 })
}

impl ToolResponse {
    pub fn success(content: serde_json::Value, metadata: ToolMetadata) -> Self {
        Self {
            status: "success",
            content,
            metadata,
        }
    }

    pub fn error(message: String, metadata: ToolMetadata) -> Self {
        Self {
            status: "error",
            content: serde_json::Value::String(message),
            metadata,
        }
    }

    /// Always an MCP-level success; failures live in `"status": "error"` so a
    /// client does not abort sibling tool calls.
    pub fn into_call_tool_result(self) -> CallToolResult {
        match serde_json::to_string(&self) {
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => {
                let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
                CallToolResult::success(vec![Content::text(format!(
                    r#"{{"status":"error","content":"serialization failed: {escaped}","metadata":{{}}}}"#
                ))])
            }
        }
    }
}
