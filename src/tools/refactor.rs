use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::dispatch::BackendKind;
use crate::service::PromptRequest;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefactorRequest {
    /// Model id from `listmodels` for the chosen backend. Use exact names.
    #[serde(default)]
    pub model: String,
    /// Strategy id from `liststrategies` (e.g. "DEFAULT", "ENSEMBLE"). Unknown ids use DEFAULT.
    #[serde(default)]
    pub strategy: String,
    /// The source code fragment to analyze.
    #[serde(default)]
    pub source: String,
    /// Language of the source (e.g. "Java", "Python"). Tags the code fence the model must emit.
    #[serde(default)]
    pub language: String,
    /// Sampling temperature between 0.0 (deterministic) and 1.0.
    pub temperature: Option<f64>,
    /// Attempts allowed until the model returns a well-formed answer (default 1).
    #[serde(alias = "maxAttempts")]
    pub max_attempts: Option<u32>,
    /// "local" (default) for the local inference server, "hosted" for the chat-completion API.
    pub backend: Option<BackendKind>,
    /// Violation type to hand the model, for the KNOWN strategy (e.g. "OCP").
    #[serde(alias = "violationHint")]
    pub violation_hint: Option<String>,
    /// Whole-request deadline in seconds, covering every attempt. Defaults to server config.
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

impl RefactorRequest {
    /// Shape the tool parameters into the core request. Validation happens in
    /// the service so every entry point shares it.
    pub fn into_prompt_request(self) -> PromptRequest {
        PromptRequest {
            model: self.model,
            strategy: self.strategy,
            source: self.source,
            language: self.language,
            temperature: self.temperature,
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            backend: self.backend.unwrap_or_default(),
            violation_hint: self.violation_hint.filter(|h| !h.trim().is_empty()),
            timeout: self
                .timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }
}
