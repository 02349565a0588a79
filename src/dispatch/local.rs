use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::dispatch::{BackendKind, RawGeneration, decode, elapsed_nanos, read_body, unavailable};
use crate::error::RefactorError;
use crate::strategies::response_schema;

const BACKEND: BackendKind = BackendKind::Local;

/// Local inference server speaking the `/api/generate` completion protocol.
pub struct LocalBackend {
    client: Client,
    base_url: String,
    schema_hint: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl LocalBackend {
    /// `schema_hint` adds the response schema as the `format` field; servers
    /// that do not support structured output ignore it.
    pub fn new(client: Client, base_url: &str, schema_hint: bool) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            schema_hint,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_body(&self, model: &str, prompt: &str, temperature: f64) -> serde_json::Value {
        let mut body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": temperature }
        });
        if self.schema_hint {
            body["format"] = response_schema();
        }
        body
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<RawGeneration, RefactorError> {
        let body = self.request_body(model, prompt, temperature);
        let url = format!("{}/api/generate", self.base_url);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(BACKEND, e))?;
        let bytes = read_body(BACKEND, response).await?;
        let elapsed_ns = elapsed_nanos(start);

        let completion: CompletionResponse = decode(BACKEND, &bytes)?;
        let text = completion.response.unwrap_or_default();
        if text.is_empty() {
            tracing::warn!(model, "local backend returned no response text");
        }

        Ok(RawGeneration { text, elapsed_ns })
    }

    /// Model names the server reports, unfiltered, in server order.
    pub async fn list_models(&self) -> Result<Vec<String>, RefactorError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(BACKEND, e))?;
        let bytes = read_body(BACKEND, response).await?;
        let tags: TagsResponse = decode(BACKEND, &bytes)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
