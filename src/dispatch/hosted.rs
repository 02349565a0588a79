use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::dispatch::{BackendKind, RawGeneration, decode, elapsed_nanos, read_body, unavailable};
use crate::error::RefactorError;
use crate::strategies::schema_instruction;

const BACKEND: BackendKind = BackendKind::Hosted;

/// Hosted chat-completion API (`/v1/chat/completions`, bearer auth).
pub struct HostedBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelObject>,
}

#[derive(Deserialize)]
struct ModelObject {
    id: String,
}

impl HostedBackend {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn request_body(&self, model: &str, prompt: &str, temperature: f64) -> serde_json::Value {
        json!({
            "model": model,
            "temperature": temperature,
            "messages": [
                {"role": "system", "content": schema_instruction()},
                {"role": "user", "content": prompt}
            ]
        })
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<RawGeneration, RefactorError> {
        let body = self.request_body(model, prompt, temperature);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(BACKEND, e))?;
        let bytes = read_body(BACKEND, response).await?;
        let elapsed_ns = elapsed_nanos(start);

        let completion: ChatCompletion = decode(BACKEND, &bytes)?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            tracing::warn!(model, "hosted backend returned empty choices or null content");
        }

        Ok(RawGeneration { text, elapsed_ns })
    }

    /// Model ids the API reports, unfiltered.
    pub async fn list_models(&self) -> Result<Vec<String>, RefactorError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| unavailable(BACKEND, e))?;
        let bytes = read_body(BACKEND, response).await?;
        let list: ModelList = decode(BACKEND, &bytes)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

impl std::fmt::Debug for HostedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
