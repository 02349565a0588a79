use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::dispatch::hosted::HostedBackend;
use crate::dispatch::local::LocalBackend;
use crate::dispatch::{BackendKind, Generate, RawGeneration};
use crate::error::RefactorError;
use crate::filter::ModelFilter;

/// Routes generation and model listing to the backend a request names.
///
/// Holds no per-request state; one instance serves every request.
pub struct GenerationClient {
    local: LocalBackend,
    hosted: Option<HostedBackend>,
    local_filter: ModelFilter,
    hosted_filter: ModelFilter,
}

impl GenerationClient {
    pub fn new(
        local: LocalBackend,
        hosted: Option<HostedBackend>,
        local_filter: ModelFilter,
        hosted_filter: ModelFilter,
    ) -> Self {
        Self {
            local,
            hosted,
            local_filter,
            hosted_filter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RefactorError> {
        let http = build_http_client()?;
        let local = LocalBackend::new(http.clone(), &config.local_url, config.schema_hint);
        let hosted = config
            .hosted_api_key
            .as_deref()
            .map(|key| HostedBackend::new(http, &config.hosted_url, key));
        if hosted.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, hosted backend unavailable");
        }
        Ok(Self::new(
            local,
            hosted,
            config.local_filter.clone(),
            config.hosted_filter.clone(),
        ))
    }

    fn hosted(&self) -> Result<&HostedBackend, RefactorError> {
        self.hosted
            .as_ref()
            .ok_or_else(|| RefactorError::BackendNotConfigured {
                backend: BackendKind::Hosted.to_string(),
            })
    }

    pub fn filter(&self, backend: BackendKind) -> &ModelFilter {
        match backend {
            BackendKind::Local => &self.local_filter,
            BackendKind::Hosted => &self.hosted_filter,
        }
    }

    pub fn is_configured(&self, backend: BackendKind) -> bool {
        match backend {
            BackendKind::Local => true,
            BackendKind::Hosted => self.hosted.is_some(),
        }
    }

    pub async fn generate(
        &self,
        backend: BackendKind,
        model: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<RawGeneration, RefactorError> {
        tracing::debug!(%backend, model, prompt_bytes = prompt.len(), "dispatching prompt");
        let result = match backend {
            BackendKind::Local => self.local.generate(model, prompt, temperature).await,
            BackendKind::Hosted => self.hosted()?.generate(model, prompt, temperature).await,
        };
        match &result {
            Ok(raw) => tracing::debug!(
                %backend,
                model,
                elapsed_ms = raw.elapsed_ns / 1_000_000,
                text_bytes = raw.text.len(),
                "generation complete"
            ),
            Err(e) => tracing::warn!(%backend, model, "generation failed: {e}"),
        }
        result
    }

    /// Backend-reported models that pass this backend's filter, sorted.
    pub async fn list_models(&self, backend: BackendKind) -> Result<Vec<String>, RefactorError> {
        let reported = match backend {
            BackendKind::Local => self.local.list_models().await?,
            BackendKind::Hosted => self.hosted()?.list_models().await?,
        };
        let total = reported.len();
        let kept = self.filter(backend).apply(reported);
        tracing::debug!(%backend, total, kept = kept.len(), "listed models");
        Ok(kept)
    }

    /// Bind backend, model and temperature so the retry loop only supplies prompts.
    pub fn target<'a>(
        &'a self,
        backend: BackendKind,
        model: &'a str,
        temperature: f64,
    ) -> ModelTarget<'a> {
        ModelTarget {
            client: self,
            backend,
            model,
            temperature,
        }
    }
}

/// A [`GenerationClient`] with everything but the prompt fixed.
pub struct ModelTarget<'a> {
    client: &'a GenerationClient,
    backend: BackendKind,
    model: &'a str,
    temperature: f64,
}

impl Generate for ModelTarget<'_> {
    async fn generate(&self, prompt: &str) -> Result<RawGeneration, RefactorError> {
        self.client
            .generate(self.backend, self.model, prompt, self.temperature)
            .await
    }
}

fn build_http_client() -> Result<Client, RefactorError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| RefactorError::BackendUnavailable {
            backend: "http".to_string(),
            message: format!("failed to build HTTP client: {e}"),
        })
}
