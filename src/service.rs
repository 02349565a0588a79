//! Request-scoped orchestration: validate → render prompt → retry loop →
//! normalize. Holds no mutable state, so one instance serves concurrent
//! requests.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::client::GenerationClient;
use crate::dispatch::{BackendKind, Generate};
use crate::error::RefactorError;
use crate::parsers::ResponseParser;
use crate::response::CanonicalResult;
use crate::retry::{RetryController, RetryOutcome};
use crate::strategies::StrategyCatalog;

/// Longest whole-request deadline a caller may ask for.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// One caller job. Never mutated after validation.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub model: String,
    pub strategy: String,
    pub source: String,
    pub language: String,
    pub temperature: Option<f64>,
    pub max_attempts: u32,
    pub backend: BackendKind,
    /// Appended to the source so the model knows the violation up front.
    pub violation_hint: Option<String>,
    /// Overrides the service's default whole-request deadline.
    pub timeout: Option<Duration>,
}

impl PromptRequest {
    /// Reject requests the core cannot run, before any backend call.
    pub fn validate(&self, max_attempts_cap: u32) -> Result<f64, RefactorError> {
        let malformed = |msg: String| Err(RefactorError::MalformedRequest(msg));

        if self.model.trim().is_empty() {
            return malformed("model must not be empty".to_string());
        }
        if self.source.trim().is_empty() {
            return malformed("source must not be empty".to_string());
        }
        if self.language.trim().is_empty() {
            return malformed("language must not be empty".to_string());
        }
        let Some(temperature) = self.temperature else {
            return malformed("temperature is required".to_string());
        };
        if !temperature.is_finite() || !(0.0..=1.0).contains(&temperature) {
            return malformed(format!(
                "temperature must be between 0.0 and 1.0, got {temperature}"
            ));
        }
        if self.max_attempts == 0 {
            return malformed("max_attempts must be at least 1".to_string());
        }
        if self.max_attempts > max_attempts_cap {
            return malformed(format!(
                "max_attempts must be at most {max_attempts_cap}, got {}",
                self.max_attempts
            ));
        }
        if let Some(timeout) = self.timeout
            && timeout > MAX_REQUEST_TIMEOUT
        {
            return malformed(format!(
                "timeout must be at most {}s, got {}s",
                MAX_REQUEST_TIMEOUT.as_secs(),
                timeout.as_secs()
            ));
        }
        Ok(temperature)
    }

    /// Source as handed to the template, with the violation hint appended.
    pub fn source_for_prompt(&self) -> String {
        match &self.violation_hint {
            Some(hint) => format!(
                "{}\n\nThis code has the following violation type: {}",
                self.source,
                hint.trim()
            ),
            None => self.source.clone(),
        }
    }
}

/// Final result plus the diagnostics behind it.
#[derive(Debug, Clone)]
pub struct RefactorOutcome {
    pub result: CanonicalResult,
    pub attempts: RetryOutcome,
    /// Id of the strategy actually used (after default fallback).
    pub strategy: &'static str,
}

impl RefactorOutcome {
    pub fn attempts_used(&self) -> u32 {
        self.attempts.attempts_used()
    }

    pub fn is_valid(&self) -> bool {
        self.attempts.is_valid()
    }
}

pub struct RefactorService {
    catalog: StrategyCatalog,
    client: GenerationClient,
    max_attempts_cap: u32,
    request_timeout: Duration,
}

impl RefactorService {
    pub fn new(
        catalog: StrategyCatalog,
        client: GenerationClient,
        max_attempts_cap: u32,
        request_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            client,
            max_attempts_cap: max_attempts_cap.max(1),
            request_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RefactorError> {
        Ok(Self::new(
            StrategyCatalog::builtin(),
            GenerationClient::from_config(config)?,
            config.max_attempts_cap,
            config.request_timeout,
        ))
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn list_strategies(&self) -> Vec<&'static str> {
        self.catalog.list_strategy_ids()
    }

    /// Models the backend reports, pruned by that backend's allow-list.
    pub async fn list_models(&self, backend: BackendKind) -> Result<Vec<String>, RefactorError> {
        self.client.list_models(backend).await
    }

    /// The exact prompt text a request sends, and the strategy that produced it.
    pub fn build_prompt(&self, req: &PromptRequest) -> (&'static str, String) {
        self.catalog
            .build_prompt(&req.strategy, &req.source_for_prompt(), req.language.trim())
    }

    /// Run a request against the configured backends.
    pub async fn refactor(
        &self,
        req: &PromptRequest,
        cancellation_token: Option<CancellationToken>,
    ) -> Result<RefactorOutcome, RefactorError> {
        let temperature = req.validate(self.max_attempts_cap)?;
        let target = self.client.target(req.backend, &req.model, temperature);
        self.refactor_with(req, &target, cancellation_token).await
    }

    /// Run a request against any generator. The request is validated here too,
    /// so direct callers get the same guarantees.
    pub async fn refactor_with<G: Generate>(
        &self,
        req: &PromptRequest,
        generator: &G,
        cancellation_token: Option<CancellationToken>,
    ) -> Result<RefactorOutcome, RefactorError> {
        req.validate(self.max_attempts_cap)?;

        let (strategy, prompt) = self.build_prompt(req);
        let deadline = Instant::now().checked_add(req.timeout.unwrap_or(self.request_timeout));
        tracing::info!(
            model = %req.model,
            backend = %req.backend,
            strategy,
            max_attempts = req.max_attempts,
            prompt_bytes = prompt.len(),
            "refactor request"
        );

        let mut controller = RetryController::new(req.max_attempts);
        match deadline {
            Some(deadline) => controller = controller.with_deadline(deadline),
            None => tracing::warn!("request deadline out of range, running without one"),
        }
        if let Some(token) = cancellation_token {
            controller = controller.with_cancellation(token);
        }
        let parser = ResponseParser::for_language(&req.language);
        let attempts = controller.run(generator, &parser, &prompt).await?;

        let result = CanonicalResult::normalize(attempts.last.parsed.clone(), attempts.total_elapsed_ns());
        tracing::info!(
            attempts = attempts.attempts_used(),
            valid = attempts.is_valid(),
            violation = %result.violation_type,
            "refactor complete"
        );

        Ok(RefactorOutcome {
            result,
            attempts,
            strategy,
        })
    }
}
