pub mod client;
pub mod hosted;
pub mod local;

use std::future::Future;
use std::time::Instant;

use reqwest::Response;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::RefactorError;

/// Backend bodies above this size are rejected before parsing.
pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// Which kind of generation service a request goes to.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local inference server: one free-text completion per call.
    #[default]
    Local,
    /// Hosted chat-completion API: system + user messages.
    Hosted,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Hosted => "hosted",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGeneration {
    /// Generated text. Empty when the backend answered without content.
    pub text: String,
    /// Request start to body fully read.
    pub elapsed_ns: u64,
}

/// "Send a prompt, get text back" with every other parameter already bound.
/// The retry loop is written against this so tests can script responses.
pub trait Generate: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<RawGeneration, RefactorError>> + Send;
}

pub(crate) fn elapsed_nanos(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

pub(crate) fn unavailable(backend: BackendKind, err: reqwest::Error) -> RefactorError {
    RefactorError::BackendUnavailable {
        backend: backend.to_string(),
        message: err.without_url().to_string(),
    }
}

/// Read the whole body, enforcing [`MAX_RESPONSE_BYTES`], and turn non-success
/// statuses into `BackendRejected` carrying the remote body. Status is checked
/// first, so an oversized error body is still a rejection.
pub(crate) async fn read_body(
    backend: BackendKind,
    mut response: Response,
) -> Result<Vec<u8>, RefactorError> {
    let status = response.status();

    if !status.is_success() {
        // Keep whatever prefix arrived; the body is only a diagnostic here.
        let (bytes, _) = read_capped(&mut response).await.unwrap_or_default();
        return Err(RefactorError::BackendRejected {
            backend: backend.to_string(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    if let Some(len) = response.content_length()
        && len > MAX_RESPONSE_BYTES as u64
    {
        return Err(RefactorError::SchemaParse(format!(
            "{backend} response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"
        )));
    }

    let (bytes, overflowed) = read_capped(&mut response)
        .await
        .map_err(|e| unavailable(backend, e))?;
    if overflowed {
        return Err(RefactorError::SchemaParse(format!(
            "{backend} response too large: exceeds {MAX_RESPONSE_BYTES} bytes"
        )));
    }
    Ok(bytes)
}

/// Read chunks until the body ends or passes [`MAX_RESPONSE_BYTES`]. The flag
/// is set when reading stopped early; the buffer is then cut to the cap.
async fn read_capped(response: &mut Response) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buf.extend_from_slice(&chunk);
        if buf.len() > MAX_RESPONSE_BYTES {
            let seen = buf.len();
            buf.truncate(MAX_RESPONSE_BYTES);
            tracing::debug!(seen, "response body exceeds cap, stopped reading");
            return Ok((buf, true));
        }
    }
    Ok((buf, false))
}

/// Deserialize a success body, mapping failures to `SchemaParse`.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    backend: BackendKind,
    bytes: &[u8],
) -> Result<T, RefactorError> {
    serde_json::from_slice(bytes)
        .map_err(|e| RefactorError::SchemaParse(format!("failed to parse {backend} response: {e}")))
}
