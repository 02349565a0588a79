use thiserror::Error;

/// Max characters of a remote error body kept in a caller-facing message.
const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("{backend} backend unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    #[error("{backend} backend rejected request with status {status}: {body}")]
    BackendRejected {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("{backend} backend is not configured")]
    BackendNotConfigured { backend: String },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("cancelled after {0}ms")]
    Cancelled(u64),
}

impl RefactorError {
    /// Backend name for variants raised at the generation boundary.
    pub fn backend(&self) -> Option<&str> {
        match self {
            Self::BackendUnavailable { backend, .. } => Some(backend),
            Self::BackendRejected { backend, .. } => Some(backend),
            Self::BackendNotConfigured { backend } => Some(backend),
            _ => None,
        }
    }

    /// Infrastructure and request failures are never retried by the core.
    /// Only parse invalidity triggers another attempt, and that is not an error.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Sanitized message for callers. Never includes URLs or connection details;
    /// remote error bodies are cut to a short preview.
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedRequest(msg) => format!("malformed request: {msg}"),
            Self::BackendUnavailable { backend, .. } => {
                format!("{backend} backend is unreachable")
            }
            Self::BackendRejected {
                backend,
                status,
                body,
            } => {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("{backend} backend rejected the request ({status})")
                } else {
                    let preview: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
                    let suffix = if preview.len() < trimmed.len() {
                        "..."
                    } else {
                        ""
                    };
                    format!("{backend} backend rejected the request ({status}): {preview}{suffix}")
                }
            }
            Self::BackendNotConfigured { backend } => {
                format!("{backend} backend is not configured")
            }
            Self::SchemaParse(_) => "failed to parse backend response".to_string(),
            Self::Timeout(ms) => format!("request timed out after {ms}ms"),
            Self::Cancelled(ms) => format!("cancelled after {ms}ms"),
        }
    }
}
