//! Error types for the DocForge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; `GenerationError`
//! is what a job's pipeline reports at the job boundary.

use thiserror::Error;

/// Failures of a single generation job, as seen at the job boundary.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    // --- Request validation (before a job exists) ---
    #[error("Invalid request: {0}")]
    Validation(String),

    // --- Drafting ---
    #[error("Malformed outline: {0}")]
    MalformedOutline(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Rendering ---
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Whether another drafting attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MalformedOutline(_) => true,
            Self::Provider(e) => !matches!(
                e,
                ProviderError::NotConfigured(_) | ProviderError::AuthenticationFailed(_)
            ),
            _ => false,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool unavailable: {tool_name}: {reason}")]
    Unavailable { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// The renderer failed to produce an artifact. The message is surfaced
/// verbatim as the job's error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}
