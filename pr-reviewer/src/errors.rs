//! Crate-wide error hierarchy for pr-reviewer.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Provider-aware mapping (401→Unauthorized, 404→NotFound, 422→Validation, etc.).
//! - No dynamic dispatch, ergonomic `?` via `From` impls.
//!
//! The diff parser and position mapper have no error types of their own:
//! parsing is infallible by contract and an unmappable position is an
//! `Option::None`, not a failure.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type LgtmResult<T> = Result<T, Error>;

/// Root error type for the pr-reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// GitHub API related failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Completion service (LLM) failure.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Configuration problems (missing secrets, bad base URL, etc.).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors (bad payloads, unsupported operations).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Detailed provider-specific error used inside the GitHub layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Unauthorized (HTTP 401) — token invalid or expired.
    #[error("unauthorized: check that the token is valid and not expired")]
    Unauthorized,

    /// Forbidden (HTTP 403) — token lacks pull-request permissions or the
    /// repository is not accessible.
    #[error("forbidden: check token permissions and repository access")]
    Forbidden,

    /// Not found (HTTP 404) — repository or PR number is wrong.
    #[error("not found: check that the repository and PR number are correct")]
    NotFound,

    /// Unprocessable entity (HTTP 422) — the API rejected the payload.
    /// Carries the API's message plus per-field details.
    #[error("validation failed: {0}")]
    Unprocessable(String),

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status not covered above.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// JSON deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Completion service errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure talking to the completion endpoint.
    #[error("llm transport error: {0}")]
    Transport(#[from] ProviderError),

    /// The endpoint answered but the response shape was unusable.
    #[error("llm invalid response: {0}")]
    InvalidResponse(String),

    /// The response contained no choices.
    #[error("llm returned no choices")]
    EmptyChoices,
}

/// Configuration and setup errors (secrets, base URLs).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing secret: {0}")]
    MissingSecret(String),

    #[error("unreadable secrets file {path}: {reason}")]
    SecretsFile { path: String, reason: String },

    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Provider(ProviderError::from(e))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                422 => ProviderError::Unprocessable("validation failed".into()),
                429 => ProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus(code),
            };
        }
        ProviderError::Network(e.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Transport(ProviderError::from(e))
    }
}
