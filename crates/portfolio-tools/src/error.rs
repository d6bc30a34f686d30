//! Error Types for Portfolio Tools

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Duplicate user id: {0}")]
    DuplicateUser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl PortfolioError {
    /// Transient failures worth another attempt: timeouts, connection
    /// failures, throttling and upstream 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortfolioError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PortfolioError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<PortfolioError> for AgentError {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::Agent(inner) => inner,
            PortfolioError::Config(msg) => AgentError::Config(msg),
            PortfolioError::Http { status: 429, provider, .. } => {
                AgentError::RateLimited(provider.to_string())
            }
            other => AgentError::ToolExecution(other.to_string()),
        }
    }
}
