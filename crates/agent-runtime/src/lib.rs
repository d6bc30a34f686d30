//! # agent-runtime
//!
//! `LlmProvider` implementations and environment-driven selection.
//!
//! ## Providers
//!
//! - **OpenAI** (default): hosted chat completions, or any compatible endpoint
//! - **Ollama**: local inference via ollama-rs
//!
//! ## Usage
//!
//! ```rust,ignore
//! let runtime = RuntimeConfig::from_env()?;
//! let provider = runtime.provider()?;
//! let agent = AgentBuilder::new()
//!     .provider(provider)
//!     .generation(runtime.generation())
//!     .build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

use agent_core::{AgentError, GenerationOptions, LlmProvider, Result};

/// Non-empty value for `key`
pub(crate) fn env_or<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'openai' or 'ollama')"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        })
    }
}

/// Which model backend to talk to, and with which model
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub kind: ProviderKind,

    /// Overrides the default model when set (`LLM_MODEL`)
    pub model: Option<String>,
}

impl RuntimeConfig {
    /// Reads `LLM_PROVIDER` and `LLM_MODEL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match env_or(&lookup, "LLM_PROVIDER") {
            Some(v) => v.parse()?,
            None => ProviderKind::default(),
        };

        Ok(Self {
            kind,
            model: env_or(&lookup, "LLM_MODEL"),
        })
    }

    pub fn generation(&self) -> GenerationOptions {
        let mut options = GenerationOptions::default();
        if let Some(model) = &self.model {
            options.model.clone_from(model);
        }
        options
    }

    /// Build the selected provider from its own environment variables
    pub fn provider(&self) -> Result<Arc<dyn LlmProvider>> {
        match self.kind {
            ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::from_env()?)),
            #[cfg(feature = "ollama")]
            ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::from_env())),
            #[cfg(not(feature = "ollama"))]
            ProviderKind::Ollama => Err(AgentError::Config(
                "built without the 'ollama' feature".into(),
            )),
        }
    }
}
