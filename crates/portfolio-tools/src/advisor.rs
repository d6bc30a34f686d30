//! Portfolio Advisor
//!
//! Binds a variant's tools, instruction and answer schema to an
//! orchestrator and exposes one call per conversational turn.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use agent_core::{
    Agent, AgentBuilder, GenerationOptions, Invocation, LlmProvider, MemoryThreadStore,
    Orchestrator, StructuredOutput, ThreadId, ThreadStore,
};

use crate::config::PortfolioConfig;
use crate::error::Result;
use crate::model::PortfolioSummary;
use crate::quote::{CoinGeckoClient, CryptoQuoteSource, EquityQuoteSource, FmpClient, StaticQuoteSource};
use crate::variant::AdvisorVariant;

/// Relay agent wired with `variant`'s tool surface
pub fn build_agent(
    variant: AdvisorVariant,
    provider: Arc<dyn LlmProvider>,
    equity: Arc<dyn EquityQuoteSource>,
    crypto: Arc<dyn CryptoQuoteSource>,
    store: Arc<dyn ThreadStore>,
    generation: GenerationOptions,
) -> Result<Agent> {
    let directory = Arc::new(variant.directory());

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(variant.tools(directory, equity, crypto))
        .output_schema(variant.output_schema())
        .system_prompt(variant.system_prompt())
        .generation(generation)
        .thread_store(store)
        .build()?;

    Ok(agent)
}

/// Tool names, parameter schemas and the answer schema as JSON.
/// Schemas do not depend on the quote source, so no credentials are needed.
pub fn tool_surface(variant: AdvisorVariant) -> Value {
    let quotes = Arc::new(StaticQuoteSource::new());
    let registry = variant.tools(Arc::new(variant.directory()), quotes.clone(), quotes);

    let tools: Vec<Value> = registry
        .schemas()
        .iter()
        .map(|schema| {
            json!({
                "name": schema.name,
                "description": schema.description,
                "parameters": schema.parameters_json_schema(),
            })
        })
        .collect();

    json!({
        "variant": variant,
        "instruction": variant.system_prompt(),
        "tools": tools,
        "output_schema": variant.output_schema(),
    })
}

pub struct PortfolioAdvisor {
    variant: AdvisorVariant,
    orchestrator: Arc<dyn Orchestrator>,
}

impl PortfolioAdvisor {
    pub fn new(variant: AdvisorVariant, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            variant,
            orchestrator,
        }
    }

    /// Advisor over the given quote sources with an in-memory thread store
    pub fn with_sources(
        variant: AdvisorVariant,
        provider: Arc<dyn LlmProvider>,
        equity: Arc<dyn EquityQuoteSource>,
        crypto: Arc<dyn CryptoQuoteSource>,
        generation: GenerationOptions,
    ) -> Result<Self> {
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
        let agent = build_agent(variant, provider, equity, crypto, store, generation)?;
        Ok(Self::new(variant, Arc::new(agent)))
    }

    /// Advisor over the live quote providers described by `config`
    pub fn from_config(
        config: &PortfolioConfig,
        provider: Arc<dyn LlmProvider>,
        generation: GenerationOptions,
    ) -> Result<Self> {
        let client = config.http_client()?;
        let equity = Arc::new(FmpClient::from_config(config, client.clone())?);
        let crypto = Arc::new(CoinGeckoClient::from_config(config, client));

        info!(
            variant = %config.variant,
            provider = provider.name(),
            model = %generation.model,
            "portfolio advisor ready"
        );

        Self::with_sources(config.variant, provider, equity, crypto, generation)
    }

    /// One turn on `thread_id` for `user_id`. A thread stays bound to the
    /// user that opened it.
    pub async fn ask(
        &self,
        user_id: &str,
        thread_id: &ThreadId,
        message: &str,
    ) -> Result<StructuredOutput> {
        let user_id = if self.variant.case_insensitive_ids() {
            user_id.trim().to_lowercase()
        } else {
            user_id.to_string()
        };

        let output = self
            .orchestrator
            .invoke(Invocation::new(message, user_id, thread_id.clone()))
            .await?;
        Ok(output)
    }

    /// One turn, decoded into the typed summary
    pub async fn summarize(
        &self,
        user_id: &str,
        thread_id: &ThreadId,
        message: &str,
    ) -> Result<PortfolioSummary> {
        let output = self.ask(user_id, thread_id, message).await?;
        PortfolioSummary::from_output(&output)
    }
}
