//! Coin Price Tool

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use agent_core::{
    AgentError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolContext, ToolResult,
    ToolSchema,
};

use crate::quote::CryptoQuoteSource;

pub const NAME: &str = "get_coin_price";

/// Current price of a crypto asset in a fiat currency, returned as the
/// provider's raw payload
pub struct CoinPriceTool {
    source: Arc<dyn CryptoQuoteSource>,
}

impl CoinPriceTool {
    pub fn new(source: Arc<dyn CryptoQuoteSource>) -> Self {
        Self { source }
    }
}

fn required_str<'a>(call: &'a ToolCall, key: &str) -> CoreResult<&'a str> {
    call.str_arg(key)
        .map(str::trim)
        .ok_or_else(|| AgentError::ToolValidation(format!("{key} must be a string")))
}

#[async_trait]
impl Tool for CoinPriceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Get the current price, market cap, 24h volume and 24h change of a \
                          crypto asset in a fiat currency."
                .into(),
            parameters: vec![
                ParameterSchema::string("coin", "CoinGecko asset id (e.g., 'bitcoin')"),
                ParameterSchema::string("currency", "Fiat currency code (e.g., 'USD')"),
            ],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> CoreResult<ToolResult> {
        let coin = required_str(call, "coin")?;
        let currency = required_str(call, "currency")?;

        let quote = self.source.quote(coin, currency).await?;
        debug!(
            coin,
            currency = %quote.currency,
            source = self.source.name(),
            empty = quote.is_empty(),
            "coin price"
        );

        Ok(ToolResult::json(NAME, quote.raw))
    }
}
