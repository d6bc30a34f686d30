//! Stock Quote Tool
//!
//! Fetches the company profile for a ticker and hands the provider's object
//! to the model unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use agent_core::{
    AgentError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolContext, ToolResult,
    ToolSchema,
};

use crate::quote::EquityQuoteSource;

pub const NAME: &str = "get_stock";

pub struct StockQuoteTool {
    source: Arc<dyn EquityQuoteSource>,
}

impl StockQuoteTool {
    pub fn new(source: Arc<dyn EquityQuoteSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for StockQuoteTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Fetches financial and operational information for a specific stock \
                          symbol, including the company's market capitalization, stock price, \
                          industry, and much more. Returns {} for an unknown symbol."
                .into(),
            parameters: vec![ParameterSchema::string(
                "symbol",
                "Stock ticker symbol (e.g., 'AAPL')",
            )],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> CoreResult<ToolResult> {
        let symbol = call
            .str_arg("symbol")
            .map(str::trim)
            .ok_or_else(|| AgentError::ToolValidation("symbol must be a string".into()))?;

        let profile = self.source.profile(symbol).await?;
        debug!(symbol, source = self.source.name(), empty = profile.is_empty(), "stock profile");

        Ok(ToolResult::json(NAME, profile.raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::StaticQuoteSource;
    use agent_core::ThreadId;

    fn ctx() -> ToolContext {
        ToolContext::new("jake", ThreadId::new())
    }

    #[tokio::test]
    async fn test_returns_profile_object() {
        let tool = StockQuoteTool::new(Arc::new(StaticQuoteSource::new()));
        let call = ToolCall::new(NAME).with_arg("symbol", "MSFT");

        let result = tool.execute(&call, &ctx()).await.unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["companyName"], "Microsoft Corporation");
        assert!(result.output.contains("\"symbol\":\"MSFT\""));
    }

    #[tokio::test]
    async fn test_unknown_ticker_renders_empty_object() {
        let tool = StockQuoteTool::new(Arc::new(StaticQuoteSource::new()));
        let call = ToolCall::new(NAME).with_arg("symbol", "ZZZZ");

        let result = tool.execute(&call, &ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "{}");
    }

    #[tokio::test]
    async fn test_non_string_symbol_rejected() {
        let tool = StockQuoteTool::new(Arc::new(StaticQuoteSource::new()));
        let call = ToolCall::new(NAME).with_arg("symbol", 42);

        let err = tool.execute(&call, &ctx()).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
