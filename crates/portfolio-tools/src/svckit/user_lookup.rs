//! User Lookup Tools
//!
//! Resolve one field of the calling user's preference record. The user id is
//! taken from the invocation context; these tools take no arguments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::directory::{PreferenceField, UserDirectory};

pub struct UserLookupTool {
    name: &'static str,
    description: &'static str,
    field: PreferenceField,
    directory: Arc<UserDirectory>,
}

impl UserLookupTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        field: PreferenceField,
        directory: Arc<UserDirectory>,
    ) -> Self {
        Self {
            name,
            description,
            field,
            directory,
        }
    }

    /// `get_user`: the ticker lookup of the stock variant
    pub fn user(directory: Arc<UserDirectory>) -> Self {
        Self::new(
            "get_user",
            "Get the stock ticker symbol the current user holds.",
            PreferenceField::EquityTicker,
            directory,
        )
    }

    pub fn user_stock(directory: Arc<UserDirectory>) -> Self {
        Self::new(
            "get_user_stock",
            "Get the stock ticker symbol the current user holds.",
            PreferenceField::EquityTicker,
            directory,
        )
    }

    pub fn user_coin(directory: Arc<UserDirectory>) -> Self {
        Self::new(
            "get_user_coin",
            "Get the CoinGecko id of the crypto asset the current user holds (e.g. 'bitcoin').",
            PreferenceField::CryptoAsset,
            directory,
        )
    }

    pub fn user_currency(directory: Arc<UserDirectory>) -> Self {
        Self::new(
            "get_user_currency",
            "Get the fiat currency code the current user reports in (e.g. 'USD').",
            PreferenceField::FiatCurrency,
            directory,
        )
    }
}

#[async_trait]
impl Tool for UserLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.into(),
            description: self.description.into(),
            parameters: vec![],
            category: Some("user_directory".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall, ctx: &ToolContext) -> CoreResult<ToolResult> {
        let value = self.directory.lookup(&ctx.user_id, self.field);
        debug!(
            tool = self.name,
            user = %ctx.user_id,
            known = self.directory.is_known(&ctx.user_id),
            value,
            "user lookup"
        );
        Ok(ToolResult::success(self.name, value))
    }
}
