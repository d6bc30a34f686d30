//! Advisor Variants
//!
//! The stock advisor answers with an equity profile only; the portfolio
//! advisor adds the user's coin and reports both in the user's currency.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use agent_core::{FieldSchema, OutputSchema, ToolRegistry};

use crate::directory::UserDirectory;
use crate::error::PortfolioError;
use crate::quote::{CryptoQuoteSource, EquityQuoteSource};
use crate::svckit::{CoinPriceTool, StockQuoteTool, UserLookupTool};

pub const STOCK_SYSTEM_PROMPT: &str = "You are a stock sentiment portfolio advisor. \
    Find the user's stock with get_user, then get the responses from the get_stock tool. \
    Return the response exactly as stated.";

pub const PORTFOLIO_SYSTEM_PROMPT: &str = "You are a stock and crypto portfolio advisor. \
    Find the user's stock, coin and currency with the get_user_* tools, then fetch the stock \
    profile with get_stock and the coin price in the user's currency with get_coin_price. \
    Return the responses exactly as stated.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorVariant {
    Stock,
    #[default]
    Portfolio,
}

impl AdvisorVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Portfolio => "portfolio",
        }
    }

    pub fn case_insensitive_ids(self) -> bool {
        matches!(self, Self::Portfolio)
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Stock => STOCK_SYSTEM_PROMPT,
            Self::Portfolio => PORTFOLIO_SYSTEM_PROMPT,
        }
    }

    /// The configured users, with this variant's id matching
    pub fn directory(self) -> UserDirectory {
        UserDirectory::builtin(self.case_insensitive_ids())
    }

    pub fn output_schema(self) -> OutputSchema {
        let mut fields = vec![
            FieldSchema::string("symbol", "Stock ticker symbol"),
            FieldSchema::number("price", "Current stock price"),
            FieldSchema::string("companyName", "Company name"),
            FieldSchema::string("country", "Country of the company"),
            FieldSchema::string("currency", "Currency the stock price is quoted in"),
            FieldSchema::string("website", "Company website"),
        ];

        if self == Self::Portfolio {
            fields.push(FieldSchema::string("coin", "Crypto asset id the user holds"));
            fields.push(FieldSchema::number(
                "coinPrice",
                "Current coin price in the user's currency",
            ));
        }

        OutputSchema::new("ResponseFormat", fields)
    }

    /// Tool surface for this variant, in prompt order
    pub fn tools(
        self,
        directory: Arc<UserDirectory>,
        equity: Arc<dyn EquityQuoteSource>,
        crypto: Arc<dyn CryptoQuoteSource>,
    ) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        match self {
            Self::Stock => {
                registry.register(UserLookupTool::user(directory));
                registry.register(StockQuoteTool::new(equity));
            }
            Self::Portfolio => {
                registry.register(UserLookupTool::user_stock(directory.clone()));
                registry.register(UserLookupTool::user_coin(directory.clone()));
                registry.register(UserLookupTool::user_currency(directory));
                registry.register(StockQuoteTool::new(equity));
                registry.register(CoinPriceTool::new(crypto));
            }
        }

        registry
    }
}

impl fmt::Display for AdvisorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvisorVariant {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" => Ok(Self::Stock),
            "portfolio" => Ok(Self::Portfolio),
            other => Err(PortfolioError::Config(format!(
                "unknown advisor variant '{other}' (expected 'stock' or 'portfolio')"
            ))),
        }
    }
}
