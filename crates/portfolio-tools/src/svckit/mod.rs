//! Service Kit - Agent Tools
//!
//! Directory lookups and quote fetches exposed as `agent_core::Tool`s.

mod coin_quote;
mod stock_quote;
mod user_lookup;

pub use coin_quote::CoinPriceTool;
pub use stock_quote::StockQuoteTool;
pub use user_lookup::UserLookupTool;
