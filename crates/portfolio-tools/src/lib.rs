//! # portfolio-tools
//!
//! Tool contract layer for the portfolio advisor: who holds what, and what
//! it is worth right now.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  user_id ──► UserDirectory ──► ticker / coin / currency      │
//! │                                   │                          │
//! │  ticker ──────► EquityQuoteSource (FMP stable/profile)       │
//! │  coin, cur ───► CryptoQuoteSource (CoinGecko simple/price)   │
//! │                                   │                          │
//! │            AdvisorVariant ──► ToolRegistry + OutputSchema    │
//! │                                   │                          │
//! │            PortfolioAdvisor ──► Orchestrator::invoke         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown users resolve to fallback holdings; tickers and coins the
//! providers do not know come back as empty records, never as errors.

pub mod advisor;
pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod quote;
pub mod retry;
pub mod svckit;
pub mod variant;

pub use advisor::{PortfolioAdvisor, build_agent, tool_surface};
pub use config::PortfolioConfig;
pub use directory::{PreferenceField, UserDirectory, UserPreference};
pub use error::{PortfolioError, Result};
pub use model::{CryptoQuote, EquityProfile, PortfolioSummary};
pub use quote::{CoinGeckoClient, CryptoQuoteSource, EquityQuoteSource, FmpClient, StaticQuoteSource};
pub use retry::RetryPolicy;
pub use variant::AdvisorVariant;
