//! Quote Sources
//!
//! One trait per data provider kind, so tools can run against the live
//! HTTP clients or the static source without knowing which.

mod coingecko;
mod fmp;
mod mock;

pub use coingecko::CoinGeckoClient;
pub use fmp::FmpClient;
pub use mock::StaticQuoteSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CryptoQuote, EquityProfile};

/// Company profile lookup by ticker
#[async_trait]
pub trait EquityQuoteSource: Send + Sync {
    /// Profile for `symbol`; an empty profile when the provider has none
    async fn profile(&self, symbol: &str) -> Result<EquityProfile>;

    fn name(&self) -> &str;
}

/// Crypto price lookup by asset id and fiat currency
#[async_trait]
pub trait CryptoQuoteSource: Send + Sync {
    /// Price payload for `asset_id` in `currency`; empty when unknown
    async fn quote(&self, asset_id: &str, currency: &str) -> Result<CryptoQuote>;

    fn name(&self) -> &str;
}

/// Turn a non-2xx response into `PortfolioError::Http`
async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(crate::error::PortfolioError::Http {
        provider,
        status: status.as_u16(),
        body: body.chars().take(512).collect(),
    })
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;

    pub type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Serve `router` on an ephemeral local port, returning its base URL
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
