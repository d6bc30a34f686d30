//! CoinGecko `simple/price` client

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{CryptoQuoteSource, check_status};
use crate::config::PortfolioConfig;
use crate::error::Result;
use crate::model::CryptoQuote;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "coingecko";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            retry,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_config(config: &PortfolioConfig, client: reqwest::Client) -> Self {
        let gecko = Self::new(client, config.coingecko_base_url.clone(), config.retry.clone());
        match &config.coingecko_api_key {
            Some(key) => gecko.with_api_key(key.clone()),
            None => gecko,
        }
    }

    fn price_url(&self) -> String {
        format!("{}/simple/price", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_price(&self, asset_id: &str, currency: &str) -> Result<Value> {
        let mut request = self.client.get(self.price_url()).query(&[
            ("ids", asset_id),
            ("vs_currencies", currency),
            ("include_market_cap", "true"),
            ("include_24hr_vol", "true"),
            ("include_24hr_change", "true"),
        ]);

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = check_status(PROVIDER, request.send().await?).await?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl CryptoQuoteSource for CoinGeckoClient {
    async fn quote(&self, asset_id: &str, currency: &str) -> Result<CryptoQuote> {
        let currency = currency.to_lowercase();
        debug!(asset_id, currency = %currency, "fetching crypto price");

        let raw = self
            .retry
            .execute("coingecko.price", || self.fetch_price(asset_id, &currency))
            .await?;

        let quote = CryptoQuote::from_response(asset_id, &currency, raw);
        if quote.is_empty() {
            debug!(asset_id, currency = %currency, "provider returned no price");
        }
        Ok(quote)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
