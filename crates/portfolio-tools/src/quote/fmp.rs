//! Financial Modeling Prep profile client
//!
//! `GET {base}/stable/profile?symbol=<s>&apikey=<key>` returns a JSON array
//! of company profiles; only the first entry is used.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{EquityQuoteSource, check_status};
use crate::config::PortfolioConfig;
use crate::error::{PortfolioError, Result};
use crate::model::EquityProfile;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "financialmodelingprep";

pub struct FmpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl FmpClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry,
        }
    }

    /// Client from configuration; fails when no API key is configured
    pub fn from_config(config: &PortfolioConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self::new(
            client,
            config.fmp_base_url.clone(),
            config.require_fmp_key()?,
            config.retry.clone(),
        ))
    }

    fn profile_url(&self) -> String {
        format!("{}/stable/profile", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.profile_url())
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl EquityQuoteSource for FmpClient {
    async fn profile(&self, symbol: &str) -> Result<EquityProfile> {
        debug!(symbol, "fetching equity profile");

        let body = self
            .retry
            .execute("fmp.profile", || self.fetch_profile(symbol))
            .await?;

        // Auth and plan errors come back as 200 with an error object
        if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
            return Err(PortfolioError::Provider {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }

        let profile = EquityProfile::from_response(body);
        if profile.is_empty() {
            debug!(symbol, "provider returned no profile");
        }
        Ok(profile)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::test_server::{Seen, serve};
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn fixed(body: Value) -> (String, Seen) {
        let seen = Seen::default();
        let recorder = seen.clone();
        let router = Router::new().route(
            "/stable/profile",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let recorder = recorder.clone();
                let body = body.clone();
                async move {
                    recorder.lock().unwrap().push(q);
                    Json(body)
                }
            }),
        );
        (serve(router).await, seen)
    }

    fn client(base: &str) -> FmpClient {
        FmpClient::new(reqwest::Client::new(), base, "test-key", RetryPolicy::fast())
    }

    #[tokio::test]
    async fn test_first_profile_returned() {
        let (base, seen) = fixed(json!([{"symbol": "MSFT", "price": 410.5}])).await;

        let profile = client(&base).profile("MSFT").await.unwrap();
        assert_eq!(profile.raw, json!({"symbol": "MSFT", "price": 410.5}));
        assert_eq!(profile.price, Some(dec!(410.5)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("symbol").map(String::as_str), Some("MSFT"));
        assert_eq!(seen[0].get("apikey").map(String::as_str), Some("test-key"));
    }

    #[tokio::test]
    async fn test_empty_list_is_empty_profile() {
        let (base, _) = fixed(json!([])).await;
        let profile = client(&base).profile("ZZZZ").await.unwrap();
        assert!(profile.is_empty());
        assert_eq!(profile.raw, json!({}));
    }

    #[tokio::test]
    async fn test_null_body_is_empty_profile() {
        let (base, _) = fixed(Value::Null).await;
        assert!(client(&base).profile("ZZZZ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_message_object() {
        let (base, _) = fixed(json!({"Error Message": "Invalid API KEY."})).await;
        let err = client(&base).profile("MSFT").await.unwrap_err();
        assert!(matches!(err, PortfolioError::Provider { message, .. } if message.contains("Invalid")));
    }

    #[tokio::test]
    async fn test_retries_transient_failure() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/stable/profile",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
                    } else {
                        (StatusCode::OK, Json(json!([{"symbol": "AAPL"}])))
                    }
                }
            }),
        );
        let base = serve(router).await;

        let profile = client(&base).profile("AAPL").await.unwrap();
        assert_eq!(profile.symbol.as_deref(), Some("AAPL"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/stable/profile",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::UNAUTHORIZED, "bad key")
                }
            }),
        );
        let base = serve(router).await;

        let err = client(&base).profile("AAPL").await.unwrap_err();
        assert!(matches!(err, PortfolioError::Http { status: 401, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = PortfolioConfig::default();
        assert!(FmpClient::from_config(&config, reqwest::Client::new()).is_err());
    }

    #[tokio::test]
    async fn test_mistyped_field_still_returned() {
        let (base, _) = fixed(json!([{"symbol": "MSFT", "marketCap": "N/A", "price": 410.5}])).await;

        let profile = client(&base).profile("MSFT").await.unwrap();
        assert!(profile.market_cap.is_none());
        assert_eq!(profile.raw["marketCap"], "N/A");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_after_retries() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/stable/profile",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    Json(json!([{"symbol": "MSFT"}]))
                }
            }),
        );
        let base = serve(router).await;

        let config = PortfolioConfig {
            request_timeout: std::time::Duration::from_millis(50),
            ..PortfolioConfig::default()
        };
        let client = FmpClient::new(config.http_client().unwrap(), base, "test-key", RetryPolicy::fast());

        let err = client.profile("MSFT").await.unwrap_err();
        assert!(matches!(&err, PortfolioError::Network(e) if e.is_timeout()));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
