//! Configuration
//!
//! Built once at startup and passed by reference to the quote clients.
//!
//! | variable              | default                              |
//! |-----------------------|--------------------------------------|
//! | `FMP_API_KEY`         | falls back to `CRYPTONEWS_API_KEY`   |
//! | `FMP_BASE_URL`        | `https://financialmodelingprep.com`  |
//! | `COINGECKO_BASE_URL`  | `https://api.coingecko.com/api/v3`   |
//! | `COINGECKO_API_KEY`   | unset                                |
//! | `QUOTE_TIMEOUT_SECS`  | `10`                                 |
//! | `QUOTE_MAX_ATTEMPTS`  | `3`                                  |
//! | `PORTFOLIO_VARIANT`   | `portfolio`                          |

use std::str::FromStr;
use std::time::Duration;

use crate::error::{PortfolioError, Result};
use crate::retry::RetryPolicy;
use crate::variant::AdvisorVariant;

pub const DEFAULT_FMP_BASE_URL: &str = "https://financialmodelingprep.com";
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Clone, Debug)]
pub struct PortfolioConfig {
    /// Equity provider key, sent as the `apikey` query parameter
    pub fmp_api_key: Option<String>,

    pub fmp_base_url: String,

    pub coingecko_base_url: String,

    /// Optional demo key, sent as `x-cg-demo-api-key`
    pub coingecko_api_key: Option<String>,

    /// Per-request timeout for quote calls
    pub request_timeout: Duration,

    pub retry: RetryPolicy,

    pub variant: AdvisorVariant,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            fmp_api_key: None,
            fmp_base_url: DEFAULT_FMP_BASE_URL.into(),
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.into(),
            coingecko_api_key: None,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            variant: AdvisorVariant::Portfolio,
        }
    }
}

impl PortfolioConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let request_timeout = match get("QUOTE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("QUOTE_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };

        let retry = match get("QUOTE_MAX_ATTEMPTS") {
            Some(v) => RetryPolicy::new(parse_number("QUOTE_MAX_ATTEMPTS", &v)?),
            None => defaults.retry,
        };

        let variant = match get("PORTFOLIO_VARIANT") {
            Some(v) => AdvisorVariant::from_str(&v)?,
            None => defaults.variant,
        };

        Ok(Self {
            fmp_api_key: get("FMP_API_KEY").or_else(|| get("CRYPTONEWS_API_KEY")),
            fmp_base_url: get("FMP_BASE_URL").unwrap_or(defaults.fmp_base_url),
            coingecko_base_url: get("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            coingecko_api_key: get("COINGECKO_API_KEY"),
            request_timeout,
            retry,
            variant,
        })
    }

    /// The equity key, or a configuration error naming the variable
    pub fn require_fmp_key(&self) -> Result<&str> {
        self.fmp_api_key
            .as_deref()
            .ok_or_else(|| PortfolioError::Config("FMP_API_KEY environment variable not set".into()))
    }

    /// Shared HTTP client with the configured request timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(concat!("portfolio-tools/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PortfolioError::Config(format!("{key} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PortfolioConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.fmp_api_key.is_none());
        assert_eq!(config.fmp_base_url, DEFAULT_FMP_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.variant, AdvisorVariant::Portfolio);
        assert!(config.require_fmp_key().is_err());
    }

    #[test]
    fn test_legacy_key_name() {
        let config = PortfolioConfig::from_lookup(lookup(&[("CRYPTONEWS_API_KEY", "legacy")])).unwrap();
        assert_eq!(config.require_fmp_key().unwrap(), "legacy");

        let config = PortfolioConfig::from_lookup(lookup(&[
            ("CRYPTONEWS_API_KEY", "legacy"),
            ("FMP_API_KEY", "primary"),
        ]))
        .unwrap();
        assert_eq!(config.require_fmp_key().unwrap(), "primary");
    }

    #[test]
    fn test_overrides() {
        let config = PortfolioConfig::from_lookup(lookup(&[
            ("QUOTE_TIMEOUT_SECS", "3"),
            ("QUOTE_MAX_ATTEMPTS", "5"),
            ("PORTFOLIO_VARIANT", "stock"),
            ("COINGECKO_API_KEY", "  "),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.variant, AdvisorVariant::Stock);
        assert!(config.coingecko_api_key.is_none());
    }

    #[test]
    fn test_bad_number() {
        let err = PortfolioConfig::from_lookup(lookup(&[("QUOTE_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, PortfolioError::Config(msg) if msg.contains("QUOTE_TIMEOUT_SECS")));
    }
}
