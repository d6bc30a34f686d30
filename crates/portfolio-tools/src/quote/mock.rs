//! Static Quote Source
//!
//! For tests and offline demos. Serves fixed profiles and prices shaped
//! like the live providers' payloads.

use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

use super::{CryptoQuoteSource, EquityQuoteSource};
use crate::error::Result;
use crate::model::{CryptoQuote, EquityProfile};

struct Company {
    name: &'static str,
    price: Decimal,
    country: &'static str,
    website: &'static str,
    industry: &'static str,
}

/// Static equity profiles and crypto prices
#[derive(Default)]
pub struct StaticQuoteSource {
    requests: Mutex<Vec<String>>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup served so far, as `equity:<symbol>` or `crypto:<id>/<cur>`
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: String) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }

    fn company(symbol: &str) -> Option<Company> {
        let (name, price, country, website, industry) = match symbol {
            "AAPL" => ("Apple Inc.", dec!(229.35), "US", "https://www.apple.com", "Consumer Electronics"),
            "TSLA" => ("Tesla, Inc.", dec!(248.50), "US", "https://www.tesla.com", "Auto - Manufacturers"),
            "MSFT" => ("Microsoft Corporation", dec!(410.50), "US", "https://www.microsoft.com", "Software - Infrastructure"),
            "GOOGL" => ("Alphabet Inc.", dec!(172.80), "US", "https://abc.xyz", "Internet Content & Information"),
            "NVDA" => ("NVIDIA Corporation", dec!(131.20), "US", "https://www.nvidia.com", "Semiconductors"),
            _ => return None,
        };
        Some(Company { name, price, country, website, industry })
    }

    /// USD price of a crypto asset
    fn coin_usd(asset_id: &str) -> Option<(Decimal, Decimal)> {
        // (price, 24h_change)
        match asset_id {
            "bitcoin" => Some((dec!(97500), dec!(2.5))),
            "ethereum" => Some((dec!(3450), dec!(1.8))),
            "solana" => Some((dec!(195), dec!(4.2))),
            "dogecoin" => Some((dec!(0.38), dec!(12.0))),
            "cardano" => Some((dec!(0.95), dec!(-1.2))),
            _ => None,
        }
    }

    /// Units of `currency` per US dollar
    fn usd_rate(currency: &str) -> Option<Decimal> {
        match currency {
            "usd" => Some(Decimal::ONE),
            "eur" => Some(dec!(0.92)),
            "gbp" => Some(dec!(0.79)),
            "jpy" => Some(dec!(151.4)),
            "chf" => Some(dec!(0.88)),
            _ => None,
        }
    }
}

fn number(value: Decimal) -> Value {
    value.to_f64().map_or(Value::Null, Value::from)
}

#[async_trait]
impl EquityQuoteSource for StaticQuoteSource {
    async fn profile(&self, symbol: &str) -> Result<EquityProfile> {
        self.record(format!("equity:{symbol}"));

        let Some(company) = Self::company(symbol) else {
            return Ok(EquityProfile::empty());
        };

        Ok(EquityProfile::from_value(json!({
            "symbol": symbol,
            "price": number(company.price),
            "companyName": company.name,
            "country": company.country,
            "currency": "USD",
            "website": company.website,
            "industry": company.industry,
            "exchange": "NASDAQ",
        })))
    }

    fn name(&self) -> &str {
        "StaticQuotes"
    }
}

#[async_trait]
impl CryptoQuoteSource for StaticQuoteSource {
    async fn quote(&self, asset_id: &str, currency: &str) -> Result<CryptoQuote> {
        let currency = currency.to_lowercase();
        self.record(format!("crypto:{asset_id}/{currency}"));

        let raw = match (Self::coin_usd(asset_id), Self::usd_rate(&currency)) {
            (Some((usd, change)), Some(rate)) => {
                let mut fields = serde_json::Map::new();
                fields.insert(currency.clone(), number((usd * rate).round_dp(2)));
                fields.insert(format!("{currency}_24h_change"), number(change));
                let mut body = serde_json::Map::new();
                body.insert(asset_id.to_string(), Value::Object(fields));
                Value::Object(body)
            }
            _ => json!({}),
        };

        Ok(CryptoQuote::from_response(asset_id, &currency, raw))
    }

    fn name(&self) -> &str {
        "StaticQuotes"
    }
}
