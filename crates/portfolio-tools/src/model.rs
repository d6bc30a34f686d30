//! Domain Models
//!
//! Typed views over the quote providers' payloads and the structured answer.
//! Monetary values are `rust_decimal::Decimal`; the raw provider JSON is kept
//! next to the typed fields so tools can hand it to the model unchanged.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::StructuredOutput;

use crate::error::Result;

/// One company profile from the equity provider
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EquityProfile {
    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub company_name: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub website: Option<String>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub market_cap: Option<Decimal>,

    /// Absolute change on the day
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub change: Option<Decimal>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub change_percentage: Option<Decimal>,

    #[serde(default)]
    pub exchange: Option<String>,

    #[serde(default)]
    pub industry: Option<String>,

    /// Provider object exactly as received, `{}` when there was none
    #[serde(skip)]
    pub raw: Value,
}

impl EquityProfile {
    /// Profile for "provider returned no data"
    pub fn empty() -> Self {
        Self {
            raw: Value::Object(serde_json::Map::new()),
            ..Self::default()
        }
    }

    /// Read one provider entry, keeping it verbatim in `raw`. Typed fields
    /// are best effort: a missing or mistyped field is `None`.
    pub fn from_value(value: Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| value.get(key).and_then(decimal_from_json);

        Self {
            symbol: text("symbol"),
            price: number("price"),
            company_name: text("companyName"),
            country: text("country"),
            currency: text("currency"),
            website: text("website"),
            market_cap: number("marketCap"),
            change: number("change"),
            change_percentage: number("changePercentage"),
            exchange: text("exchange"),
            industry: text("industry"),
            raw: value.clone(),
        }
    }

    /// First entry of the provider's response list. `[]`, `null` and a
    /// missing body all yield the empty profile.
    pub fn from_response(body: Value) -> Self {
        match body {
            Value::Array(items) => match items.into_iter().next() {
                Some(first @ Value::Object(_)) => Self::from_value(first),
                _ => Self::empty(),
            },
            _ => Self::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.as_object().is_none_or(serde_json::Map::is_empty)
    }
}

/// Price payload for one asset in one fiat currency
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CryptoQuote {
    pub asset_id: String,

    /// Lower-case currency code as sent to the provider
    pub currency: String,

    pub price: Option<Decimal>,

    pub market_cap: Option<Decimal>,

    pub volume_24h: Option<Decimal>,

    /// 24h change in percent
    pub change_24h: Option<Decimal>,

    /// Provider response exactly as received
    pub raw: Value,
}

impl CryptoQuote {
    /// Extract the typed fields from a `simple/price` style body
    /// (`{"<id>": {"<cur>": .., "<cur>_market_cap": .., ..}}`).
    pub fn from_response(asset_id: &str, currency: &str, raw: Value) -> Self {
        let currency = currency.to_lowercase();
        let entry = raw.get(asset_id);
        let field = |suffix: &str| {
            entry
                .and_then(|e| e.get(format!("{currency}{suffix}")))
                .and_then(decimal_from_json)
        };

        Self {
            asset_id: asset_id.to_string(),
            price: field(""),
            market_cap: field("_market_cap"),
            volume_24h: field("_24h_vol"),
            change_24h: field("_24h_change"),
            currency,
            raw,
        }
    }

    /// True when the provider had nothing for this asset/currency pair
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
    }
}

/// JSON number (or numeric string) to `Decimal`, without going through
/// binary floating point when the literal parses directly.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| value.as_f64().and_then(Decimal::from_f64))
}

/// Structured answer for one turn
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub symbol: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub company_name: String,

    pub country: String,

    pub currency: String,

    pub website: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub coin_price: Option<Decimal>,
}

impl PortfolioSummary {
    pub fn from_output(output: &StructuredOutput) -> Result<Self> {
        Ok(serde_json::from_value(output.value.clone())?)
    }
}
