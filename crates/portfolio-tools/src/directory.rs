//! User Directory
//!
//! Static mapping from user id to holdings preferences. Built once at
//! startup and shared read-only. Unknown ids resolve to fallback values
//! instead of failing, so the model can tell it is looking at an unknown
//! user.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

pub const FALLBACK_TICKER: &str = "GOOGL";
pub const FALLBACK_COIN: &str = "dogecoin";
pub const FALLBACK_CURRENCY: &str = "JPY";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    pub equity_ticker: String,
    pub crypto_asset_id: String,
    pub fiat_currency: String,
}

impl UserPreference {
    pub fn new(
        equity_ticker: impl Into<String>,
        crypto_asset_id: impl Into<String>,
        fiat_currency: impl Into<String>,
    ) -> Self {
        Self {
            equity_ticker: equity_ticker.into(),
            crypto_asset_id: crypto_asset_id.into(),
            fiat_currency: fiat_currency.into(),
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_TICKER, FALLBACK_COIN, FALLBACK_CURRENCY)
    }

    pub fn get(&self, field: PreferenceField) -> &str {
        match field {
            PreferenceField::EquityTicker => &self.equity_ticker,
            PreferenceField::CryptoAsset => &self.crypto_asset_id,
            PreferenceField::FiatCurrency => &self.fiat_currency,
        }
    }
}

/// Which part of a preference record a lookup returns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferenceField {
    EquityTicker,
    CryptoAsset,
    FiatCurrency,
}

#[derive(Clone, Debug)]
pub struct UserDirectory {
    users: HashMap<String, UserPreference>,
    fallback: UserPreference,
    case_insensitive: bool,
}

impl UserDirectory {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            users: HashMap::new(),
            fallback: UserPreference::fallback(),
            case_insensitive,
        }
    }

    /// The configured demo users
    pub fn builtin(case_insensitive: bool) -> Self {
        let mut directory = Self::new(case_insensitive);
        for (user, pref) in [
            ("jack", UserPreference::new("AAPL", "bitcoin", "USD")),
            ("jace", UserPreference::new("TSLA", "ethereum", "EUR")),
            ("jake", UserPreference::new("MSFT", "solana", "GBP")),
        ] {
            directory.users.insert(user.to_string(), pref);
        }
        directory
    }

    /// Add a user. Ids must be unique after normalization.
    pub fn insert(&mut self, user_id: &str, pref: UserPreference) -> Result<()> {
        let key = self.normalize(user_id);
        if self.users.contains_key(&key) {
            return Err(PortfolioError::DuplicateUser(user_id.to_string()));
        }
        self.users.insert(key, pref);
        Ok(())
    }

    fn normalize(&self, user_id: &str) -> String {
        if self.case_insensitive {
            user_id.trim().to_lowercase()
        } else {
            user_id.to_string()
        }
    }

    pub fn is_known(&self, user_id: &str) -> bool {
        self.users.contains_key(&self.normalize(user_id))
    }

    /// Preference record, or the fallback record for unknown ids
    pub fn resolve(&self, user_id: &str) -> &UserPreference {
        self.users
            .get(&self.normalize(user_id))
            .unwrap_or(&self.fallback)
    }

    pub fn lookup(&self, user_id: &str, field: PreferenceField) -> &str {
        self.resolve(user_id).get(field)
    }

    pub fn ticker_for(&self, user_id: &str) -> &str {
        self.lookup(user_id, PreferenceField::EquityTicker)
    }

    pub fn coin_for(&self, user_id: &str) -> &str {
        self.lookup(user_id, PreferenceField::CryptoAsset)
    }

    pub fn currency_for(&self, user_id: &str) -> &str {
        self.lookup(user_id, PreferenceField::FiatCurrency)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
