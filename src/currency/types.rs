//! Currency conversion types

use crate::context::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Rate provider errors
#[derive(Debug, Error)]
pub enum RateError {
    /// Amount to convert is negative
    #[error("Cannot convert negative amount: {0}")]
    NegativeAmount(Decimal),
    /// Conversion overflowed decimal precision
    #[error("Conversion overflow: {amount} x {rate}")]
    Overflow { amount: Decimal, rate: Decimal },
}

/// Exchange rates quoted against one base currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: Currency,
    /// Units of the keyed currency per one unit of `base`
    pub rates: HashMap<Currency, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl RateTable {
    pub fn rate(&self, to: &Currency) -> Option<Decimal> {
        self.rates.get(to).copied().filter(|r| *r > Decimal::ZERO)
    }
}

/// A cached exchange rate for one currency pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRate {
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub provider: String,
}

/// Result of converting an amount between currencies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyConversion {
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
    pub converted_amount: Decimal,
    pub fees: Decimal,
    /// Converted amount plus fees
    pub total_cost: Decimal,
    /// When the rate was obtained
    pub last_updated: DateTime<Utc>,
    pub provider: String,
    /// The rate came from an expired cache entry after a fetch failure
    pub stale: bool,
    /// No rate was available at all; an identity rate was substituted
    pub degraded: bool,
}

impl CurrencyConversion {
    /// Same-currency (or degraded) passthrough at rate 1 with no fees
    pub fn identity(
        amount: Decimal,
        from: &Currency,
        to: &Currency,
        at: DateTime<Utc>,
        degraded: bool,
    ) -> Self {
        Self {
            from_currency: from.clone(),
            to_currency: to.clone(),
            rate: Decimal::ONE,
            converted_amount: amount,
            fees: Decimal::ZERO,
            total_cost: amount,
            last_updated: at,
            provider: "identity".to_string(),
            stale: false,
            degraded,
        }
    }
}
