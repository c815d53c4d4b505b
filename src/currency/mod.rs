//! Currency conversion module
//!
//! Exchange-rate sources and the cached rate provider

mod fees;
mod http;
mod provider;
mod types;

pub use fees::FeeSchedule;
pub use http::{HttpRateSource, HttpRateSourceConfig, EXCHANGE_RATE_API_URL};
pub use provider::{RateProvider, RateProviderConfig};
pub use types::{CachedRate, CurrencyConversion, RateError, RateTable};

use crate::context::Currency;
use async_trait::async_trait;

/// Trait for exchange-rate source implementations
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Provider name reported on conversions
    fn name(&self) -> &str;
    /// Latest rates quoted against `base`
    async fn latest(&self, base: &Currency) -> anyhow::Result<RateTable>;
}
