//! HTTP exchange-rate client
//!
//! Fetches rate tables from an exchange-rate API exposing
//! `GET /latest/{base}`, returning every rate quoted against `base`.

use super::{RateSource, RateTable};
use crate::context::Currency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default exchange-rate API base URL
pub const EXCHANGE_RATE_API_URL: &str = "https://api.exchangerate-api.com/v4";

/// Configuration for the HTTP rate source
#[derive(Debug, Clone)]
pub struct HttpRateSourceConfig {
    /// Base URL, `/latest/{base}` is appended
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Provider name reported on conversions
    pub name: String,
}

impl Default for HttpRateSourceConfig {
    fn default() -> Self {
        Self {
            base_url: EXCHANGE_RATE_API_URL.to_string(),
            timeout: Duration::from_secs(3),
            name: "exchangerate-api".to_string(),
        }
    }
}

/// Client for the external exchange-rate API
pub struct HttpRateSource {
    config: HttpRateSourceConfig,
    client: Client,
}

impl HttpRateSource {
    /// Create a client with default configuration
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(HttpRateSourceConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: HttpRateSourceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    fn latest_url(&self, base: &Currency) -> String {
        format!(
            "{}/latest/{}",
            self.config.base_url.trim_end_matches('/'),
            base
        )
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn latest(&self, base: &Currency) -> anyhow::Result<RateTable> {
        let url = self.latest_url(base);

        tracing::debug!(url = %url, "Fetching exchange rates");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Exchange rate API error: {} - {}", status, body);
        }

        let body = response.text().await?;
        parse_rate_table(&body, Utc::now())
    }
}

/// Raw `/latest/{base}` response
///
/// Accepts both the `base`/`rates` and `base_code`/`conversion_rates` shapes.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(alias = "base_code")]
    base: String,
    #[serde(alias = "conversion_rates")]
    rates: HashMap<String, Decimal>,
}

/// Parse a rate table, dropping currencies the engine does not support
fn parse_rate_table(body: &str, fetched_at: DateTime<Utc>) -> anyhow::Result<RateTable> {
    let raw: LatestResponse = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Failed to parse rate table: {}", e))?;

    let base = Currency::new(&raw.base)?;
    let rates = raw
        .rates
        .into_iter()
        .filter_map(|(code, rate)| Currency::new(&code).ok().map(|c| (c, rate)))
        .filter(|(_, rate)| *rate > Decimal::ZERO)
        .collect::<HashMap<_, _>>();

    if rates.is_empty() {
        anyhow::bail!("Rate table for {} contained no usable rates", base);
    }

    Ok(RateTable {
        base,
        rates,
        fetched_at,
    })
}
