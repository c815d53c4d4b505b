//! Configuration types for surge-pricing

use crate::competition::CatalogEntry;
use crate::currency::{FeeSchedule, HttpRateSourceConfig, RateProviderConfig, EXCHANGE_RATE_API_URL};
use crate::forecast::ForecasterConfig;
use crate::pricing::{ConfidenceWeights, EngineConfig};
use crate::surge::SmoothingConfig;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub surge: SurgeConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Competitor listings for the static catalog
    #[serde(default)]
    pub competitors: Vec<CatalogEntry>,
}

/// Quote composition and caching
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Quote lifetime and price cache TTL (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Factors above this are listed in explanations
    #[serde(default = "default_materiality_high")]
    pub materiality_high: Decimal,

    /// Factors below this are listed in explanations
    #[serde(default = "default_materiality_low")]
    pub materiality_low: Decimal,

    /// Confidence reported on base-price fallbacks
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: Decimal,

    /// How far ahead cheaper alternatives are searched (hours)
    #[serde(default = "default_alternatives_horizon_hours")]
    pub alternatives_horizon_hours: i64,

    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,

    #[serde(default = "default_confidence_weights")]
    pub confidence_weights: ConfidenceWeights,
}

fn default_cache_ttl_secs() -> u64 {
    900
}
fn default_materiality_high() -> Decimal {
    Decimal::new(11, 1) // 1.1
}
fn default_materiality_low() -> Decimal {
    Decimal::new(9, 1) // 0.9
}
fn default_fallback_confidence() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_alternatives_horizon_hours() -> i64 {
    6
}
fn default_max_alternatives() -> usize {
    3
}
fn default_confidence_weights() -> ConfidenceWeights {
    ConfidenceWeights::default()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            materiality_high: default_materiality_high(),
            materiality_low: default_materiality_low(),
            fallback_confidence: default_fallback_confidence(),
            alternatives_horizon_hours: default_alternatives_horizon_hours(),
            max_alternatives: default_max_alternatives(),
            confidence_weights: default_confidence_weights(),
        }
    }
}

/// Surge smoothing and signal window
#[derive(Debug, Clone, Deserialize)]
pub struct SurgeConfig {
    /// Weight of a new raw multiplier
    #[serde(default = "default_alpha")]
    pub alpha: Decimal,

    /// Largest change between consecutive applied multipliers
    #[serde(default = "default_max_step")]
    pub max_step: Decimal,

    /// Previous multipliers older than this are ignored (seconds)
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,

    /// History window the demand/supply ratio is aggregated over (seconds)
    #[serde(default = "default_signal_window_secs")]
    pub default_window_secs: i64,
}

fn default_alpha() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_max_step() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_window_secs() -> i64 {
    300
}
fn default_signal_window_secs() -> i64 {
    900
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            max_step: default_max_step(),
            window_secs: default_window_secs(),
            default_window_secs: default_signal_window_secs(),
        }
    }
}

/// Exchange-rate source and cache
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// How long fetched rates are served without refetching (seconds)
    #[serde(default = "default_rate_ttl_secs")]
    pub rate_ttl_secs: i64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Fee rates keyed by "FROM/TO", replacing the tiered default
    #[serde(default)]
    pub fee_overrides: HashMap<String, Decimal>,
}

fn default_api_url() -> String {
    EXCHANGE_RATE_API_URL.to_string()
}
fn default_rate_ttl_secs() -> i64 {
    3600
}
fn default_timeout_ms() -> u64 {
    3000
}
fn default_provider_name() -> String {
    "exchangerate-api".to_string()
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            rate_ttl_secs: default_rate_ttl_secs(),
            timeout_ms: default_timeout_ms(),
            provider_name: default_provider_name(),
            fee_overrides: HashMap::new(),
        }
    }
}

/// Historical demand store
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// JSON file of history records loaded by the CLI
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            path: None,
        }
    }
}

/// Demand forecasting
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_lookback_days() -> i64 {
    28
}
fn default_max_points() -> usize {
    1000
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            max_points: default_max_points(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pricing.cache_ttl_secs == 0 {
            anyhow::bail!("pricing.cache_ttl_secs must be positive");
        }
        if self.pricing.materiality_low >= self.pricing.materiality_high {
            anyhow::bail!("pricing.materiality_low must be below materiality_high");
        }
        if self.surge.alpha <= Decimal::ZERO || self.surge.alpha > Decimal::ONE {
            anyhow::bail!("surge.alpha must be in (0, 1]");
        }
        if self.surge.max_step <= Decimal::ZERO {
            anyhow::bail!("surge.max_step must be positive");
        }
        if self.surge.default_window_secs <= 0 {
            anyhow::bail!("surge.default_window_secs must be positive");
        }
        if self.currency.rate_ttl_secs <= 0 {
            anyhow::bail!("currency.rate_ttl_secs must be positive");
        }
        if self.forecast.lookback_days <= 0 {
            anyhow::bail!("forecast.lookback_days must be positive");
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let ttl = chrono::Duration::seconds(self.pricing.cache_ttl_secs as i64);
        EngineConfig {
            cache_ttl: ttl,
            fingerprint_bucket_secs: self.pricing.cache_ttl_secs as i64,
            materiality_high: self.pricing.materiality_high,
            materiality_low: self.pricing.materiality_low,
            fallback_confidence: self.pricing.fallback_confidence,
            alternatives_horizon_hours: self.pricing.alternatives_horizon_hours,
            max_alternatives: self.pricing.max_alternatives,
            confidence_weights: self.pricing.confidence_weights,
            surge_window: chrono::Duration::seconds(self.surge.default_window_secs),
            history_timeout: Duration::from_millis(self.history.timeout_ms),
        }
    }

    pub fn smoothing(&self) -> SmoothingConfig {
        SmoothingConfig {
            alpha: self.surge.alpha,
            max_step: self.surge.max_step,
            window_secs: self.surge.window_secs,
        }
    }

    pub fn rate_provider_config(&self) -> RateProviderConfig {
        RateProviderConfig {
            rate_ttl: chrono::Duration::seconds(self.currency.rate_ttl_secs),
            fetch_timeout: Duration::from_millis(self.currency.timeout_ms),
        }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(self.currency.fee_overrides.clone())
    }

    pub fn rate_source_config(&self) -> HttpRateSourceConfig {
        HttpRateSourceConfig {
            base_url: self.currency.api_url.clone(),
            timeout: Duration::from_millis(self.currency.timeout_ms),
            name: self.currency.provider_name.clone(),
        }
    }

    pub fn forecaster_config(&self) -> ForecasterConfig {
        ForecasterConfig {
            lookback_days: self.forecast.lookback_days,
            max_points: self.forecast.max_points,
            history_timeout: Duration::from_millis(self.history.timeout_ms),
        }
    }
}
