//! CLI interface for surge-pricing
//!
//! Provides subcommands for:
//! - `quote`: Price a service at a location
//! - `surge`: Show the surge multiplier for a location and category
//! - `forecast`: Forecast demand and recommended multipliers
//! - `compare`: Compare competitor prices
//! - `config`: Show the effective configuration

mod compare;
mod forecast;
mod quote;
mod surge;

pub use compare::CompareArgs;
pub use forecast::ForecastArgs;
pub use quote::QuoteArgs;
pub use surge::SurgeArgs;

use crate::competition::{CompetitiveAnalyzer, StaticCatalog};
use crate::config::Config;
use crate::context::{Currency, Location};
use crate::currency::HttpRateSource;
use crate::history::InMemoryHistory;
use crate::pricing::PricingEngine;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "surge-pricing")]
#[command(about = "Dynamic pricing engine with surge multipliers and currency conversion")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Price a service at a location
    Quote(QuoteArgs),
    /// Show the surge multiplier for a location and category
    Surge(SurgeArgs),
    /// Forecast demand and recommended multipliers
    Forecast(ForecastArgs),
    /// Compare competitor prices
    Compare(CompareArgs),
    /// Show the effective configuration
    Config,
}

/// Where the request is priced
#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Local currency (ISO 4217)
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Country code (ISO 3166 alpha-2)
    #[arg(long, default_value = "US")]
    pub country: String,
}

impl LocationArgs {
    pub fn location(&self) -> anyhow::Result<Location> {
        let currency = Currency::new(&self.currency)?;
        let location = Location::new(self.lat, self.lng, currency, &self.country);
        location.validate()?;
        Ok(location)
    }
}

/// Parse a lowercase enum value through its serde representation
pub(crate) fn parse_lowercase<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unsupported value '{}'", value))
}

/// Build an engine wired to the HTTP rate source and the configured history
pub async fn build_engine(config: &Config) -> anyhow::Result<PricingEngine> {
    let history = match &config.history.path {
        Some(path) => {
            let history = InMemoryHistory::load(path)?;
            tracing::info!(path = %path.display(), samples = history.len().await, "Loaded history");
            history
        }
        None => InMemoryHistory::new(),
    };

    let rate_source = HttpRateSource::with_config(config.rate_source_config())?;
    let catalog = StaticCatalog::new(config.competitors.clone());

    PricingEngine::builder()
        .with_config(config.engine_config())
        .with_history(Arc::new(history))
        .with_rate_source(Arc::new(rate_source))
        .with_rate_config(config.rate_provider_config(), config.fee_schedule())
        .with_smoothing(config.smoothing())
        .with_forecast_config(config.forecaster_config())
        .with_analyzer(CompetitiveAnalyzer::new(Arc::new(catalog)))
        .build()
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
