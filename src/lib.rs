//! surge-pricing: Dynamic pricing engine for on-demand services
//!
//! This library provides the core components for:
//! - Pricing factors derived from time, weather, events, market and request
//! - Surge multipliers from demand/supply ratios with per-cell smoothing
//! - A TTL price cache with single-flight computation
//! - Currency conversion with cached exchange rates
//! - Demand forecasting over a time grid
//! - Competitive price comparison
//! - Price A/B experiment bookkeeping
//! - Structured logging and Prometheus metrics

pub mod cache;
pub mod cli;
pub mod clock;
pub mod competition;
pub mod config;
pub mod context;
pub mod currency;
pub mod experiment;
pub mod factors;
pub mod forecast;
pub mod history;
pub mod pricing;
pub mod surge;
pub mod telemetry;

pub use pricing::{DynamicPrice, PricingEngine, PricingError};
