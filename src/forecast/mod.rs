//! Demand forecast module

mod forecaster;
mod types;

pub use forecaster::{DemandForecaster, ForecasterConfig};
pub use types::{ForecastFactors, ForecastPeriod, ForecastPoint, Granularity};
