//! Surge pricing module
//!
//! Demand/supply banding and temporal smoothing of surge multipliers

mod calculator;
mod types;

pub use calculator::SurgeCalculator;
pub use types::{SignalSource, SmoothingConfig, SurgeBand, SurgeInfo};
