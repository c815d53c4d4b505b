//! Historical demand/supply data
//!
//! The booking history lives outside the engine; it is consumed through
//! [`HistoricalDataStore`] as raw time series per (category, location cell).

mod memory;

pub use memory::{HistoryRecord, InMemoryHistory};

use crate::context::LocationCell;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Ratio reported when demand exists but no supply does
const NO_SUPPLY_RATIO: Decimal = dec!(10);

/// One time bucket of observed demand and supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandSample {
    /// Start of the bucket
    pub bucket_start: DateTime<Utc>,
    /// Booking requests observed in the bucket
    pub demand: Decimal,
    /// Providers available in the bucket
    pub supply: Decimal,
}

impl DemandSample {
    pub fn new(bucket_start: DateTime<Utc>, demand: Decimal, supply: Decimal) -> Self {
        Self {
            bucket_start,
            demand,
            supply,
        }
    }

    pub fn ratio(&self) -> Decimal {
        demand_supply_ratio(self.demand, self.supply)
    }
}

/// Aggregate of the samples in a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandSnapshot {
    pub demand: Decimal,
    pub supply: Decimal,
    pub sample_count: usize,
}

impl DemandSnapshot {
    /// Sum a window of samples, `None` when the window is empty
    pub fn from_samples(samples: &[DemandSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let demand = samples.iter().map(|s| s.demand).sum();
        let supply = samples.iter().map(|s| s.supply).sum();
        Some(Self {
            demand,
            supply,
            sample_count: samples.len(),
        })
    }

    pub fn ratio(&self) -> Decimal {
        demand_supply_ratio(self.demand, self.supply)
    }
}

fn demand_supply_ratio(demand: Decimal, supply: Decimal) -> Decimal {
    if supply <= Decimal::ZERO {
        if demand > Decimal::ZERO {
            NO_SUPPLY_RATIO
        } else {
            Decimal::ONE
        }
    } else {
        demand / supply
    }
}

/// Trait for historical data store implementations
#[async_trait]
pub trait HistoricalDataStore: Send + Sync {
    /// Samples for a category and cell with `bucket_start` in `[from, to)`
    async fn samples(
        &self,
        category: &str,
        cell: LocationCell,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DemandSample>>;
}
