//! In-memory historical data store

use super::{DemandSample, HistoricalDataStore};
use crate::context::{Location, LocationCell};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

type SeriesKey = (String, LocationCell);

/// Flat record format used for JSON import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub bucket_start: DateTime<Utc>,
    pub demand: Decimal,
    pub supply: Decimal,
}

/// Holds demand/supply series in memory, keyed by category and cell
#[derive(Clone, Default)]
pub struct InMemoryHistory {
    series: Arc<RwLock<HashMap<SeriesKey, Vec<DemandSample>>>>,
}

impl InMemoryHistory {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from flat records
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        let mut series: HashMap<SeriesKey, Vec<DemandSample>> = HashMap::new();
        for record in records {
            let cell = LocationCell::from_coordinates(record.lat, record.lng);
            series
                .entry((record.category, cell))
                .or_default()
                .push(DemandSample::new(record.bucket_start, record.demand, record.supply));
        }
        for samples in series.values_mut() {
            samples.sort_by_key(|s| s.bucket_start);
        }
        Self {
            series: Arc::new(RwLock::new(series)),
        }
    }

    /// Load flat records from a JSON array file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<HistoryRecord> = serde_json::from_str(&content)?;
        Ok(Self::from_records(records))
    }

    /// Append a sample for a category at a location
    pub async fn record(&self, category: &str, location: &Location, sample: DemandSample) {
        let mut series = self.series.write().await;
        let samples = series
            .entry((category.to_string(), location.cell()))
            .or_default();
        let idx = samples.partition_point(|s| s.bucket_start <= sample.bucket_start);
        samples.insert(idx, sample);
    }

    /// Total samples held across every series
    pub async fn len(&self) -> usize {
        self.series.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HistoricalDataStore for InMemoryHistory {
    async fn samples(
        &self,
        category: &str,
        cell: LocationCell,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DemandSample>> {
        let series = self.series.read().await;
        let samples = series
            .get(&(category.to_string(), cell))
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.bucket_start >= from && s.bucket_start < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(samples)
    }
}
