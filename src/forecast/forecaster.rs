//! History-driven demand forecaster

use super::{ForecastFactors, ForecastPeriod, ForecastPoint, Granularity};
use crate::clock::Clock;
use crate::context::{DemandLevel, Location, Season};
use crate::factors::{SeasonalFactor, TimeOfDayFactor};
use crate::history::{DemandSample, HistoricalDataStore};
use crate::pricing::PricingError;
use crate::surge::SurgeBand;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const NO_HISTORY_CONFIDENCE: Decimal = dec!(0.3);
const MAX_SAMPLE_CONFIDENCE: Decimal = dec!(0.9);
const MAX_HORIZON_PENALTY: Decimal = dec!(0.3);

/// Forecaster configuration
#[derive(Debug, Clone)]
pub struct ForecasterConfig {
    /// Days of history the weekday/hour profile is built from
    pub lookback_days: i64,
    /// Largest number of points one forecast may return
    pub max_points: usize,
    pub history_timeout: std::time::Duration,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            lookback_days: 28,
            max_points: 1000,
            history_timeout: std::time::Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: Decimal,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, ratio: Decimal) {
        self.sum += ratio;
        self.count += 1;
    }

    fn mean(&self) -> Option<(Decimal, usize)> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / Decimal::from(self.count), self.count))
    }
}

/// Average demand/supply ratio per weekday and hour
#[derive(Debug, Default)]
struct DemandProfile {
    by_slot: HashMap<(u32, u32), Accumulator>,
    by_weekday: HashMap<u32, Accumulator>,
    overall: Accumulator,
}

impl DemandProfile {
    fn build(samples: &[DemandSample]) -> Self {
        let mut profile = Self::default();
        for sample in samples {
            let weekday = sample.bucket_start.weekday().num_days_from_monday();
            let hour = sample.bucket_start.hour();
            let ratio = sample.ratio();
            profile.by_slot.entry((weekday, hour)).or_default().add(ratio);
            profile.by_weekday.entry(weekday).or_default().add(ratio);
            profile.overall.add(ratio);
        }
        profile
    }

    /// Expected ratio and supporting sample count for a tick
    fn estimate(&self, at: DateTime<Utc>, granularity: Granularity) -> Option<(Decimal, usize)> {
        let weekday = at.weekday().num_days_from_monday();
        let specific = match granularity {
            Granularity::Hour => self
                .by_slot
                .get(&(weekday, at.hour()))
                .and_then(Accumulator::mean),
            Granularity::Day => self.by_weekday.get(&weekday).and_then(Accumulator::mean),
            Granularity::Week => None,
        };
        specific.or_else(|| self.overall.mean())
    }
}

/// Projects demand and recommended multipliers over a time grid
///
/// Read-only with respect to live surge state.
pub struct DemandForecaster {
    history: Arc<dyn HistoricalDataStore>,
    clock: Arc<dyn Clock>,
    config: ForecasterConfig,
}

impl DemandForecaster {
    pub fn new(history: Arc<dyn HistoricalDataStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(history, clock, ForecasterConfig::default())
    }

    pub fn with_config(
        history: Arc<dyn HistoricalDataStore>,
        clock: Arc<dyn Clock>,
        config: ForecasterConfig,
    ) -> Self {
        Self {
            history,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub async fn forecast(
        &self,
        category: &str,
        location: &Location,
        period: ForecastPeriod,
        granularity: Granularity,
    ) -> Result<Vec<ForecastPoint>, PricingError> {
        location.validate()?;
        period.validate(granularity, self.config.max_points)?;

        let started = Instant::now();
        let anchor = self.clock.now().min(period.start);
        let samples = self.lookback(category, location, anchor).await;
        let profile = DemandProfile::build(&samples);
        let southern = location.is_southern_hemisphere();

        let step = granularity.step();
        let mut points = Vec::with_capacity(period.tick_count(granularity) as usize);
        let mut at = period.start;
        while at < period.end {
            let (ratio, confidence) = match profile.estimate(at, granularity) {
                Some((ratio, count)) => (ratio, confidence_for(count, at - anchor)),
                None => (Decimal::ONE, NO_HISTORY_CONFIDENCE),
            };

            let factors = ForecastFactors {
                surge: SurgeBand::from_ratio(ratio).multiplier(),
                seasonal: SeasonalFactor::multiplier_for(Season::from_month(at.month(), southern)),
                time: match granularity {
                    Granularity::Hour => TimeOfDayFactor::multiplier_for(at.hour(), at.weekday()),
                    Granularity::Day | Granularity::Week => Decimal::ONE,
                },
            };

            points.push(ForecastPoint {
                timestamp: at,
                demand_level: DemandLevel::from_ratio(ratio),
                ratio: ratio.round_dp(4),
                recommended_multiplier: (factors.surge * factors.seasonal * factors.time)
                    .round_dp(4),
                confidence,
                factors,
            });
            at += step;
        }

        telemetry::record_latency(LatencyMetric::Forecast, started.elapsed());
        tracing::debug!(
            category,
            cell = %location.cell(),
            points = points.len(),
            samples = samples.len(),
            "Forecast computed"
        );
        Ok(points)
    }

    /// History before `anchor`; empty when the store fails
    async fn lookback(
        &self,
        category: &str,
        location: &Location,
        anchor: DateTime<Utc>,
    ) -> Vec<DemandSample> {
        let from = anchor - Duration::days(self.config.lookback_days);
        let fetch = self.history.samples(category, location.cell(), from, anchor);
        match tokio::time::timeout(self.config.history_timeout, fetch).await {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                tracing::warn!(category, error = %e, "History unavailable for forecast");
                telemetry::increment(CounterMetric::HistoryFailure);
                vec![]
            }
            Err(_) => {
                tracing::warn!(category, "History fetch timed out for forecast");
                telemetry::increment(CounterMetric::HistoryFailure);
                vec![]
            }
        }
    }
}

/// Grows with supporting samples, decays 0.02 per day of horizon
fn confidence_for(samples: usize, horizon: Duration) -> Decimal {
    let support =
        (dec!(0.5) + Decimal::from(samples.min(8)) * dec!(0.05)).min(MAX_SAMPLE_CONFIDENCE);
    let hours_ahead = Decimal::from(horizon.num_hours().max(0));
    let penalty = (hours_ahead * dec!(0.02) / dec!(24)).min(MAX_HORIZON_PENALTY);
    (support - penalty).max(NO_HISTORY_CONFIDENCE).round_dp(4)
}
