//! Stateful surge calculator
//!
//! Maps a demand/supply ratio to a band multiplier, then smooths it against
//! the multiplier last applied to the same (location cell, category) so that
//! consecutive quotes never move by more than `max_step`.

use super::{SignalSource, SmoothingConfig, SurgeBand, SurgeInfo};
use crate::context::LocationCell;
use crate::telemetry::{self, GaugeMetric};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Radius bounds for the area a surge applies to
const MIN_RADIUS_KM: Decimal = dec!(0.5);
const MAX_RADIUS_KM: Decimal = dec!(10);

/// Key of a surge cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SurgeKey {
    cell: LocationCell,
    category: String,
}

/// Last multiplier applied to a cell
#[derive(Debug, Clone, Copy)]
struct SurgeState {
    multiplier: Decimal,
    applied_at: DateTime<Utc>,
}

/// Surge calculator with per-cell smoothing state
pub struct SurgeCalculator {
    config: SmoothingConfig,
    state: DashMap<SurgeKey, SurgeState>,
}

impl SurgeCalculator {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            state: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Compute and record the surge for a cell
    ///
    /// Concurrent calls for the same cell serialize on the map shard, so each
    /// applied multiplier is smoothed against the one applied just before it.
    pub fn apply(
        &self,
        cell: LocationCell,
        category: &str,
        ratio: Decimal,
        source: SignalSource,
        confidence: Decimal,
        now: DateTime<Utc>,
    ) -> SurgeInfo {
        let band = SurgeBand::from_ratio(ratio);
        let raw = band.multiplier();
        let key = SurgeKey {
            cell,
            category: category.to_string(),
        };

        let applied = match self.state.entry(key) {
            Entry::Occupied(mut occupied) => {
                let previous = *occupied.get();
                let next = self.next_multiplier(Some(previous), raw, now);
                occupied.insert(SurgeState {
                    multiplier: next,
                    applied_at: now,
                });
                next
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SurgeState {
                    multiplier: raw,
                    applied_at: now,
                });
                raw
            }
        };

        telemetry::set_gauge(
            GaugeMetric::SurgeMultiplier,
            f64::try_from(applied).unwrap_or(1.0),
        );

        tracing::debug!(
            cell = %cell,
            category,
            ratio = %ratio,
            band = %band,
            raw = %raw,
            applied = %applied,
            "Surge applied"
        );

        surge_info(band, ratio, applied, source, confidence, now)
    }

    /// Surge a quote for the cell would see at `now`, without recording it
    ///
    /// Hypothetical quotes use this so they never move the live multiplier.
    pub fn preview(
        &self,
        cell: LocationCell,
        category: &str,
        ratio: Decimal,
        source: SignalSource,
        confidence: Decimal,
        now: DateTime<Utc>,
    ) -> SurgeInfo {
        let band = SurgeBand::from_ratio(ratio);
        let key = SurgeKey {
            cell,
            category: category.to_string(),
        };
        let previous = self.state.get(&key).map(|entry| *entry.value());
        let multiplier = self.next_multiplier(previous, band.multiplier(), now);
        surge_info(band, ratio, multiplier, source, confidence, now)
    }

    /// Last applied multiplier and its timestamp for a cell
    pub fn last_applied(
        &self,
        cell: LocationCell,
        category: &str,
    ) -> Option<(Decimal, DateTime<Utc>)> {
        let key = SurgeKey {
            cell,
            category: category.to_string(),
        };
        self.state
            .get(&key)
            .map(|s| (s.multiplier, s.applied_at))
    }

    /// Number of cells with recorded state
    pub fn tracked_cells(&self) -> usize {
        self.state.len()
    }

    /// Forget every cell's state
    pub fn reset(&self) {
        self.state.clear();
    }

    /// Smooth `raw` against a previous state still inside the window
    fn next_multiplier(
        &self,
        previous: Option<SurgeState>,
        raw: Decimal,
        now: DateTime<Utc>,
    ) -> Decimal {
        match previous {
            Some(prev) if self.within_window(prev.applied_at, now) => {
                self.smooth(prev.multiplier, raw)
            }
            _ => raw,
        }
    }

    fn within_window(&self, applied_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = now - applied_at;
        age >= Duration::zero() && age <= Duration::seconds(self.config.window_secs)
    }

    /// Exponential step toward `raw`, bounded by `max_step`
    fn smooth(&self, previous: Decimal, raw: Decimal) -> Decimal {
        let step = ((raw - previous) * self.config.alpha)
            .round_dp(4)
            .clamp(-self.config.max_step, self.config.max_step);
        previous + step
    }
}

impl Default for SurgeCalculator {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}

fn surge_info(
    band: SurgeBand,
    ratio: Decimal,
    multiplier: Decimal,
    source: SignalSource,
    confidence: Decimal,
    now: DateTime<Utc>,
) -> SurgeInfo {
    let raw = band.multiplier();
    SurgeInfo {
        multiplier,
        raw_multiplier: raw,
        band,
        ratio,
        reason: reason_for(band, ratio),
        duration_minutes: band.expected_duration_minutes(),
        affected_radius_km: (ratio * dec!(1.5))
            .clamp(MIN_RADIUS_KM, MAX_RADIUS_KM)
            .round_dp(1),
        smoothed: multiplier != raw,
        source,
        confidence,
        computed_at: now,
    }
}

fn reason_for(band: SurgeBand, ratio: Decimal) -> String {
    if !band.is_active() {
        return "Demand is balanced with available supply".to_string();
    }
    format!(
        "{} surge: {} requests per available provider",
        capitalize(&band.to_string()),
        ratio.round_dp(2)
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
