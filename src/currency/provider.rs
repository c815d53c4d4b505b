//! Cached currency conversion
//!
//! Rates are cached per currency pair. A fresh entry is served without a
//! fetch; after a failed fetch the newest cached rate is served regardless of
//! age, and only when no rate was ever seen does conversion degrade to 1:1.

use super::{CachedRate, CurrencyConversion, FeeSchedule, RateError, RateSource};
use crate::clock::Clock;
use crate::context::Currency;
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::Duration;
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use std::time::Instant;

/// Rate provider configuration
#[derive(Debug, Clone)]
pub struct RateProviderConfig {
    /// How long a fetched rate is served without refetching
    pub rate_ttl: Duration,
    /// Upper bound on a single fetch
    pub fetch_timeout: std::time::Duration,
}

impl Default for RateProviderConfig {
    fn default() -> Self {
        Self {
            rate_ttl: Duration::hours(1),
            fetch_timeout: std::time::Duration::from_secs(3),
        }
    }
}

/// Where a conversion's rate came from
enum RateLookup {
    Fresh(CachedRate),
    Stale(CachedRate),
    Missing,
}

/// Converts amounts between currencies with a per-pair rate cache
pub struct RateProvider {
    source: Arc<dyn RateSource>,
    clock: Arc<dyn Clock>,
    config: RateProviderConfig,
    fees: FeeSchedule,
    cache: DashMap<(Currency, Currency), CachedRate>,
}

impl RateProvider {
    pub fn new(source: Arc<dyn RateSource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(source, clock, RateProviderConfig::default(), FeeSchedule::default())
    }

    pub fn with_config(
        source: Arc<dyn RateSource>,
        clock: Arc<dyn Clock>,
        config: RateProviderConfig,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            source,
            clock,
            config,
            fees,
            cache: DashMap::new(),
        }
    }

    /// Convert `amount` from one currency to another
    ///
    /// Never fails for a transient source outage; see the module docs for the
    /// fallback order.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<CurrencyConversion, RateError> {
        if amount < Decimal::ZERO {
            return Err(RateError::NegativeAmount(amount));
        }

        let now = self.clock.now();
        if from == to {
            return Ok(CurrencyConversion::identity(amount, from, to, now, false));
        }

        let (cached, stale) = match self.lookup(from, to).await {
            RateLookup::Fresh(rate) => (rate, false),
            RateLookup::Stale(rate) => (rate, true),
            RateLookup::Missing => {
                tracing::warn!(
                    from = %from,
                    to = %to,
                    "No exchange rate available, using identity"
                );
                return Ok(CurrencyConversion::identity(amount, from, to, now, true));
            }
        };

        let dp = to.minor_units();
        let converted = amount
            .checked_mul(cached.rate)
            .ok_or(RateError::Overflow {
                amount,
                rate: cached.rate,
            })?
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        let fees = (converted * self.fees.fee_rate(from, to))
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);

        Ok(CurrencyConversion {
            from_currency: from.clone(),
            to_currency: to.clone(),
            rate: cached.rate,
            converted_amount: converted,
            fees,
            total_cost: converted + fees,
            last_updated: cached.fetched_at,
            provider: cached.provider,
            stale,
            degraded: false,
        })
    }

    /// Cached rate for a pair, if any, regardless of age
    pub fn cached_rate(&self, from: &Currency, to: &Currency) -> Option<CachedRate> {
        self.cache
            .get(&(from.clone(), to.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Number of currency pairs held in the cache
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached rate
    pub fn clear(&self) {
        self.cache.clear();
    }

    async fn lookup(&self, from: &Currency, to: &Currency) -> RateLookup {
        let now = self.clock.now();
        let key = (from.clone(), to.clone());

        if let Some(entry) = self.cache.get(&key) {
            if now - entry.fetched_at < self.config.rate_ttl {
                return RateLookup::Fresh(entry.value().clone());
            }
        }

        if self.refresh(from).await {
            if let Some(entry) = self.cache.get(&key) {
                return RateLookup::Fresh(entry.value().clone());
            }
        }

        match self.cache.get(&key) {
            Some(entry) => {
                tracing::warn!(
                    from = %from,
                    to = %to,
                    fetched_at = %entry.fetched_at,
                    "Serving stale exchange rate"
                );
                telemetry::increment(CounterMetric::StaleRateServed);
                RateLookup::Stale(entry.value().clone())
            }
            None => RateLookup::Missing,
        }
    }

    /// Fetch the table for `base` and cache every pair in it
    async fn refresh(&self, base: &Currency) -> bool {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.config.fetch_timeout, self.source.latest(base)).await;
        telemetry::record_latency(LatencyMetric::RateFetch, started.elapsed());

        let table = match result {
            Ok(Ok(table)) => table,
            Ok(Err(e)) => {
                tracing::warn!(base = %base, error = %e, "Exchange rate fetch failed");
                telemetry::increment(CounterMetric::RateFetchFailure);
                return false;
            }
            Err(_) => {
                tracing::warn!(
                    base = %base,
                    timeout_ms = self.config.fetch_timeout.as_millis() as u64,
                    "Exchange rate fetch timed out"
                );
                telemetry::increment(CounterMetric::RateFetchFailure);
                return false;
            }
        };

        let fetched_at = self.clock.now();
        let provider = self.source.name().to_string();
        for (to, rate) in table.rates.iter().filter(|(_, r)| **r > Decimal::ZERO) {
            self.cache.insert(
                (table.base.clone(), to.clone()),
                CachedRate {
                    rate: *rate,
                    fetched_at,
                    provider: provider.clone(),
                },
            );
        }

        tracing::debug!(base = %base, pairs = table.rates.len(), "Exchange rates refreshed");
        telemetry::set_gauge(GaugeMetric::CachedRates, self.cache.len() as f64);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::currency::RateTable;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
        failing: AtomicBool,
        eur_rate: Decimal,
    }

    impl FakeSource {
        fn new(eur_rate: Decimal) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                eur_rate,
            }
        }
    }

    #[async_trait]
    impl RateSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn latest(&self, base: &Currency) -> anyhow::Result<RateTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("rate API unreachable");
            }
            Ok(RateTable {
                base: base.clone(),
                rates: HashMap::from([(Currency::eur(), self.eur_rate)]),
                fetched_at: Utc::now(),
            })
        }
    }

    fn provider(source: Arc<FakeSource>, clock: Arc<ManualClock>) -> RateProvider {
        RateProvider::new(source, clock)
    }

    #[tokio::test]
    async fn test_same_currency_identity() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source.clone(), clock);

        let conv = rates
            .convert(dec!(123.45), &Currency::usd(), &Currency::usd())
            .await
            .unwrap();
        assert_eq!(conv.rate, dec!(1));
        assert_eq!(conv.fees, dec!(0));
        assert_eq!(conv.converted_amount, dec!(123.45));
        assert!(!conv.degraded);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_convert_applies_rate_and_fee() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source, clock);

        let conv = rates
            .convert(dec!(100), &Currency::usd(), &Currency::eur())
            .await
            .unwrap();
        assert_eq!(conv.rate, dec!(0.9));
        assert_eq!(conv.converted_amount, dec!(90.00));
        assert_eq!(conv.fees, dec!(0.90));
        assert_eq!(conv.total_cost, dec!(90.90));
        assert_eq!(conv.provider, "fake");
        assert!(!conv.stale);
    }

    #[tokio::test]
    async fn test_rate_cached_within_ttl() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source.clone(), clock.clone());

        rates.convert(dec!(10), &Currency::usd(), &Currency::eur()).await.unwrap();
        clock.advance(Duration::minutes(59));
        rates.convert(dec!(20), &Currency::usd(), &Currency::eur()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::minutes(2));
        rates.convert(dec!(20), &Currency::usd(), &Currency::eur()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_rate_served_on_failure() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source.clone(), clock.clone());

        rates.convert(dec!(10), &Currency::usd(), &Currency::eur()).await.unwrap();
        source.failing.store(true, Ordering::SeqCst);
        clock.advance(Duration::days(2));

        let conv = rates
            .convert(dec!(10), &Currency::usd(), &Currency::eur())
            .await
            .unwrap();
        assert!(conv.stale);
        assert!(!conv.degraded);
        assert_eq!(conv.rate, dec!(0.9));
    }

    #[tokio::test]
    async fn test_identity_when_nothing_cached() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        source.failing.store(true, Ordering::SeqCst);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source, clock);

        let conv = rates
            .convert(dec!(10), &Currency::usd(), &Currency::eur())
            .await
            .unwrap();
        assert!(conv.degraded);
        assert_eq!(conv.rate, dec!(1));
        assert_eq!(conv.converted_amount, dec!(10));
    }

    #[tokio::test]
    async fn test_missing_pair_in_table() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source, clock);

        let conv = rates
            .convert(dec!(10), &Currency::usd(), &Currency::new("JPY").unwrap())
            .await
            .unwrap();
        assert!(conv.degraded);
        assert_eq!(rates.cached_pairs(), 1);
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let source = Arc::new(FakeSource::new(dec!(0.9)));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let rates = provider(source, clock);
        let result = rates
            .convert(dec!(-1), &Currency::usd(), &Currency::eur())
            .await;
        assert!(matches!(result, Err(RateError::NegativeAmount(_))));
    }
}
