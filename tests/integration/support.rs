//! Fakes and fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use surge_pricing::clock::ManualClock;
use surge_pricing::context::{Currency, Location, LocationCell};
use surge_pricing::currency::{RateSource, RateTable};
use surge_pricing::history::{DemandSample, HistoricalDataStore, InMemoryHistory};
use surge_pricing::pricing::{EngineConfig, PricingEngine, PricingEngineBuilder};

/// Wednesday 11:00 UTC in autumn, every temporal factor neutral
pub fn quiet_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 11, 0, 0).unwrap()
}

pub fn new_york() -> Location {
    Location::new(40.71, -74.0, Currency::usd(), "US")
}

pub fn paris() -> Location {
    Location::new(48.86, 2.35, Currency::eur(), "FR")
}

/// History store that counts fetches and can fail or stall on demand
#[derive(Default)]
pub struct CountingHistory {
    pub inner: InMemoryHistory,
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
    pub delay: Option<std::time::Duration>,
}

impl CountingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Record one bucket of demand and supply for a location
    pub async fn observe(
        &self,
        category: &str,
        location: &Location,
        at: DateTime<Utc>,
        demand: Decimal,
        supply: Decimal,
    ) {
        self.inner
            .record(category, location, DemandSample::new(at, demand, supply))
            .await;
    }
}

#[async_trait]
impl HistoricalDataStore for CountingHistory {
    async fn samples(
        &self,
        category: &str,
        cell: LocationCell,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DemandSample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("history store unreachable");
        }
        self.inner.samples(category, cell, from, to).await
    }
}

/// Rate source that counts fetches and can fail on demand
pub struct CountingRates {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
    rates: HashMap<Currency, Decimal>,
}

impl CountingRates {
    /// USD-based table with EUR at 0.9 and GBP at 0.8
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            rates: HashMap::from([
                (Currency::eur(), dec!(0.9)),
                (Currency::new("GBP").unwrap(), dec!(0.8)),
            ]),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RateSource for CountingRates {
    fn name(&self) -> &str {
        "counting"
    }

    async fn latest(&self, base: &Currency) -> anyhow::Result<RateTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("rate API unreachable");
        }
        Ok(RateTable {
            base: base.clone(),
            rates: self.rates.clone(),
            fetched_at: Utc::now(),
        })
    }
}

/// Engine wired to the fakes, plus handles for inspecting them
pub struct Harness {
    pub engine: PricingEngine,
    pub clock: Arc<ManualClock>,
    pub history: Arc<CountingHistory>,
    pub rates: Arc<CountingRates>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(CountingHistory::new(), EngineConfig::default(), |b| b)
    }

    pub fn with(
        history: CountingHistory,
        config: EngineConfig,
        customize: impl FnOnce(PricingEngineBuilder) -> PricingEngineBuilder,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(quiet_morning()));
        let history = Arc::new(history);
        let rates = Arc::new(CountingRates::new());

        let builder = PricingEngine::builder()
            .with_config(config)
            .with_clock(clock.clone())
            .with_history(history.clone())
            .with_rate_source(rates.clone());
        let engine = customize(builder).build().unwrap();

        Self {
            engine,
            clock,
            history,
            rates,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}
