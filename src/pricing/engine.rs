//! Pricing orchestrator
//!
//! Validates a request, serves it from the price cache when possible and
//! otherwise composes factors, surge, experiment variant and currency
//! conversion into a quote.

use super::explanation::{cheaper_alternatives, material_factors, summarize};
use super::{ConfidenceWeights, DynamicPrice, Explanation, PricingError};
use crate::cache::{FingerprintInput, PriceCache};
use crate::clock::{Clock, SystemClock};
use crate::competition::{CompetitiveAnalyzer, PriceComparison};
use crate::context::{Location, Money, PricingContext, PricingOptions, QualityTier};
use crate::currency::{
    CurrencyConversion, FeeSchedule, RateError, RateProvider, RateProviderConfig, RateSource,
};
use crate::experiment::{AppliedVariant, ExperimentManager};
use crate::factors::{FactorEvaluation, FactorSet, PricingFactors, TimeOfDayFactor};
use crate::forecast::{
    DemandForecaster, ForecastPeriod, ForecastPoint, ForecasterConfig, Granularity,
};
use crate::history::{DemandSnapshot, HistoricalDataStore};
use crate::surge::{SignalSource, SmoothingConfig, SurgeCalculator, SurgeInfo};
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Demand signal confidence by origin
const HISTORY_CONFIDENCE: Decimal = dec!(0.9);
const EMPTY_HISTORY_CONFIDENCE: Decimal = dec!(0.7);
const FAILED_HISTORY_CONFIDENCE: Decimal = dec!(0.5);

/// Conversion confidence by rate freshness
const FRESH_RATE_CONFIDENCE: Decimal = dec!(0.95);
const STALE_RATE_CONFIDENCE: Decimal = dec!(0.6);

/// How long a degraded quote may be shown
const FALLBACK_VALIDITY_SECS: i64 = 60;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quote lifetime, also the price cache TTL
    pub cache_ttl: Duration,
    /// Width of the time bucket hashed into fingerprints
    pub fingerprint_bucket_secs: i64,
    /// Factors above this are reported in explanations
    pub materiality_high: Decimal,
    /// Factors below this are reported in explanations
    pub materiality_low: Decimal,
    pub fallback_confidence: Decimal,
    pub alternatives_horizon_hours: i64,
    pub max_alternatives: usize,
    pub confidence_weights: ConfidenceWeights,
    /// History window the surge ratio is aggregated over
    pub surge_window: Duration,
    pub history_timeout: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::minutes(15),
            fingerprint_bucket_secs: 900,
            materiality_high: dec!(1.1),
            materiality_low: dec!(0.9),
            fallback_confidence: dec!(0.5),
            alternatives_horizon_hours: 6,
            max_alternatives: 3,
            confidence_weights: ConfidenceWeights::default(),
            surge_window: Duration::minutes(15),
            history_timeout: std::time::Duration::from_secs(3),
        }
    }
}

/// Why a quote fell back to the base price
#[derive(Debug, Error)]
enum Degraded {
    #[error("no external data source reachable")]
    Unreachable,
    #[error("no exchange rate available for {from}/{to}")]
    NoRate { from: String, to: String },
    #[error("price arithmetic overflowed")]
    Overflow,
    #[error("currency conversion failed: {0}")]
    Conversion(#[from] RateError),
}

/// Whether a quote records its surge in the live smoothing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurgeMode {
    Live,
    Preview,
}

/// Demand/supply ratio for a cell and where it came from
#[derive(Debug, Clone, Copy)]
struct DemandSignal {
    ratio: Decimal,
    source: SignalSource,
    confidence: Decimal,
    /// The history store failed or timed out
    history_failed: bool,
}

/// Builder for [`PricingEngine`]
pub struct PricingEngineBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    history: Option<Arc<dyn HistoricalDataStore>>,
    rate_source: Option<Arc<dyn RateSource>>,
    rate_provider: Option<Arc<RateProvider>>,
    rate_config: RateProviderConfig,
    fees: FeeSchedule,
    factors: FactorSet,
    smoothing: SmoothingConfig,
    forecast: ForecasterConfig,
    experiments: Option<Arc<ExperimentManager>>,
    analyzer: Option<CompetitiveAnalyzer>,
}

impl PricingEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            history: None,
            rate_source: None,
            rate_provider: None,
            rate_config: RateProviderConfig::default(),
            fees: FeeSchedule::default(),
            factors: FactorSet::standard(),
            smoothing: SmoothingConfig::default(),
            forecast: ForecasterConfig::default(),
            experiments: None,
            analyzer: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the historical demand store (required)
    pub fn with_history(mut self, history: Arc<dyn HistoricalDataStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the exchange-rate source; the engine builds its own provider
    pub fn with_rate_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.rate_source = Some(source);
        self
    }

    pub fn with_rate_config(mut self, config: RateProviderConfig, fees: FeeSchedule) -> Self {
        self.rate_config = config;
        self.fees = fees;
        self
    }

    /// Use an existing rate provider, sharing its rate cache
    pub fn with_rate_provider(mut self, provider: Arc<RateProvider>) -> Self {
        self.rate_provider = Some(provider);
        self
    }

    pub fn with_factors(mut self, factors: FactorSet) -> Self {
        self.factors = factors;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_forecast_config(mut self, config: ForecasterConfig) -> Self {
        self.forecast = config;
        self
    }

    pub fn with_experiments(mut self, experiments: Arc<ExperimentManager>) -> Self {
        self.experiments = Some(experiments);
        self
    }

    pub fn with_analyzer(mut self, analyzer: CompetitiveAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn build(self) -> anyhow::Result<PricingEngine> {
        let history = self
            .history
            .ok_or_else(|| anyhow::anyhow!("A historical data store is required"))?;

        let rates = match (self.rate_provider, self.rate_source) {
            (Some(provider), _) => provider,
            (None, Some(source)) => Arc::new(RateProvider::with_config(
                source,
                Arc::clone(&self.clock),
                self.rate_config,
                self.fees,
            )),
            (None, None) => anyhow::bail!("A rate source or rate provider is required"),
        };

        let forecaster = DemandForecaster::with_config(
            Arc::clone(&history),
            Arc::clone(&self.clock),
            self.forecast,
        );

        Ok(PricingEngine {
            cache: PriceCache::new(self.config.cache_ttl),
            config: self.config,
            clock: self.clock,
            history,
            rates,
            factors: self.factors,
            surge: SurgeCalculator::new(self.smoothing),
            forecaster,
            experiments: self.experiments,
            analyzer: self.analyzer,
        })
    }
}

impl Default for PricingEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dynamic pricing engine
///
/// Every collaborator is injected through [`PricingEngineBuilder`]. Quotes are
/// independent and may be computed concurrently; identical requests share one
/// computation through the price cache.
pub struct PricingEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    history: Arc<dyn HistoricalDataStore>,
    rates: Arc<RateProvider>,
    factors: FactorSet,
    surge: SurgeCalculator,
    cache: PriceCache,
    forecaster: DemandForecaster,
    experiments: Option<Arc<ExperimentManager>>,
    analyzer: Option<CompetitiveAnalyzer>,
}

impl PricingEngine {
    pub fn builder() -> PricingEngineBuilder {
        PricingEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn rates(&self) -> &RateProvider {
        &self.rates
    }

    pub fn surge_calculator(&self) -> &SurgeCalculator {
        &self.surge
    }

    pub fn forecaster(&self) -> &DemandForecaster {
        &self.forecaster
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Quote a service
    ///
    /// Fails only for invalid input. When no exchange rate is available for a
    /// cross-currency quote, or the arithmetic overflows, the base price is
    /// returned unchanged with reduced confidence and the quote is not cached.
    pub async fn calculate_dynamic_price(
        &self,
        service_id: &str,
        provider_id: &str,
        base_price: Money,
        ctx: &PricingContext,
        opts: &PricingOptions,
    ) -> Result<DynamicPrice, PricingError> {
        validate_request(service_id, provider_id, &base_price, ctx, opts)?;

        let started = Instant::now();
        let now = self.clock.now();
        let variant = self.select_variant(opts, now).await;
        let variant_key = variant
            .as_ref()
            .map(|v| format!("{}:{}", v.experiment_id, v.variant));

        let fingerprint = FingerprintInput {
            service_id,
            provider_id,
            base_price: &base_price,
            context: ctx,
            options: opts,
            variant: variant_key.as_deref(),
            bucket_secs: self.config.fingerprint_bucket_secs,
        }
        .fingerprint();

        let result = self
            .cache
            .get_or_try_compute(&fingerprint, now, self.config.cache_ttl, || {
                self.compute(
                    service_id,
                    provider_id,
                    &base_price,
                    ctx,
                    opts,
                    variant.clone(),
                    SurgeMode::Live,
                    now,
                )
            })
            .await;

        let price = match result {
            Ok(outcome) => {
                if outcome.hit {
                    telemetry::increment(CounterMetric::CacheHit);
                    tracing::debug!(
                        fingerprint = %fingerprint.short(),
                        service_id,
                        "Price cache hit"
                    );
                } else {
                    telemetry::increment(CounterMetric::CacheMiss);
                }
                outcome.price
            }
            Err(reason) => {
                tracing::warn!(
                    service_id,
                    provider_id,
                    reason = %reason,
                    "Returning degraded base price"
                );
                telemetry::increment(CounterMetric::FallbackQuote);
                self.fallback_price(service_id, provider_id, base_price, &reason, now)
            }
        };

        telemetry::record_latency(LatencyMetric::Quote, started.elapsed());
        tracing::info!(
            service_id,
            provider_id,
            final_price = %price.final_price,
            currency = %price.currency,
            surge = %price.surge_multiplier,
            confidence = %price.confidence,
            degraded = price.explanation.degraded,
            "Price quoted"
        );
        Ok(price)
    }

    /// Price a request as if it were quoted now, leaving no trace
    ///
    /// The surge is smoothed against the live state without updating it, and
    /// the result is neither cached nor bucketed into an experiment. Used for
    /// competitor listings.
    pub async fn quote_hypothetical(
        &self,
        service_id: &str,
        provider_id: &str,
        base_price: Money,
        ctx: &PricingContext,
        opts: &PricingOptions,
    ) -> Result<DynamicPrice, PricingError> {
        validate_request(service_id, provider_id, &base_price, ctx, opts)?;

        let now = self.clock.now();
        let result = self
            .compute(
                service_id,
                provider_id,
                &base_price,
                ctx,
                opts,
                None,
                SurgeMode::Preview,
                now,
            )
            .await;
        Ok(match result {
            Ok(price) => price,
            Err(reason) => {
                tracing::debug!(
                    service_id,
                    provider_id,
                    reason = %reason,
                    "Hypothetical quote degraded"
                );
                self.fallback_price(service_id, provider_id, base_price, &reason, now)
            }
        })
    }

    /// Surge for a location and category over a history window
    ///
    /// Updates the cell's smoothing state like a live quote does. Without
    /// usable history the ratio is neutral.
    pub async fn calculate_surge_multiplier(
        &self,
        location: &Location,
        category: &str,
        time_window: Duration,
    ) -> Result<SurgeInfo, PricingError> {
        location.validate()?;
        if category.trim().is_empty() {
            return Err(PricingError::InvalidInput {
                field: "category".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if time_window <= Duration::zero() {
            return Err(PricingError::InvalidInput {
                field: "time_window".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let now = self.clock.now();
        let signal = self
            .demand_signal(location, category, time_window, Decimal::ONE, now)
            .await;
        Ok(self.surge(location, category, &signal, SurgeMode::Live, now))
    }

    /// Compare hypothetical competitor quotes for a category
    pub async fn get_competitive_pricing(
        &self,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
    ) -> Result<PriceComparison, PricingError> {
        self.analyzer()?
            .compare(self, category, location, quality_tier)
            .await
    }

    /// Like [`PricingEngine::get_competitive_pricing`], positioning `reference_price`
    pub async fn get_competitive_pricing_with_reference(
        &self,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
        reference_price: Decimal,
    ) -> Result<PriceComparison, PricingError> {
        self.analyzer()?
            .compare_with_reference(self, category, location, quality_tier, reference_price)
            .await
    }

    fn analyzer(&self) -> Result<&CompetitiveAnalyzer, PricingError> {
        self.analyzer.as_ref().ok_or(PricingError::Unavailable {
            collaborator: "provider catalog",
            reason: "no catalog configured".to_string(),
        })
    }

    /// Hourly demand and recommended multipliers over a period
    pub async fn forecast_demand_and_pricing(
        &self,
        category: &str,
        location: &Location,
        period: ForecastPeriod,
    ) -> Result<Vec<ForecastPoint>, PricingError> {
        self.forecaster
            .forecast(category, location, period, Granularity::Hour)
            .await
    }

    async fn select_variant(
        &self,
        opts: &PricingOptions,
        now: DateTime<Utc>,
    ) -> Option<AppliedVariant> {
        let experiments = self.experiments.as_ref()?;
        let key = opts.request_key.as_deref()?;
        experiments
            .select_variant(key, opts.customer_segment.as_deref(), now)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn compute(
        &self,
        service_id: &str,
        provider_id: &str,
        base_price: &Money,
        ctx: &PricingContext,
        opts: &PricingOptions,
        variant: Option<AppliedVariant>,
        mode: SurgeMode,
        now: DateTime<Utc>,
    ) -> Result<DynamicPrice, Degraded> {
        let (evaluation, signal) = tokio::join!(
            async { self.factors.evaluate(ctx, opts) },
            self.demand_signal(
                &ctx.location,
                &opts.category,
                self.config.surge_window,
                ctx.snapshot_ratio(),
                now
            ),
        );

        let target = &ctx.location.currency;
        // Same-currency quotes consult no other external source
        if signal.history_failed && base_price.currency == *target {
            return Err(Degraded::Unreachable);
        }
        let surge = self.surge(&ctx.location, &opts.category, &signal, mode, now);

        let mut multiplier = evaluation
            .factors
            .product()
            .and_then(|m| m.checked_mul(surge.multiplier))
            .ok_or(Degraded::Overflow)?;
        if let Some(applied) = &variant {
            multiplier = multiplier
                .checked_mul(applied.price_multiplier)
                .ok_or(Degraded::Overflow)?;
        }
        let local_amount = base_price
            .amount
            .checked_mul(multiplier)
            .ok_or(Degraded::Overflow)?;

        let conversion = self
            .rates
            .convert(local_amount, &base_price.currency, target)
            .await?;
        if conversion.degraded {
            return Err(Degraded::NoRate {
                from: base_price.currency.to_string(),
                to: target.to_string(),
            });
        }

        let final_price = conversion
            .converted_amount
            .round_dp_with_strategy(target.minor_units(), RoundingStrategy::MidpointAwayFromZero);
        let confidence = self.confidence(&evaluation, &surge, &conversion);
        let explanation = self
            .explain(ctx, opts, &evaluation.factors, &surge, final_price, target.minor_units(), now)
            .await;
        let cross_currency = base_price.currency != *target;

        Ok(DynamicPrice {
            service_id: service_id.to_string(),
            provider_id: provider_id.to_string(),
            base_price: base_price.clone(),
            final_price,
            currency: target.clone(),
            factors: evaluation.factors,
            surge_multiplier: surge.multiplier,
            confidence,
            valid_until: now + self.config.cache_ttl,
            explanation,
            conversion: cross_currency.then_some(conversion),
            experiment: variant,
            computed_at: now,
        })
    }

    /// Demand/supply ratio for a cell, falling back to `fallback_ratio`
    async fn demand_signal(
        &self,
        location: &Location,
        category: &str,
        window: Duration,
        fallback_ratio: Decimal,
        now: DateTime<Utc>,
    ) -> DemandSignal {
        let cell = location.cell();
        let started = Instant::now();
        let fetch = self.history.samples(category, cell, now - window, now);
        let result = tokio::time::timeout(self.config.history_timeout, fetch).await;
        telemetry::record_latency(LatencyMetric::HistoryFetch, started.elapsed());

        let failed = DemandSignal {
            ratio: fallback_ratio,
            source: SignalSource::Snapshot,
            confidence: FAILED_HISTORY_CONFIDENCE,
            history_failed: true,
        };
        match result {
            Ok(Ok(samples)) => match DemandSnapshot::from_samples(&samples) {
                Some(snapshot) => DemandSignal {
                    ratio: snapshot.ratio(),
                    source: SignalSource::History,
                    confidence: HISTORY_CONFIDENCE,
                    history_failed: false,
                },
                None => DemandSignal {
                    ratio: fallback_ratio,
                    source: SignalSource::Snapshot,
                    confidence: EMPTY_HISTORY_CONFIDENCE,
                    history_failed: false,
                },
            },
            Ok(Err(e)) => {
                tracing::warn!(
                    category,
                    cell = %cell,
                    error = %e,
                    "History unavailable, using snapshot levels"
                );
                telemetry::increment(CounterMetric::HistoryFailure);
                failed
            }
            Err(_) => {
                tracing::warn!(
                    category,
                    cell = %cell,
                    "History fetch timed out, using snapshot levels"
                );
                telemetry::increment(CounterMetric::HistoryFailure);
                failed
            }
        }
    }

    fn surge(
        &self,
        location: &Location,
        category: &str,
        signal: &DemandSignal,
        mode: SurgeMode,
        now: DateTime<Utc>,
    ) -> SurgeInfo {
        let cell = location.cell();
        match mode {
            SurgeMode::Live => {
                self.surge
                    .apply(cell, category, signal.ratio, signal.source, signal.confidence, now)
            }
            SurgeMode::Preview => {
                self.surge
                    .preview(cell, category, signal.ratio, signal.source, signal.confidence, now)
            }
        }
    }

    fn confidence(
        &self,
        evaluation: &FactorEvaluation,
        surge: &SurgeInfo,
        conversion: &CurrencyConversion,
    ) -> Decimal {
        let factor_confidence = if evaluation.assessments.is_empty() {
            Decimal::ONE
        } else {
            evaluation
                .assessments
                .iter()
                .map(|a| a.confidence)
                .sum::<Decimal>()
                / Decimal::from(evaluation.assessments.len())
        };
        let conversion_confidence = if conversion.from_currency == conversion.to_currency {
            Decimal::ONE
        } else if conversion.stale {
            STALE_RATE_CONFIDENCE
        } else {
            FRESH_RATE_CONFIDENCE
        };
        self.config
            .confidence_weights
            .combine(factor_confidence, surge.confidence, conversion_confidence)
    }

    #[allow(clippy::too_many_arguments)]
    async fn explain(
        &self,
        ctx: &PricingContext,
        opts: &PricingOptions,
        factors: &PricingFactors,
        surge: &SurgeInfo,
        final_price: Decimal,
        decimal_places: u32,
        now: DateTime<Utc>,
    ) -> Explanation {
        let primary_factors = material_factors(
            factors,
            self.config.materiality_high,
            self.config.materiality_low,
        );
        let summary = summarize(surge, &primary_factors);

        let alternatives = if surge.is_active() && opts.include_alternatives {
            let start = now.duration_trunc(Duration::hours(1)).unwrap_or(now) + Duration::hours(1);
            let period = ForecastPeriod::hours_from(start, self.config.alternatives_horizon_hours);
            match self
                .forecaster
                .forecast(&opts.category, &ctx.location, period, Granularity::Hour)
                .await
            {
                Ok(points) => cheaper_alternatives(
                    &points,
                    final_price,
                    surge.multiplier,
                    TimeOfDayFactor::multiplier_for(ctx.time_of_day, ctx.day_of_week),
                    decimal_places,
                    self.config.max_alternatives,
                ),
                Err(e) => {
                    tracing::debug!(error = %e, "No alternatives, forecast failed");
                    vec![]
                }
            }
        } else {
            vec![]
        };

        Explanation {
            summary,
            primary_factors,
            alternatives,
            degraded: false,
        }
    }

    fn fallback_price(
        &self,
        service_id: &str,
        provider_id: &str,
        base_price: Money,
        reason: &Degraded,
        now: DateTime<Utc>,
    ) -> DynamicPrice {
        DynamicPrice {
            service_id: service_id.to_string(),
            provider_id: provider_id.to_string(),
            final_price: base_price.amount,
            currency: base_price.currency.clone(),
            base_price,
            factors: PricingFactors::neutral(),
            surge_multiplier: Decimal::ONE,
            confidence: self.config.fallback_confidence,
            valid_until: now + Duration::seconds(FALLBACK_VALIDITY_SECS),
            explanation: Explanation {
                summary: format!("Degraded pricing, base price returned unchanged: {}", reason),
                primary_factors: vec![],
                alternatives: vec![],
                degraded: true,
            },
            conversion: None,
            experiment: None,
            computed_at: now,
        }
    }
}

fn validate_request(
    service_id: &str,
    provider_id: &str,
    base_price: &Money,
    ctx: &PricingContext,
    opts: &PricingOptions,
) -> Result<(), PricingError> {
    if service_id.trim().is_empty() {
        return Err(PricingError::InvalidInput {
            field: "service_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if provider_id.trim().is_empty() {
        return Err(PricingError::InvalidInput {
            field: "provider_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if base_price.amount < Decimal::ZERO {
        return Err(PricingError::InvalidInput {
            field: "base_price.amount".to_string(),
            reason: format!("{} is negative", base_price.amount),
        });
    }
    ctx.validate()?;
    opts.validate()?;
    Ok(())
}
