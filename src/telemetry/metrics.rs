//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// End-to-end quote, cache hits included
    Quote,
    /// Exchange-rate fetch
    RateFetch,
    /// Historical demand/supply fetch
    HistoryFetch,
    /// Forecast generation
    Forecast,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Quote served from the price cache
    CacheHit,
    /// Quote computed fresh
    CacheMiss,
    /// Quote degraded to base-price passthrough
    FallbackQuote,
    /// A factor calculator failed and was neutralised
    FactorDegraded,
    /// Exchange-rate fetch failed or timed out
    RateFetchFailure,
    /// Stale exchange rate served after a fetch failure
    StaleRateServed,
    /// Historical data fetch failed or timed out
    HistoryFailure,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Last applied surge multiplier
    SurgeMultiplier,
    /// Entries held in the price cache
    CachedPrices,
    /// Currency pairs held in the rate cache
    CachedRates,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Quote => "pricing_quote_latency_ms",
        LatencyMetric::RateFetch => "pricing_rate_fetch_latency_ms",
        LatencyMetric::HistoryFetch => "pricing_history_fetch_latency_ms",
        LatencyMetric::Forecast => "pricing_forecast_latency_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
    tracing::trace!(
        metric = metric_name,
        value_ms = duration.as_millis(),
        "Recording latency"
    );
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::CacheHit => "pricing_cache_hits_total",
        CounterMetric::CacheMiss => "pricing_cache_misses_total",
        CounterMetric::FallbackQuote => "pricing_fallback_quotes_total",
        CounterMetric::FactorDegraded => "pricing_factor_degraded_total",
        CounterMetric::RateFetchFailure => "pricing_rate_fetch_failures_total",
        CounterMetric::StaleRateServed => "pricing_stale_rates_served_total",
        CounterMetric::HistoryFailure => "pricing_history_failures_total",
    };

    ::metrics::counter!(metric_name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::SurgeMultiplier => "pricing_surge_multiplier",
        GaugeMetric::CachedPrices => "pricing_cached_prices",
        GaugeMetric::CachedRates => "pricing_cached_rates",
    };

    ::metrics::gauge!(metric_name).set(value);
}
