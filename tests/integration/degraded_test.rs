//! Collaborator outage tests

use crate::support::{new_york, paris, quiet_morning, CountingHistory, Harness};
use chrono::Duration;
use rust_decimal_macros::dec;
use surge_pricing::context::{
    Currency, DemandLevel, Money, PricingContext, PricingOptions, SupplyLevel, Urgency,
};
use surge_pricing::pricing::EngineConfig;
use surge_pricing::surge::SignalSource;
use tokio_test::assert_ok;

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::usd())
}

#[tokio::test]
async fn test_total_outage_returns_base_price() {
    let harness = Harness::new();
    harness.history.fail(true);
    harness.rates.fail(true);

    let ctx = PricingContext::new(paris(), quiet_morning());
    let opts = PricingOptions::default();
    let price = assert_ok!(
        harness
            .engine
            .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
            .await
    );

    assert!(price.is_degraded());
    assert_eq!(price.final_price, dec!(100));
    assert_eq!(price.currency, Currency::usd());
    assert_eq!(price.confidence, dec!(0.5));
    assert_eq!(price.surge_multiplier, dec!(1));
    assert!(price.conversion.is_none());
    assert!(harness.engine.cache().is_empty());
}

#[tokio::test]
async fn test_same_currency_outage_returns_base_price() {
    let harness = Harness::new();
    harness.history.fail(true);
    harness.rates.fail(true);

    // Evening peak, high urgency: every factor would raise the price
    let evening = quiet_morning() + Duration::hours(7);
    harness.advance(Duration::hours(7));
    let ctx = PricingContext::new(new_york(), evening)
        .with_market(DemandLevel::Surge, SupplyLevel::Low);
    let opts = PricingOptions::new("rides").with_urgency(Urgency::High);
    let price = assert_ok!(
        harness
            .engine
            .calculate_dynamic_price("ride", "driver", usd(dec!(100)), &ctx, &opts)
            .await
    );

    assert!(price.is_degraded());
    assert_eq!(price.final_price, dec!(100));
    assert_eq!(price.currency, Currency::usd());
    assert_eq!(price.confidence, dec!(0.5));
    assert_eq!(harness.rates.calls(), 0);
    assert!(harness.engine.cache().is_empty());
    assert_eq!(harness.engine.surge_calculator().tracked_cells(), 0);
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let harness = Harness::new();
    harness.rates.fail(true);

    let ctx = PricingContext::new(paris(), quiet_morning());
    let opts = PricingOptions::default();
    let degraded = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    assert!(degraded.is_degraded());

    harness.rates.fail(false);
    let recovered = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    assert!(!recovered.is_degraded());
    assert_eq!(recovered.final_price, dec!(90.00));
    assert_eq!(recovered.currency, Currency::eur());
    assert_eq!(harness.rates.calls(), 2);
}

#[tokio::test]
async fn test_stale_rate_lowers_confidence() {
    let harness = Harness::new();
    let ctx = PricingContext::new(paris(), quiet_morning());
    let opts = PricingOptions::default();

    let fresh = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    harness.rates.fail(true);
    harness.advance(Duration::hours(2));
    let stale = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    assert!(!stale.is_degraded());
    assert_eq!(stale.final_price, dec!(90.00));
    assert!(stale.conversion.as_ref().unwrap().stale);
    assert!(stale.confidence < fresh.confidence);
}

#[tokio::test]
async fn test_history_failure_uses_snapshot_levels() {
    let harness = Harness::new();
    harness.history.fail(true);

    // The rate source still answers for a cross-currency quote
    let ctx = PricingContext::new(paris(), quiet_morning())
        .with_market(DemandLevel::Surge, SupplyLevel::Low);
    let surge = harness
        .engine
        .calculate_surge_multiplier(&new_york(), "rides", Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(surge.source, SignalSource::Snapshot);

    harness.engine.surge_calculator().reset();
    let opts = PricingOptions::new("rides");
    let price = harness
        .engine
        .calculate_dynamic_price("ride", "driver", usd(dec!(10)), &ctx, &opts)
        .await
        .unwrap();
    assert!(!price.is_degraded());
    assert_eq!(price.currency, Currency::eur());
    assert!(price.surge_multiplier > dec!(1));
    assert!(price.confidence < dec!(0.9));
}

#[tokio::test]
async fn test_slow_history_times_out() {
    let config = EngineConfig {
        history_timeout: std::time::Duration::from_millis(20),
        ..EngineConfig::default()
    };
    let harness = Harness::with(
        CountingHistory::with_delay(std::time::Duration::from_millis(500)),
        config,
        |b| b,
    );

    let surge = harness
        .engine
        .calculate_surge_multiplier(&new_york(), "rides", Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(surge.source, SignalSource::Snapshot);
    assert_eq!(surge.confidence, dec!(0.5));
    assert_eq!(surge.multiplier, dec!(1.0));
}
