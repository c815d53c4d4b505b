//! Price cache and single-flight tests

use crate::support::{new_york, paris, quiet_morning, CountingHistory, Harness};
use chrono::Duration;
use futures_util::future::join_all;
use rust_decimal_macros::dec;
use surge_pricing::context::{Currency, Money, PricingContext, PricingOptions, Urgency};
use surge_pricing::pricing::EngineConfig;

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::usd())
}

#[tokio::test]
async fn test_identical_request_served_from_cache() {
    let harness = Harness::new();
    let ctx = PricingContext::new(paris(), quiet_morning());
    let opts = PricingOptions::new("cleaning");

    let first = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    let surge = harness.engine.surge_calculator();
    let applied = surge.last_applied(paris().cell(), "cleaning");
    assert_eq!(applied, Some((dec!(1.0), quiet_morning())));

    harness.advance(Duration::seconds(30));
    let second = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.history.calls(), 1);
    assert_eq!(harness.rates.calls(), 1);
    assert_eq!(harness.engine.cache().len(), 1);
    // Served without running the surge calculator again
    assert_eq!(surge.last_applied(paris().cell(), "cleaning"), applied);
}

#[tokio::test]
async fn test_concurrent_requests_compute_once() {
    let harness = Harness::with(
        CountingHistory::with_delay(std::time::Duration::from_millis(50)),
        EngineConfig::default(),
        |b| b,
    );
    let ctx = PricingContext::new(new_york(), quiet_morning());
    let opts = PricingOptions::new("rides");

    let quotes = join_all((0..16).map(|_| {
        harness
            .engine
            .calculate_dynamic_price("ride", "driver", usd(dec!(30)), &ctx, &opts)
    }))
    .await;

    assert_eq!(harness.history.calls(), 1);
    let first = quotes[0].as_ref().unwrap();
    for quote in &quotes {
        assert_eq!(quote.as_ref().unwrap(), first);
    }
}

#[tokio::test]
async fn test_expired_entry_recomputed() {
    let harness = Harness::new();
    let ctx = PricingContext::new(paris(), quiet_morning());
    let opts = PricingOptions::new("cleaning");

    harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    harness.advance(Duration::minutes(16));
    let later = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    assert_eq!(harness.history.calls(), 2);
    // The exchange rate is still fresh
    assert_eq!(harness.rates.calls(), 1);
    assert_eq!(later.computed_at, quiet_morning() + Duration::minutes(16));
}

#[tokio::test]
async fn test_distinct_requests_cached_separately() {
    let harness = Harness::new();
    let ctx = PricingContext::new(new_york(), quiet_morning());
    let standard = PricingOptions::new("rides");
    let urgent = PricingOptions::new("rides").with_urgency(Urgency::Emergency);

    let a = harness
        .engine
        .calculate_dynamic_price("ride", "driver", usd(dec!(50)), &ctx, &standard)
        .await
        .unwrap();
    let b = harness
        .engine
        .calculate_dynamic_price("ride", "driver", usd(dec!(50)), &ctx, &urgent)
        .await
        .unwrap();
    let c = harness
        .engine
        .calculate_dynamic_price("ride", "driver", usd(dec!(55)), &ctx, &standard)
        .await
        .unwrap();

    assert_eq!(a.final_price, dec!(50));
    assert_eq!(b.final_price, dec!(80));
    assert_eq!(c.final_price, dec!(55));
    assert_eq!(harness.history.calls(), 3);
    assert_eq!(harness.engine.cache().len(), 3);
}

#[tokio::test]
async fn test_expired_buckets_do_not_accumulate() {
    let harness = Harness::new();
    let opts = PricingOptions::new("cleaning");

    for i in 0..20 {
        let now = quiet_morning() + Duration::minutes(16 * i);
        let ctx = PricingContext::new(new_york(), now);
        harness
            .engine
            .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
            .await
            .unwrap();
        harness.advance(Duration::minutes(16));
    }

    assert_eq!(harness.history.calls(), 20);
    assert_eq!(harness.engine.cache().slot_count(), 1);
}
