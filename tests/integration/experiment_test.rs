//! Pricing experiment tests

use crate::support::{new_york, quiet_morning, Harness};
use chrono::Duration;
use rust_decimal_macros::dec;
use std::sync::Arc;
use surge_pricing::context::{Currency, Money, PricingContext, PricingOptions};
use surge_pricing::experiment::{ExperimentManager, PricingExperiment, PricingVariant};

fn two_arm_experiment() -> PricingExperiment {
    PricingExperiment::new(
        "ride-price-lift",
        vec![
            PricingVariant::new("control", dec!(1.0)),
            PricingVariant::new("plus20", dec!(1.2)),
        ],
        quiet_morning() - Duration::days(1),
        quiet_morning() + Duration::days(7),
    )
}

#[tokio::test]
async fn test_variant_applied_consistently() {
    let manager = Arc::new(ExperimentManager::new());
    manager.register(two_arm_experiment()).await.unwrap();
    let shared = manager.clone();
    let harness = Harness::with(Default::default(), Default::default(), move |b| {
        b.with_experiments(shared)
    });

    let ctx = PricingContext::new(new_york(), quiet_morning());
    let base = Money::new(dec!(100), Currency::usd());
    let mut seen = std::collections::HashSet::new();
    for i in 0..64 {
        let key = format!("customer-{}", i);
        let opts = PricingOptions::new("rides").with_segment("returning", key.as_str());
        let price = harness
            .engine
            .calculate_dynamic_price("ride", "driver", base.clone(), &ctx, &opts)
            .await
            .unwrap();

        let expected = manager
            .select_variant(&key, Some("returning"), quiet_morning())
            .await
            .unwrap();
        let applied = price.experiment.clone().unwrap();
        assert_eq!(applied, expected);
        assert_eq!(price.final_price, dec!(100) * applied.price_multiplier);
        seen.insert(applied.variant);
    }
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_segment_targeting() {
    let manager = Arc::new(ExperimentManager::new());
    manager
        .register(PricingExperiment::new(
            "vip-discount",
            vec![PricingVariant::new("vip", dec!(0.9)).for_segment("vip")],
            quiet_morning() - Duration::hours(1),
            quiet_morning() + Duration::hours(1),
        ))
        .await
        .unwrap();
    let harness = Harness::with(Default::default(), Default::default(), move |b| {
        b.with_experiments(manager)
    });
    let ctx = PricingContext::new(new_york(), quiet_morning());
    let base = Money::new(dec!(100), Currency::usd());
    let rides = PricingOptions::new("rides");

    let regular = harness
        .engine
        .calculate_dynamic_price("ride", "driver", base.clone(), &ctx, &rides)
        .await
        .unwrap();
    assert!(regular.experiment.is_none());
    assert_eq!(regular.final_price, dec!(100));

    let vip = harness
        .engine
        .calculate_dynamic_price(
            "ride",
            "driver",
            base,
            &ctx,
            &PricingOptions::new("rides").with_segment("vip", "customer-1"),
        )
        .await
        .unwrap();
    assert_eq!(vip.final_price, dec!(90));
    assert_eq!(vip.experiment.unwrap().variant, "vip");
}

#[tokio::test]
async fn test_experiments_persist_across_restarts() {
    let manager = ExperimentManager::new();
    let id = manager.register(two_arm_experiment()).await.unwrap();
    manager.record_outcome(id, "plus20", true, dec!(120)).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiments.json");
    manager.save(&path).await.unwrap();

    let restored = ExperimentManager::load(&path).await.unwrap();
    assert_eq!(restored.get(id).await, manager.get(id).await);
    for key in ["a", "b", "c", "d"] {
        assert_eq!(
            restored.select_variant(key, None, quiet_morning()).await,
            manager.select_variant(key, None, quiet_morning()).await
        );
    }
}
