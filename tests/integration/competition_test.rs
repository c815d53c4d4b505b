//! Competitive analysis tests

use crate::support::{new_york, quiet_morning, Harness};
use chrono::Duration;
use rust_decimal_macros::dec;
use std::sync::Arc;
use surge_pricing::competition::{CatalogEntry, CompetitiveAnalyzer, ProviderListing, StaticCatalog};
use surge_pricing::context::{Currency, Money, PricingContext, PricingOptions, QualityTier};

fn entry(
    id: &str,
    amount: rust_decimal::Decimal,
    currency: Currency,
    tier: QualityTier,
) -> CatalogEntry {
    listed_in("cleaning", id, amount, currency, tier)
}

fn listed_in(
    category: &str,
    id: &str,
    amount: rust_decimal::Decimal,
    currency: Currency,
    tier: QualityTier,
) -> CatalogEntry {
    CatalogEntry {
        category: category.to_string(),
        listing: ProviderListing {
            provider_id: id.to_string(),
            service_id: format!("{}-deep-clean", id),
            name: format!("Provider {}", id),
            base_price: Money::new(amount, currency),
            quality_tier: tier,
        },
    }
}

fn harness() -> Harness {
    let catalog = StaticCatalog::new(vec![
        entry("a", dec!(70), Currency::usd(), QualityTier::Standard),
        entry("b", dec!(80), Currency::usd(), QualityTier::Standard),
        entry("c", dec!(95), Currency::usd(), QualityTier::Standard),
        entry("d", dec!(120), Currency::usd(), QualityTier::Standard),
        entry("e", dec!(300), Currency::usd(), QualityTier::Premium),
    ]);
    Harness::with(Default::default(), Default::default(), move |b| {
        b.with_analyzer(CompetitiveAnalyzer::new(Arc::new(catalog)))
    })
}

#[tokio::test]
async fn test_market_statistics() {
    let harness = harness();
    let comparison = harness
        .engine
        .get_competitive_pricing("cleaning", &new_york(), QualityTier::Standard)
        .await
        .unwrap();

    assert_eq!(comparison.quotes.len(), 4);
    assert_eq!(comparison.currency, Currency::usd());
    assert_eq!(comparison.min, dec!(70));
    assert_eq!(comparison.max, dec!(120));
    assert_eq!(comparison.median, dec!(87.5));
    assert_eq!(comparison.average, dec!(91.25));
    assert_eq!(comparison.recommended_price, dec!(87.50));
    assert_eq!(comparison.competitiveness_score, dec!(0.5));
    assert!(!comparison.insights.is_empty());
}

#[tokio::test]
async fn test_reference_price_positioning() {
    let harness = harness();
    let comparison = harness
        .engine
        .get_competitive_pricing_with_reference(
            "cleaning",
            &new_york(),
            QualityTier::Standard,
            dec!(100),
        )
        .await
        .unwrap();

    assert_eq!(comparison.competitiveness_score, dec!(0.25));
    assert!(comparison.insights.iter().any(|i| i.starts_with("Your price")));
}

#[tokio::test]
async fn test_unconvertible_listing_excluded() {
    let catalog = StaticCatalog::new(vec![
        entry("a", dec!(70), Currency::usd(), QualityTier::Standard),
        entry("b", dec!(60), Currency::new("GBP").unwrap(), QualityTier::Standard),
    ]);
    let harness = Harness::with(Default::default(), Default::default(), move |b| {
        b.with_analyzer(CompetitiveAnalyzer::new(Arc::new(catalog)))
    });

    let comparison = harness
        .engine
        .get_competitive_pricing("cleaning", &new_york(), QualityTier::Standard)
        .await
        .unwrap();
    assert_eq!(comparison.quotes.len(), 1);
    assert!(comparison.insights.iter().any(|i| i.contains("excluded")));
}

#[tokio::test]
async fn test_unknown_category_unavailable() {
    let harness = harness();
    assert!(harness
        .engine
        .get_competitive_pricing("plumbing", &new_york(), QualityTier::Standard)
        .await
        .is_err());
}

#[tokio::test]
async fn test_comparison_does_not_move_live_surge() {
    let catalog = StaticCatalog::new(
        (0..6)
            .map(|i| {
                let amount = rust_decimal::Decimal::from(20 + i * 5);
                let id = format!("r{}", i);
                listed_in("rides", &id, amount, Currency::usd(), QualityTier::Standard)
            })
            .collect(),
    );
    let harness = Harness::with(Default::default(), Default::default(), move |b| {
        b.with_analyzer(CompetitiveAnalyzer::new(Arc::new(catalog)))
    });
    let surge = harness.engine.surge_calculator();
    let max_step = surge.config().max_step;
    let opts = PricingOptions::new("rides");
    let base = Money::new(dec!(30), Currency::usd());

    let ctx = PricingContext::new(new_york(), quiet_morning());
    let first = harness
        .engine
        .calculate_dynamic_price("ride-1", "driver", base.clone(), &ctx, &opts)
        .await
        .unwrap();
    assert_eq!(first.surge_multiplier, dec!(1.0));

    // Demand jumps into the extreme band
    harness
        .history
        .observe("rides", &new_york(), quiet_morning(), dec!(40), dec!(10))
        .await;
    harness.advance(Duration::seconds(10));
    let before = surge.last_applied(new_york().cell(), "rides");

    let comparison = harness
        .engine
        .get_competitive_pricing("rides", &new_york(), QualityTier::Standard)
        .await
        .unwrap();
    assert_eq!(comparison.quotes.len(), 6);
    assert_eq!(surge.last_applied(new_york().cell(), "rides"), before);

    let ctx = PricingContext::new(new_york(), quiet_morning() + Duration::seconds(10));
    let second = harness
        .engine
        .calculate_dynamic_price("ride-2", "driver", base, &ctx, &opts)
        .await
        .unwrap();
    assert!((second.surge_multiplier - first.surge_multiplier).abs() <= max_step);
    assert_eq!(second.surge_multiplier, dec!(1.25));
}
