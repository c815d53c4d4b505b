//! Quote composition tests

use crate::support::{new_york, paris, quiet_morning, Harness};
use chrono::Duration;
use rust_decimal_macros::dec;
use surge_pricing::context::{
    Currency, Money, PricingContext, PricingOptions, QualityTier, Urgency, Weather,
    WeatherCondition,
};
use surge_pricing::factors::FactorKind;
use surge_pricing::pricing::Impact;
use surge_pricing::surge::{SignalSource, SurgeBand};

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::usd())
}

#[tokio::test]
async fn test_high_surge_with_high_urgency() {
    let harness = Harness::new();
    harness
        .history
        .observe("rides", &new_york(), quiet_morning() - Duration::minutes(5), dec!(25), dec!(10))
        .await;

    let ctx = PricingContext::new(new_york(), quiet_morning());
    let opts = PricingOptions::new("rides").with_urgency(Urgency::High);
    let price = harness
        .engine
        .calculate_dynamic_price("ride-1", "driver-7", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    assert_eq!(price.surge_multiplier, dec!(2.0));
    assert_eq!(price.factors.urgency, dec!(1.3));
    assert_eq!(price.final_price, dec!(260));
    assert_eq!(price.currency, Currency::usd());
    assert!(price.conversion.is_none());
    assert_eq!(price.valid_until, quiet_morning() + Duration::minutes(15));

    let urgency = &price.explanation.primary_factors[0];
    assert_eq!(urgency.factor, FactorKind::Urgency);
    assert_eq!(urgency.impact, Impact::Increase);
    assert!(price.explanation.summary.contains("high band"));
}

#[tokio::test]
async fn test_same_currency_skips_rate_source() {
    let harness = Harness::new();
    let ctx = PricingContext::new(new_york(), quiet_morning());
    let price = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(42.50)), &ctx, &PricingOptions::default())
        .await
        .unwrap();

    assert_eq!(price.final_price, dec!(42.50));
    assert_eq!(harness.rates.calls(), 0);
}

#[tokio::test]
async fn test_cross_currency_conversion() {
    let harness = Harness::new();
    let ctx = PricingContext::new(paris(), quiet_morning());
    let price = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &PricingOptions::default())
        .await
        .unwrap();

    assert_eq!(price.currency, Currency::eur());
    assert_eq!(price.final_price, dec!(90.00));
    let conversion = price.conversion.expect("conversion recorded");
    assert_eq!(conversion.rate, dec!(0.9));
    assert_eq!(conversion.fees, dec!(0.90));
    assert_eq!(conversion.total_cost, dec!(90.90));
    assert!(!conversion.stale);
}

#[tokio::test]
async fn test_surge_smoothed_between_quotes() {
    let harness = Harness::new();
    let start = quiet_morning();
    harness
        .history
        .observe("rides", &new_york(), start - Duration::minutes(5), dec!(25), dec!(10))
        .await;

    let ctx = PricingContext::new(new_york(), start);
    let opts = PricingOptions::new("rides");
    let first = harness
        .engine
        .calculate_dynamic_price("ride-1", "driver-1", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    assert_eq!(first.surge_multiplier, dec!(2.0));

    // Demand spikes into the extreme band a minute later
    harness
        .history
        .observe("rides", &new_york(), start - Duration::minutes(2), dec!(40), dec!(10))
        .await;
    harness.advance(Duration::minutes(1));

    let ctx = PricingContext::new(new_york(), start + Duration::minutes(1));
    let second = harness
        .engine
        .calculate_dynamic_price("ride-2", "driver-1", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();
    assert_eq!(second.surge_multiplier, dec!(2.25));
    assert_eq!(second.final_price, dec!(225));
}

#[tokio::test]
async fn test_factor_stack_and_explanation() {
    let harness = Harness::new();
    let ctx = PricingContext::new(new_york(), quiet_morning()).with_weather(Weather {
        condition: WeatherCondition::Snow,
        observed_at: quiet_morning(),
    });
    let opts = PricingOptions::new("delivery").with_quality(QualityTier::Budget);
    let price = harness
        .engine
        .calculate_dynamic_price("svc", "prov", usd(dec!(100)), &ctx, &opts)
        .await
        .unwrap();

    // snow 1.25 x budget 0.8
    assert_eq!(price.final_price, dec!(100));
    let kinds: Vec<_> = price
        .explanation
        .primary_factors
        .iter()
        .map(|c| c.factor)
        .collect();
    assert_eq!(kinds, vec![FactorKind::Weather, FactorKind::Quality]);
    assert!(price.explanation.alternatives.is_empty());
}

#[tokio::test]
async fn test_calculate_surge_multiplier_reads_history() {
    let harness = Harness::new();
    harness
        .history
        .observe(
            "cleaning",
            &new_york(),
            quiet_morning() - Duration::minutes(20),
            dec!(36),
            dec!(10),
        )
        .await;

    let info = harness
        .engine
        .calculate_surge_multiplier(&new_york(), "cleaning", Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(info.band, SurgeBand::Extreme);
    assert_eq!(info.multiplier, dec!(2.5));
    assert_eq!(info.source, SignalSource::History);
    assert_eq!(info.duration_minutes, 60);
    assert_eq!(info.affected_radius_km, dec!(5.4));

    // A 15 minute window misses the sample
    harness.engine.surge_calculator().reset();
    let info = harness
        .engine
        .calculate_surge_multiplier(&new_york(), "cleaning", Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(info.band, SurgeBand::None);
}

#[test]
fn test_currency_codes_parsed_case_insensitively() {
    assert!(Currency::new("XYZ").is_err());
    assert!(Currency::new("usd").is_ok());
}
