//! Demand forecast tests

use crate::support::{new_york, quiet_morning, Harness};
use chrono::{Duration, Timelike};
use rust_decimal_macros::dec;
use surge_pricing::context::DemandLevel;
use surge_pricing::forecast::ForecastPeriod;
use surge_pricing::pricing::PricingError;

#[tokio::test]
async fn test_hourly_forecast_from_last_week() {
    let harness = Harness::new();
    let last_week = quiet_morning() - Duration::days(7);
    for hour in 0..12 {
        let demand = if hour == 7 { dec!(25) } else { dec!(10) };
        harness
            .history
            .observe("rides", &new_york(), last_week + Duration::hours(hour), demand, dec!(10))
            .await;
    }

    let period = ForecastPeriod::hours_from(quiet_morning(), 24);
    let points = harness
        .engine
        .forecast_demand_and_pricing("rides", &new_york(), period)
        .await
        .unwrap();

    assert_eq!(points.len(), 24);
    for (i, point) in points.iter().enumerate() {
        assert_eq!(point.timestamp, quiet_morning() + Duration::hours(i as i64));
        assert!(point.confidence >= dec!(0.3) && point.confidence <= dec!(0.9));
        assert!(point.recommended_multiplier > dec!(0));
    }

    let evening = points.iter().find(|p| p.timestamp.hour() == 18).unwrap();
    assert_eq!(evening.ratio, dec!(2.5));
    assert_eq!(evening.demand_level, DemandLevel::Surge);
    // high band 2.0 x evening peak 1.2
    assert_eq!(evening.recommended_multiplier, dec!(2.4));

    let noon = points.iter().find(|p| p.timestamp.hour() == 12).unwrap();
    assert_eq!(noon.ratio, dec!(1));
    assert_eq!(noon.recommended_multiplier, dec!(1));
}

#[tokio::test]
async fn test_forecast_leaves_surge_state_untouched() {
    let harness = Harness::new();
    harness
        .history
        .observe("rides", &new_york(), quiet_morning() - Duration::days(1), dec!(40), dec!(10))
        .await;

    harness
        .engine
        .forecast_demand_and_pricing(
            "rides",
            &new_york(),
            ForecastPeriod::hours_from(quiet_morning(), 12),
        )
        .await
        .unwrap();
    assert_eq!(harness.engine.surge_calculator().tracked_cells(), 0);
}

#[tokio::test]
async fn test_forecast_without_history_is_neutral() {
    let harness = Harness::new();
    let points = harness
        .engine
        .forecast_demand_and_pricing(
            "laundry",
            &new_york(),
            ForecastPeriod::hours_from(quiet_morning(), 3),
        )
        .await
        .unwrap();

    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|p| p.ratio == dec!(1) && p.confidence == dec!(0.3)));
}

#[tokio::test]
async fn test_inverted_period_rejected() {
    let harness = Harness::new();
    let period = ForecastPeriod::new(quiet_morning(), quiet_morning() - Duration::hours(1));
    let err = harness
        .engine
        .forecast_demand_and_pricing("rides", &new_york(), period)
        .await
        .unwrap_err();
    assert!(matches!(err, PricingError::InvalidInput { ref field, .. } if field == "period"));
}
