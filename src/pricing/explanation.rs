//! Quote explanations

use super::{FactorContribution, Impact, PriceAlternative};
use crate::factors::PricingFactors;
use crate::forecast::ForecastPoint;
use crate::surge::SurgeInfo;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Factors outside `(low, high)`, largest effect first
pub fn material_factors(
    factors: &PricingFactors,
    high: Decimal,
    low: Decimal,
) -> Vec<FactorContribution> {
    let mut material: Vec<_> = factors
        .iter()
        .filter(|(_, m)| *m > high || *m < low)
        .map(|(kind, multiplier)| {
            let impact = if multiplier > Decimal::ONE {
                Impact::Increase
            } else {
                Impact::Decrease
            };
            let percent = ((multiplier - Decimal::ONE) * dec!(100)).abs().round_dp(1).normalize();
            let verb = match impact {
                Impact::Increase => "raised",
                Impact::Decrease => "lowered",
            };
            FactorContribution {
                factor: kind,
                multiplier,
                impact,
                description: format!("{} {} the price by {}%", kind.label(), verb, percent),
            }
        })
        .collect();
    material.sort_by(|a, b| {
        (b.multiplier - Decimal::ONE)
            .abs()
            .cmp(&(a.multiplier - Decimal::ONE).abs())
    });
    material
}

pub fn summarize(surge: &SurgeInfo, contributions: &[FactorContribution]) -> String {
    if surge.is_active() {
        return format!(
            "Surge pricing in effect ({} band, {}x): {}",
            surge.band,
            surge.multiplier.normalize(),
            surge.reason
        );
    }
    if contributions.is_empty() {
        return "Standard pricing: no factor moved the price materially".to_string();
    }
    let labels: Vec<_> = contributions.iter().map(|c| c.factor.label()).collect();
    format!("Price adjusted by {}", labels.join(", "))
}

/// Forecast ticks where the same request is expected to cost less
///
/// The estimate rescales the current price by the forecast surge and
/// time-of-day multipliers relative to the current ones.
pub fn cheaper_alternatives(
    points: &[ForecastPoint],
    current_price: Decimal,
    current_surge: Decimal,
    current_time_factor: Decimal,
    decimal_places: u32,
    limit: usize,
) -> Vec<PriceAlternative> {
    if current_surge <= Decimal::ZERO || current_time_factor <= Decimal::ZERO {
        return vec![];
    }

    let mut alternatives: Vec<_> = points
        .iter()
        .filter_map(|point| {
            let scale = point
                .factors
                .surge
                .checked_mul(point.factors.time)?
                .checked_div(current_surge * current_time_factor)?;
            let estimated = current_price
                .checked_mul(scale)?
                .round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
            if estimated >= current_price {
                return None;
            }
            let savings = current_price - estimated;
            Some(PriceAlternative {
                starts_at: point.timestamp,
                estimated_price: estimated,
                savings,
                surge_multiplier: point.factors.surge,
                description: format!(
                    "Booking at {} is expected to save {}",
                    point.timestamp.format("%H:%M UTC"),
                    savings
                ),
            })
        })
        .collect();

    alternatives.sort_by(|a, b| {
        a.estimated_price
            .cmp(&b.estimated_price)
            .then(a.starts_at.cmp(&b.starts_at))
    });
    alternatives.truncate(limit);
    alternatives
}
