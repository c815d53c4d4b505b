//! Conversion fee schedule

use crate::context::Currency;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Fee rates per currency pair, 1-3% by default
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    /// Overrides keyed by "FROM/TO"
    overrides: HashMap<String, Decimal>,
}

impl FeeSchedule {
    pub fn new(overrides: HashMap<String, Decimal>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(pair, fee)| (pair.to_ascii_uppercase(), fee))
            .collect();
        Self { overrides }
    }

    /// Fee as a fraction of the converted amount
    pub fn fee_rate(&self, from: &Currency, to: &Currency) -> Decimal {
        if from == to {
            return Decimal::ZERO;
        }
        if let Some(fee) = self.overrides.get(&format!("{}/{}", from, to)) {
            return *fee;
        }
        match (from.is_major(), to.is_major()) {
            (true, true) => dec!(0.01),
            (true, false) | (false, true) => dec!(0.02),
            (false, false) => dec!(0.03),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    #[test]
    fn test_default_tiers() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.fee_rate(&c("USD"), &c("EUR")), dec!(0.01));
        assert_eq!(fees.fee_rate(&c("USD"), &c("KES")), dec!(0.02));
        assert_eq!(fees.fee_rate(&c("NGN"), &c("KES")), dec!(0.03));
        assert_eq!(fees.fee_rate(&c("USD"), &c("USD")), dec!(0));
    }

    #[test]
    fn test_override() {
        let fees = FeeSchedule::new(HashMap::from([("usd/gbp".to_string(), dec!(0.005))]));
        assert_eq!(fees.fee_rate(&c("USD"), &c("GBP")), dec!(0.005));
        assert_eq!(fees.fee_rate(&c("GBP"), &c("USD")), dec!(0.01));
    }
}
