//! Pricing context module
//!
//! The immutable snapshot of the world a quote is computed against:
//! where the service happens, when, and what the market looks like.

mod location;
mod types;

pub use location::{Currency, Location, LocationCell, Money, MAJOR_CURRENCIES, SUPPORTED_CURRENCIES};
pub use types::{
    DemandLevel, LocalEvent, PricingContext, PricingOptions, QualityTier, Season, SupplyLevel,
    Urgency, ValidationError, Weather, WeatherCondition,
};
