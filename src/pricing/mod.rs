//! Pricing module
//!
//! The orchestrator that turns a request into a [`DynamicPrice`].

mod engine;
mod explanation;
mod types;

pub use engine::{EngineConfig, PricingEngine, PricingEngineBuilder};
pub use types::{
    ConfidenceWeights, DynamicPrice, Explanation, FactorContribution, Impact, PriceAlternative,
    PricingError,
};
