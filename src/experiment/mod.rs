//! A/B test module
//!
//! Bookkeeping for price experiments: which variant a request sees, predicted
//! and observed outcomes.

mod manager;
mod types;

pub use manager::ExperimentManager;
pub use types::{
    AppliedVariant, ElasticityData, ExperimentError, PricingExperiment, PricingVariant,
    VariantOutcome, VariantPrediction,
};
