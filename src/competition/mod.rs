//! Competitive pricing module

mod analyzer;
mod catalog;
mod types;

pub use analyzer::CompetitiveAnalyzer;
pub use catalog::{CatalogEntry, StaticCatalog};
pub use types::{CompetitorQuote, PriceComparison, ProviderListing};

use crate::context::{Location, QualityTier};
use async_trait::async_trait;

/// Trait for provider catalog implementations
#[async_trait]
pub trait ProviderCatalog: Send + Sync {
    /// Competitor listings for a category and tier near a location
    async fn listings(
        &self,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
    ) -> anyhow::Result<Vec<ProviderListing>>;
}
