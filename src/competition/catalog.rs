//! Static provider catalog

use super::{ProviderCatalog, ProviderListing};
use crate::context::{Location, QualityTier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A listing tagged with the category it competes in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub category: String,
    #[serde(flatten)]
    pub listing: ProviderListing,
}

/// Fixed list of competitors, typically read from configuration
///
/// Listings are not location specific; every location sees every listing
/// in the category.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ProviderCatalog for StaticCatalog {
    async fn listings(
        &self,
        category: &str,
        _location: &Location,
        quality_tier: QualityTier,
    ) -> anyhow::Result<Vec<ProviderListing>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.category == category && e.listing.quality_tier == quality_tier)
            .map(|e| e.listing.clone())
            .collect())
    }
}
