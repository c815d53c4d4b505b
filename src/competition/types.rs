//! Competition types

use crate::context::{Currency, Location, Money, QualityTier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A competitor offering listed in a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderListing {
    pub provider_id: String,
    pub service_id: String,
    pub name: String,
    pub base_price: Money,
    #[serde(default)]
    pub quality_tier: QualityTier,
}

/// A competitor's hypothetical quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorQuote {
    pub provider_id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub confidence: Decimal,
}

/// Market position of a category at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceComparison {
    pub category: String,
    pub location: Location,
    pub quality_tier: QualityTier,
    pub currency: Currency,
    pub quotes: Vec<CompetitorQuote>,
    pub average: Decimal,
    pub median: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub recommended_price: Decimal,
    /// Share of competitors priced at or above the recommendation, 0-1
    pub competitiveness_score: Decimal,
    pub insights: Vec<String>,
}
