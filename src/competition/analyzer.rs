//! Competitive pricing analysis

use super::{CompetitorQuote, PriceComparison, ProviderCatalog, ProviderListing};
use crate::context::{Currency, Location, PricingContext, PricingOptions, QualityTier};
use crate::pricing::{PricingEngine, PricingError};
use futures_util::future::join_all;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Spread above which competitor prices are called dispersed
const WIDE_SPREAD: Decimal = dec!(0.5);

/// Prices competitor listings through the engine and summarizes the market
#[derive(Clone)]
pub struct CompetitiveAnalyzer {
    catalog: Arc<dyn ProviderCatalog>,
}

impl CompetitiveAnalyzer {
    pub fn new(catalog: Arc<dyn ProviderCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn compare(
        &self,
        engine: &PricingEngine,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
    ) -> Result<PriceComparison, PricingError> {
        self.analyze(engine, category, location, quality_tier, None).await
    }

    /// Like [`CompetitiveAnalyzer::compare`], positioning the caller's own price
    pub async fn compare_with_reference(
        &self,
        engine: &PricingEngine,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
        reference_price: Decimal,
    ) -> Result<PriceComparison, PricingError> {
        if reference_price < Decimal::ZERO {
            return Err(PricingError::InvalidInput {
                field: "reference_price".to_string(),
                reason: format!("{} is negative", reference_price),
            });
        }
        self.analyze(engine, category, location, quality_tier, Some(reference_price))
            .await
    }

    async fn analyze(
        &self,
        engine: &PricingEngine,
        category: &str,
        location: &Location,
        quality_tier: QualityTier,
        reference: Option<Decimal>,
    ) -> Result<PriceComparison, PricingError> {
        location.validate()?;
        let listings = self
            .catalog
            .listings(category, location, quality_tier)
            .await
            .map_err(|e| PricingError::Unavailable {
                collaborator: "provider catalog",
                reason: e.to_string(),
            })?;

        let ctx = PricingContext::new(location.clone(), engine.now());
        let mut opts = PricingOptions::new(category).with_quality(quality_tier);
        opts.include_alternatives = false;

        let results = join_all(
            listings
                .iter()
                .map(|listing| quote_listing(engine, listing, &ctx, &opts)),
        )
        .await;

        let target = &location.currency;
        let mut skipped = 0;
        let mut quotes = Vec::with_capacity(results.len());
        for result in results {
            match result? {
                Some(quote) if quote.currency == *target => quotes.push(quote),
                _ => skipped += 1,
            }
        }

        if quotes.is_empty() {
            return Err(PricingError::Unavailable {
                collaborator: "provider catalog",
                reason: format!("no comparable {} listings", category),
            });
        }

        let stats = MarketStats::from_quotes(&quotes, target);
        let recommended = round_to(stats.median * tier_adjustment(quality_tier), target);
        let anchor = reference.unwrap_or(recommended);
        let at_or_above = quotes.iter().filter(|q| q.price >= anchor).count();
        let competitiveness_score =
            (Decimal::from(at_or_above) / Decimal::from(quotes.len())).round_dp(4);

        let mut insights = vec![
            quartile_insight("Recommended price", recommended, &quotes),
            spread_insight(&stats),
        ];
        if let Some(reference) = reference {
            insights.push(quartile_insight("Your price", reference, &quotes));
            insights.push(reference_insight(reference, stats.median));
        }
        if skipped > 0 {
            insights.push(format!(
                "{} competitor(s) could not be priced in {} and were excluded",
                skipped, target
            ));
        }

        tracing::debug!(
            category,
            competitors = quotes.len(),
            skipped,
            median = %stats.median,
            "Competitive comparison computed"
        );

        Ok(PriceComparison {
            category: category.to_string(),
            location: location.clone(),
            quality_tier,
            currency: target.clone(),
            quotes,
            average: stats.average,
            median: stats.median,
            min: stats.min,
            max: stats.max,
            recommended_price: recommended,
            competitiveness_score,
            insights,
        })
    }
}

/// Quote one listing without touching live state; invalid listings are skipped
async fn quote_listing(
    engine: &PricingEngine,
    listing: &ProviderListing,
    ctx: &PricingContext,
    opts: &PricingOptions,
) -> Result<Option<CompetitorQuote>, PricingError> {
    match engine
        .quote_hypothetical(
            &listing.service_id,
            &listing.provider_id,
            listing.base_price.clone(),
            ctx,
            opts,
        )
        .await
    {
        Ok(price) if !price.is_degraded() => Ok(Some(CompetitorQuote {
            provider_id: listing.provider_id.clone(),
            name: listing.name.clone(),
            price: price.final_price,
            currency: price.currency,
            confidence: price.confidence,
        })),
        Ok(_) => Ok(None),
        Err(PricingError::InvalidInput { field, reason }) => {
            tracing::warn!(
                provider = %listing.provider_id,
                field = %field,
                reason = %reason,
                "Skipping invalid listing"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

struct MarketStats {
    average: Decimal,
    median: Decimal,
    min: Decimal,
    max: Decimal,
}

impl MarketStats {
    /// Requires at least one quote
    fn from_quotes(quotes: &[CompetitorQuote], currency: &Currency) -> Self {
        let mut prices: Vec<Decimal> = quotes.iter().map(|q| q.price).collect();
        prices.sort();
        let n = prices.len();
        let sum: Decimal = prices.iter().sum();
        let median = if n % 2 == 0 {
            (prices[n / 2 - 1] + prices[n / 2]) / dec!(2)
        } else {
            prices[n / 2]
        };
        Self {
            average: round_to(sum / Decimal::from(n), currency),
            median: round_to(median, currency),
            min: prices[0],
            max: prices[n - 1],
        }
    }
}

fn tier_adjustment(tier: QualityTier) -> Decimal {
    match tier {
        QualityTier::Budget => dec!(0.85),
        QualityTier::Standard => dec!(1.0),
        QualityTier::Premium => dec!(1.15),
    }
}

fn round_to(amount: Decimal, currency: &Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.minor_units(), RoundingStrategy::MidpointAwayFromZero)
}

fn quartile_insight(label: &str, price: Decimal, quotes: &[CompetitorQuote]) -> String {
    let below = quotes.iter().filter(|q| q.price < price).count();
    let share = Decimal::from(below) / Decimal::from(quotes.len());
    let position = if share < dec!(0.25) {
        "bottom quartile"
    } else if share < dec!(0.5) {
        "second quartile"
    } else if share < dec!(0.75) {
        "third quartile"
    } else {
        "top quartile"
    };
    format!("{} of {} sits in the {} of the market", label, price, position)
}

fn spread_insight(stats: &MarketStats) -> String {
    if stats.average <= Decimal::ZERO {
        return "Competitor prices are all zero".to_string();
    }
    let spread = (stats.max - stats.min) / stats.average;
    let percent = (spread * dec!(100)).round_dp(1).normalize();
    if spread > WIDE_SPREAD {
        format!("Wide price spread of {}% between competitors", percent)
    } else {
        format!("Competitor prices are tightly clustered ({}% spread)", percent)
    }
}

fn reference_insight(reference: Decimal, median: Decimal) -> String {
    if median <= Decimal::ZERO {
        return "Market median is zero".to_string();
    }
    let diff = ((reference - median) / median * dec!(100)).round_dp(1);
    if diff > Decimal::ZERO {
        format!("Your price is {}% above the market median", diff.normalize())
    } else if diff < Decimal::ZERO {
        format!("Your price is {}% below the market median", diff.abs().normalize())
    } else {
        "Your price matches the market median".to_string()
    }
}
