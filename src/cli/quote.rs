//! Quote command implementation

use super::{build_engine, parse_lowercase, print_json, LocationArgs};
use crate::config::Config;
use crate::context::{
    Currency, DemandLevel, Money, PricingContext, PricingOptions, QualityTier, SupplyLevel,
    Urgency, Weather, WeatherCondition,
};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Service identifier
    #[arg(long, default_value = "service")]
    pub service: String,

    /// Provider identifier
    #[arg(long, default_value = "provider")]
    pub provider: String,

    /// Base price
    #[arg(long)]
    pub price: Decimal,

    /// Currency of the base price
    #[arg(long, default_value = "USD")]
    pub base_currency: String,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Service category
    #[arg(long, default_value = "general")]
    pub category: String,

    /// low, medium, high or emergency
    #[arg(long, default_value = "medium", value_parser = parse_lowercase::<Urgency>)]
    pub urgency: Urgency,

    /// budget, standard or premium
    #[arg(long, default_value = "standard", value_parser = parse_lowercase::<QualityTier>)]
    pub quality: QualityTier,

    /// Observed demand: low, medium, high or surge
    #[arg(long, default_value = "medium", value_parser = parse_lowercase::<DemandLevel>)]
    pub demand: DemandLevel,

    /// Observed supply: low, medium, high or oversupply
    #[arg(long, default_value = "medium", value_parser = parse_lowercase::<SupplyLevel>)]
    pub supply: SupplyLevel,

    /// Current weather, e.g. rain or extreme_heat
    #[arg(long, value_parser = parse_lowercase::<WeatherCondition>)]
    pub weather: Option<WeatherCondition>,

    /// Customer segment for experiment targeting
    #[arg(long)]
    pub segment: Option<String>,
}

impl QuoteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let now = engine.now();

        let mut ctx = PricingContext::new(self.location.location()?, now)
            .with_market(self.demand, self.supply);
        if let Some(condition) = self.weather {
            ctx = ctx.with_weather(Weather {
                condition,
                observed_at: now,
            });
        }

        let mut opts = PricingOptions::new(&self.category)
            .with_urgency(self.urgency)
            .with_quality(self.quality);
        opts.customer_segment = self.segment.clone();

        let base = Money::new(self.price, Currency::new(&self.base_currency)?);
        let price = engine
            .calculate_dynamic_price(&self.service, &self.provider, base, &ctx, &opts)
            .await?;

        tracing::info!(summary = %price.explanation.summary, "Quote ready");
        print_json(&price)
    }
}
