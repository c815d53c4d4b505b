//! Compare command implementation

use super::{build_engine, parse_lowercase, print_json, LocationArgs};
use crate::config::Config;
use crate::context::QualityTier;
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Service category
    #[arg(long)]
    pub category: String,

    /// budget, standard or premium
    #[arg(long, default_value = "standard", value_parser = parse_lowercase::<QualityTier>)]
    pub quality: QualityTier,

    /// Your own price, to position against the market
    #[arg(long)]
    pub reference: Option<Decimal>,
}

impl CompareArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if config.competitors.is_empty() {
            anyhow::bail!("No [[competitors]] configured");
        }
        let engine = build_engine(config).await?;
        let location = self.location.location()?;

        let comparison = match self.reference {
            Some(reference) => {
                engine
                    .get_competitive_pricing_with_reference(
                        &self.category,
                        &location,
                        self.quality,
                        reference,
                    )
                    .await?
            }
            None => {
                engine
                    .get_competitive_pricing(&self.category, &location, self.quality)
                    .await?
            }
        };
        print_json(&comparison)
    }
}
