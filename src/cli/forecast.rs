//! Forecast command implementation

use super::{build_engine, parse_lowercase, print_json, LocationArgs};
use crate::config::Config;
use crate::forecast::{ForecastPeriod, Granularity};
use chrono::Duration;
use clap::Args;

#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Service category
    #[arg(long, default_value = "general")]
    pub category: String,

    /// Hours ahead to forecast
    #[arg(long, default_value = "24")]
    pub hours: i64,

    /// hour, day or week
    #[arg(long, default_value = "hour", value_parser = parse_lowercase::<Granularity>)]
    pub granularity: Granularity,
}

impl ForecastArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let period = ForecastPeriod::new(engine.now(), engine.now() + Duration::hours(self.hours));
        let points = engine
            .forecaster()
            .forecast(&self.category, &self.location.location()?, period, self.granularity)
            .await?;
        print_json(&points)
    }
}
