//! Surge command implementation

use super::{build_engine, print_json, LocationArgs};
use crate::config::Config;
use chrono::Duration;
use clap::Args;

#[derive(Args, Debug)]
pub struct SurgeArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Service category
    #[arg(long, default_value = "general")]
    pub category: String,

    /// History window in minutes
    #[arg(long, default_value = "15")]
    pub window_mins: i64,
}

impl SurgeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let surge = engine
            .calculate_surge_multiplier(
                &self.location.location()?,
                &self.category,
                Duration::minutes(self.window_mins),
            )
            .await?;
        print_json(&surge)
    }
}
