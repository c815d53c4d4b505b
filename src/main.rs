use clap::Parser;
use surge_pricing::cli::{Cli, Commands};
use surge_pricing::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = surge_pricing::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Quote(args) => args.execute(&config).await?,
        Commands::Surge(args) => args.execute(&config).await?,
        Commands::Forecast(args) => args.execute(&config).await?,
        Commands::Compare(args) => args.execute(&config).await?,
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Pricing: ttl={}s, materiality=[{}, {}], fallback confidence={}",
                config.pricing.cache_ttl_secs,
                config.pricing.materiality_low,
                config.pricing.materiality_high,
                config.pricing.fallback_confidence
            );
            println!(
                "  Surge: alpha={}, max_step={}, smoothing window={}s, signal window={}s",
                config.surge.alpha,
                config.surge.max_step,
                config.surge.window_secs,
                config.surge.default_window_secs
            );
            println!(
                "  Currency: {} (ttl={}s, timeout={}ms)",
                config.currency.api_url, config.currency.rate_ttl_secs, config.currency.timeout_ms
            );
            match &config.history.path {
                Some(path) => println!("  History: {}", path.display()),
                None => println!("  History: none"),
            }
            println!(
                "  Forecast: lookback={}d, max points={}",
                config.forecast.lookback_days, config.forecast.max_points
            );
            println!("  Competitors: {}", config.competitors.len());
        }
    }

    Ok(())
}
