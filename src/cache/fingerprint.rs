//! Request fingerprints
//!
//! A fingerprint is a SHA-256 digest over every input that can change a
//! quote, with location rounded to its grid cell and time rounded to a bucket.

use crate::context::{Money, PricingContext, PricingOptions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;

/// Deterministic identifier of a cacheable pricing request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub(crate) String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inputs hashed into a quote fingerprint
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    pub service_id: &'a str,
    pub provider_id: &'a str,
    pub base_price: &'a Money,
    pub context: &'a PricingContext,
    pub options: &'a PricingOptions,
    /// Experiment variant the request was bucketed into
    pub variant: Option<&'a str>,
    /// Width of the time bucket in seconds
    pub bucket_secs: i64,
}

impl<'a> FingerprintInput<'a> {
    pub fn fingerprint(&self) -> Fingerprint {
        let ctx = self.context;
        let opts = self.options;
        let bucket = ctx.timestamp.timestamp().div_euclid(self.bucket_secs.max(1));

        let mut canonical = String::new();
        let _ = writeln!(canonical, "service={}", self.service_id);
        let _ = writeln!(canonical, "provider={}", self.provider_id);
        let _ = writeln!(
            canonical,
            "base={} {}",
            self.base_price.amount.normalize(),
            self.base_price.currency
        );
        let _ = writeln!(canonical, "cell={}", ctx.location.cell());
        let _ = writeln!(canonical, "target={}", ctx.location.currency);
        let _ = writeln!(canonical, "country={}", ctx.location.country_code);
        let _ = writeln!(canonical, "bucket={}", bucket);
        let _ = writeln!(
            canonical,
            "hour={} day={} season={:?}",
            ctx.time_of_day, ctx.day_of_week, ctx.season
        );
        let _ = writeln!(canonical, "demand={:?} supply={:?}", ctx.demand_level, ctx.supply_level);
        let _ = writeln!(canonical, "competition={}", ctx.competition_level.normalize());
        if let Some(weather) = &ctx.weather {
            let _ = writeln!(canonical, "weather={:?}", weather.condition);
        }
        for event in &ctx.local_events {
            let _ = writeln!(
                canonical,
                "event={}|{}|{}",
                event.name,
                event.expected_attendance,
                event.distance_km.normalize()
            );
        }
        let _ = writeln!(canonical, "category={}", opts.category);
        let _ = writeln!(canonical, "urgency={:?} quality={:?}", opts.urgency, opts.quality_tier);
        let _ = writeln!(canonical, "alternatives={}", opts.include_alternatives);
        let _ = writeln!(canonical, "variant={}", self.variant.unwrap_or("-"));

        let digest = Sha256::digest(canonical.as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        Fingerprint(hex)
    }
}
