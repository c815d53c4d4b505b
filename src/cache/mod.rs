//! Price cache module
//!
//! Fingerprinting of pricing requests and the TTL cache keyed by them

mod fingerprint;
mod price_cache;

pub use fingerprint::{Fingerprint, FingerprintInput};
pub use price_cache::{CacheOutcome, PriceCache};
