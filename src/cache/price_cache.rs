//! TTL-indexed price cache with single-flight computation

use super::Fingerprint;
use crate::pricing::DynamicPrice;
use crate::telemetry::{self, GaugeMetric};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// An immutable cached quote
#[derive(Debug, Clone)]
struct CacheEntry {
    price: DynamicPrice,
    expires_at: DateTime<Utc>,
}

/// One fingerprint's slot; empty while its first computation is in flight
#[derive(Debug, Default)]
struct Slot {
    cell: OnceCell<CacheEntry>,
}

impl Slot {
    fn ready(entry: CacheEntry) -> Self {
        Self {
            cell: OnceCell::new_with(Some(entry)),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.cell
            .get()
            .map(|entry| entry.expires_at <= now)
            .unwrap_or(false)
    }
}

/// Result of a cache lookup-or-compute
#[derive(Debug, Clone)]
pub struct CacheOutcome {
    pub price: DynamicPrice,
    /// Served without running the computation
    pub hit: bool,
}

/// Maps request fingerprints to previously computed prices
///
/// Expiry is checked lazily on read; an expired slot is replaced by the next
/// write or computation for the same fingerprint. Fingerprints move to a new
/// time bucket as the clock advances, so creating a slot also sweeps expired
/// entries, at most once per `default_ttl`.
pub struct PriceCache {
    slots: DashMap<Fingerprint, Arc<Slot>>,
    default_ttl: Duration,
    /// Unix seconds of the last sweep
    last_sweep: AtomicI64,
}

impl PriceCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl,
            last_sweep: AtomicI64::new(i64::MIN),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Valid cached price for a fingerprint
    pub fn get(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> Option<DynamicPrice> {
        let slot = self.slots.get(fingerprint)?;
        slot.cell
            .get()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.price.clone())
    }

    /// Store a price, replacing whatever the fingerprint held
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        price: DynamicPrice,
        ttl: Duration,
        now: DateTime<Utc>,
    ) {
        let expires_at = (now + ttl).min(price.valid_until);
        self.slots
            .insert(fingerprint, Arc::new(Slot::ready(CacheEntry { price, expires_at })));
        telemetry::set_gauge(GaugeMetric::CachedPrices, self.slots.len() as f64);
    }

    /// Drop a fingerprint's entry, returning whether one existed
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        self.slots.remove(fingerprint).is_some()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of stored prices, including expired ones not yet replaced
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, including computations still in flight
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now));
        before - self.slots.len()
    }

    /// Return the cached price or run `compute` exactly once per fingerprint
    ///
    /// Concurrent callers for a fingerprint whose computation is in flight
    /// wait for that result. A failed computation stores nothing and drops its
    /// slot, so the next caller retries.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
        ttl: Duration,
        compute: F,
    ) -> Result<CacheOutcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DynamicPrice, E>>,
    {
        let mut created = false;
        let slot = {
            let mut entry = self.slots.entry(fingerprint.clone()).or_insert_with(|| {
                created = true;
                Arc::new(Slot::default())
            });
            if entry.is_expired(now) {
                created = true;
                *entry = Arc::new(Slot::default());
            }
            Arc::clone(entry.value())
        };
        if created {
            self.sweep_if_due(now);
        }

        let computed = AtomicBool::new(false);
        let flag = &computed;
        let result = slot
            .cell
            .get_or_try_init(move || async move {
                flag.store(true, Ordering::SeqCst);
                let price = compute().await?;
                let expires_at = (now + ttl).min(price.valid_until);
                Ok::<CacheEntry, E>(CacheEntry { price, expires_at })
            })
            .await;
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                self.slots.remove_if(fingerprint, |_, current| {
                    Arc::ptr_eq(current, &slot) && !current.cell.initialized()
                });
                return Err(e);
            }
        };

        let hit = !computed.load(Ordering::SeqCst);
        if !hit {
            telemetry::set_gauge(GaugeMetric::CachedPrices, self.slots.len() as f64);
        }

        Ok(CacheOutcome {
            price: entry.price.clone(),
            hit,
        })
    }
}

impl PriceCache {
    /// Purge expired slots unless another caller swept within the TTL
    fn sweep_if_due(&self, now: DateTime<Utc>) {
        let now_secs = now.timestamp();
        let last = self.last_sweep.load(Ordering::Acquire);
        if now_secs.saturating_sub(last) < self.default_ttl.num_seconds() {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now_secs, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let purged = self.purge_expired(now);
            if purged > 0 {
                tracing::debug!(purged, remaining = self.slots.len(), "Expired prices purged");
            }
        }
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}
