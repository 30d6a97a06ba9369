//! Last-known-good cache in front of the upstream fetcher.
//!
//! A value younger than the TTL is served as is. Otherwise one fetch is
//! attempted; if it fails and any value was ever cached, that value is
//! served as a fallback without refreshing its timestamp, so the next
//! request tries upstream again.
//!
//! Concurrent misses are not coalesced: each may run its own fetch and the
//! last successful one wins.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use super::manar::{FetchError, Fetcher};
use super::types::{Maghrib, Source, TimeValue};

/// Raised only when upstream failed and nothing was ever cached.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct UpstreamError(#[from] pub FetchError);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: TimeValue,
    pub fetched_at: DateTime<Utc>,
}

pub struct MaghribCache {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl MaghribCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            fetcher,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::max_value()),
            entry: Mutex::new(None),
        }
    }

    pub fn entry(&self) -> Option<CacheEntry> {
        *self.lock()
    }

    pub async fn get_maghrib(&self) -> Result<Maghrib, UpstreamError> {
        let cached = self.entry();

        if let Some(entry) = cached {
            if self.clock.now() - entry.fetched_at < self.ttl {
                return Ok(Maghrib {
                    value: entry.value,
                    source: Source::Cache,
                });
            }
        }

        match self.fetcher.fetch().await {
            Ok(value) => {
                self.store(value);
                tracing::info!("✓ maghrib {}", value);
                Ok(Maghrib {
                    value,
                    source: Source::Fresh,
                })
            }
            Err(e) => {
                tracing::warn!("✗ maghrib fetch failed: {}", e);
                // Re-read: another request may have refreshed the entry meanwhile.
                match self.entry().or(cached) {
                    Some(entry) => {
                        tracing::warn!(
                            value = %entry.value,
                            fetched_at = %entry.fetched_at,
                            "serving cached maghrib after upstream failure"
                        );
                        Ok(Maghrib {
                            value: entry.value,
                            source: Source::StaleFallback,
                        })
                    }
                    None => Err(UpstreamError(e)),
                }
            }
        }
    }

    /// Populates the cache ahead of the first request. Failure leaves it empty.
    pub async fn warm_up(&self) {
        match self.fetcher.fetch().await {
            Ok(value) => {
                self.store(value);
                tracing::info!("warm-up fetched maghrib {}", value);
            }
            Err(e) => tracing::debug!("warm-up fetch failed: {}", e),
        }
    }

    fn store(&self, value: TimeValue) {
        *self.lock() = Some(CacheEntry {
            value,
            fetched_at: self.clock.now(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        // The entry is always written whole, so a poisoned lock still holds a valid value.
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
