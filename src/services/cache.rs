//! In-memory TTL cache shared by the upstream clients.
//!
//! Each key owns its own async lock, held across a refresh, so concurrent
//! requests for the same key wait for one fetch instead of issuing several.
//! Time comes from an injectable [`Clock`] so expiry can be tested
//! deterministically.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Outcome of [`TtlCache::get_or_fetch`].
#[derive(Debug, PartialEq)]
pub enum Lookup<V, E> {
    Cached(V),
    Fetched(V),
    /// The refresh failed; `stale` is the expired value, if one was ever stored.
    Failed { error: E, stale: Option<V> },
}

impl<V, E> Lookup<V, E> {
    pub fn into_result(self) -> Result<V, E> {
        match self {
            Lookup::Cached(value) | Lookup::Fetched(value) => Ok(value),
            Lookup::Failed { error, .. } => Err(error),
        }
    }
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Slot for `key`, created on first use. Creating a slot also drops
    /// every other slot that holds nothing fresh and is not mid-refresh.
    async fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }

        let now = self.clock.now();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(entry) => entry.as_ref().is_some_and(|e| now < e.expires_at),
            Err(_) => true,
        });

        let slot = Slot::<V>::default();
        slots.insert(key.clone(), slot.clone());
        slot
    }

    /// Returns the value only while it is fresh.
    pub async fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.lock().await.get(key).cloned()?;
        let entry = slot.lock().await;
        let now = self.clock.now();
        entry
            .as_ref()
            .filter(|e| now < e.expires_at)
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;
        *entry = Some(Entry {
            value,
            expires_at: self.clock.now() + self.ttl,
        });
    }

    pub async fn remove(&self, key: &K) {
        self.slots.lock().await.remove(key);
    }

    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, fetch: F) -> Lookup<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let ttl = self.ttl;
        self.get_or_fetch_with_ttl(key, move || async move {
            fetch().await.map(|value| (value, ttl))
        })
        .await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but the fetch decides how
    /// long its value lives (e.g. a token's `expires_in`).
    pub async fn get_or_fetch_with_ttl<F, Fut, E>(&self, key: &K, fetch: F) -> Lookup<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, Duration), E>>,
    {
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;

        if let Some(existing) = entry.as_ref() {
            if self.clock.now() < existing.expires_at {
                return Lookup::Cached(existing.value.clone());
            }
        }

        match fetch().await {
            Ok((value, ttl)) => {
                *entry = Some(Entry {
                    value: value.clone(),
                    expires_at: self.clock.now() + ttl,
                });
                Lookup::Fetched(value)
            }
            Err(error) => Lookup::Failed {
                error,
                stale: entry.as_ref().map(|e| e.value.clone()),
            },
        }
    }
}
