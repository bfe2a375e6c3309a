//! In-process dataset cache.
//!
//! Every table is held behind an immutable `CacheEntry` published through an
//! atomic pointer swap. A refresh builds a whole new entry and replaces the old
//! one, so readers always see a complete table. Two refreshes racing on the
//! same key both publish; the last one wins.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{CafeRecord, RoasterRecord};

/// Shared, immutable table.
pub type Table<T> = Arc<Vec<T>>;

/// A table and the moment it was loaded.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Table<T>,
    pub cached_at: DateTime<Utc>,
}

type CityMap = HashMap<String, Arc<CacheEntry<CafeRecord>>>;

pub struct DatasetCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cafes_by_city: ArcSwap<CityMap>,
    roasters: ArcSwapOption<CacheEntry<RoasterRecord>>,
    all_cafes: ArcSwapOption<CacheEntry<CafeRecord>>,
}

impl DatasetCache {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            clock,
            cafes_by_city: ArcSwap::from_pointee(HashMap::new()),
            roasters: ArcSwapOption::empty(),
            all_cafes: ArcSwapOption::empty(),
        }
    }

    /// Cache on the system clock.
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self::new(ttl_secs, Arc::new(SystemClock))
    }

    /// `false` for a missing entry, `true` while the entry is younger than the TTL.
    pub fn is_fresh<T>(&self, entry: Option<&CacheEntry<T>>) -> bool {
        entry.is_some_and(|e| self.clock.now() - e.cached_at < self.ttl)
    }

    fn entry<T>(&self, data: Vec<T>) -> Arc<CacheEntry<T>> {
        Arc::new(CacheEntry {
            data: Arc::new(data),
            cached_at: self.clock.now(),
        })
    }

    pub fn fresh_cafes(&self, city: &str) -> Option<Table<CafeRecord>> {
        let map = self.cafes_by_city.load();
        let entry = map.get(city)?;
        self.is_fresh(Some(&**entry))
            .then(|| Arc::clone(&entry.data))
    }

    pub fn store_cafes(&self, city: &str, cafes: Vec<CafeRecord>) -> Table<CafeRecord> {
        let entry = self.entry(cafes);
        let data = Arc::clone(&entry.data);
        self.cafes_by_city.rcu(|current| {
            let mut next = CityMap::clone(current);
            next.insert(city.to_string(), Arc::clone(&entry));
            next
        });
        data
    }

    pub fn fresh_roasters(&self) -> Option<Table<RoasterRecord>> {
        let entry = self.roasters.load_full()?;
        self.is_fresh(Some(&*entry))
            .then(|| Arc::clone(&entry.data))
    }

    pub fn store_roasters(&self, roasters: Vec<RoasterRecord>) -> Table<RoasterRecord> {
        let entry = self.entry(roasters);
        let data = Arc::clone(&entry.data);
        self.roasters.store(Some(entry));
        data
    }

    pub fn fresh_all_cafes(&self) -> Option<Table<CafeRecord>> {
        let entry = self.all_cafes.load_full()?;
        self.is_fresh(Some(&*entry))
            .then(|| Arc::clone(&entry.data))
    }

    pub fn store_all_cafes(&self, cafes: Vec<CafeRecord>) -> Table<CafeRecord> {
        let entry = self.entry(cafes);
        let data = Arc::clone(&entry.data);
        self.all_cafes.store(Some(entry));
        data
    }
}
