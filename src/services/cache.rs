//! In-memory snapshot store for location, instant and weekly data.
//!
//! Each slot holds an `Arc` to an immutable record. Publishing swaps the `Arc`
//! under a short write lock; readers clone the `Arc` under a read lock and never
//! hold it across an `.await`, so reads never suspend and never observe a
//! partially built record.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{InstantRecord, LocationRecord, WeeklyRecord};

/// One independently replaceable snapshot.
#[derive(Debug)]
struct Slot<T> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T> Slot<T> {
    fn new(initial: Option<Arc<T>>) -> Self {
        Self {
            value: RwLock::new(initial),
        }
    }

    fn read(&self) -> Option<Arc<T>> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: Option<Arc<T>>) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Instant data is fresh while younger than `max_age` and stamped today (UTC).
pub fn is_instant_fresh(record: &InstantRecord, max_age: Duration, now: DateTime<Utc>) -> bool {
    let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
    now - record.updated_at < max_age && now.date_naive() == record.updated_at.date_naive()
}

/// Weekly data is fresh for the UTC day it was fetched on.
pub fn is_weekly_fresh(record: &WeeklyRecord, now: DateTime<Utc>) -> bool {
    now.date_naive() == record.updated_at.date_naive()
}

/// Process-wide cache of the three snapshots.
#[derive(Debug)]
pub struct CacheStore {
    location: RwLock<Arc<LocationRecord>>,
    instant: Slot<InstantRecord>,
    weekly: Slot<WeeklyRecord>,
}

impl CacheStore {
    /// Start with a known location and nothing cached for it.
    pub fn new(location: LocationRecord) -> Self {
        Self {
            location: RwLock::new(Arc::new(location)),
            instant: Slot::new(None),
            weekly: Slot::new(None),
        }
    }

    pub fn location(&self) -> Arc<LocationRecord> {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn instant(&self) -> Option<Arc<InstantRecord>> {
        self.instant.read()
    }

    pub fn weekly(&self) -> Option<Arc<WeeklyRecord>> {
        self.weekly.read()
    }

    pub fn replace_location(&self, location: LocationRecord) -> Arc<LocationRecord> {
        let location = Arc::new(location);
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = location.clone();
        location
    }

    pub fn replace_instant(&self, instant: InstantRecord) -> Arc<InstantRecord> {
        let instant = Arc::new(instant);
        self.instant.publish(Some(instant.clone()));
        instant
    }

    pub fn replace_weekly(&self, weekly: WeeklyRecord) -> Arc<WeeklyRecord> {
        let weekly = Arc::new(weekly);
        self.weekly.publish(Some(weekly.clone()));
        weekly
    }

    pub fn invalidate_instant(&self) {
        self.instant.publish(None);
    }

    pub fn invalidate_weekly(&self) {
        self.weekly.publish(None);
    }

    /// The cached instant snapshot, if present and fresh.
    pub fn fresh_instant(&self, max_age: Duration, now: DateTime<Utc>) -> Option<Arc<InstantRecord>> {
        self.instant()
            .filter(|record| is_instant_fresh(record, max_age, now))
    }

    /// The cached weekly snapshot, if present and fresh.
    pub fn fresh_weekly(&self, now: DateTime<Utc>) -> Option<Arc<WeeklyRecord>> {
        self.weekly().filter(|record| is_weekly_fresh(record, now))
    }
}
