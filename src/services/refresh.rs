//! Refresh coordination for the astronomy cache.
//!
//! Reads of fresh data go straight to the `CacheStore`. Anything that has to
//! talk to the provider (instant refresh, weekly refresh, location update)
//! runs under one shared gate, so Location, Instant and Weekly are never
//! updated by two tasks at once. Freshness is re-checked after the gate is
//! acquired: callers that queued behind a refresh reuse its result instead of
//! fetching again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{validate_coordinates, InstantRecord, LocationRecord, WeeklyRecord};
use crate::services::cache::CacheStore;
use crate::services::mapper::{map_instant, map_weekly};
use crate::services::provider::{AstronomyProvider, RawPlace, TimezoneResolver};

/// A snapshot handed to a caller, with a warning when it is served stale
/// because the refresh failed.
#[derive(Debug)]
pub struct Refreshed<T> {
    pub record: Arc<T>,
    pub warning: Option<String>,
}

impl<T> Refreshed<T> {
    fn fresh(record: Arc<T>) -> Self {
        Self {
            record,
            warning: None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.warning.is_some()
    }
}

/// Owns the cache and every path that writes to it.
pub struct RefreshCoordinator {
    store: CacheStore,
    provider: Arc<dyn AstronomyProvider>,
    timezones: Arc<dyn TimezoneResolver>,
    gate: Mutex<()>,
    instant_ttl: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        location: LocationRecord,
        provider: Arc<dyn AstronomyProvider>,
        timezones: Arc<dyn TimezoneResolver>,
        instant_ttl: Duration,
    ) -> Self {
        Self {
            store: CacheStore::new(location),
            provider,
            timezones,
            gate: Mutex::new(()),
            instant_ttl,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn location(&self) -> Arc<LocationRecord> {
        self.store.location()
    }

    /// Instant data no older than the configured TTL, refreshed if needed.
    pub async fn fresh_instant(&self) -> Result<Refreshed<InstantRecord>, AppError> {
        if let Some(record) = self.store.fresh_instant(self.instant_ttl, Utc::now()) {
            return Ok(Refreshed::fresh(record));
        }

        let guard = self.gate.lock().await;
        if let Some(record) = self.store.fresh_instant(self.instant_ttl, Utc::now()) {
            return Ok(Refreshed::fresh(record));
        }

        tracing::info!("requesting instant data refresh");
        let location = self.store.location();
        // the fallback snapshot is read under the gate
        let result = match self.fetch_instant(&location).await {
            Ok(record) => Ok(Refreshed::fresh(record)),
            Err(e) => fall_back("instant", self.store.instant(), e),
        };
        drop(guard);
        result
    }

    /// Weekly data fetched today (UTC), refreshed if needed.
    pub async fn fresh_weekly(&self) -> Result<Refreshed<WeeklyRecord>, AppError> {
        if let Some(record) = self.store.fresh_weekly(Utc::now()) {
            return Ok(Refreshed::fresh(record));
        }

        let guard = self.gate.lock().await;
        if let Some(record) = self.store.fresh_weekly(Utc::now()) {
            return Ok(Refreshed::fresh(record));
        }

        tracing::info!("requesting weekly data refresh");
        let location = self.store.location();
        // the fallback snapshot is read under the gate
        let result = match self.fetch_weekly(&location).await {
            Ok(record) => Ok(Refreshed::fresh(record)),
            Err(e) => fall_back("weekly", self.store.weekly(), e),
        };
        drop(guard);
        result
    }

    /// Move to new coordinates.
    ///
    /// The new location is published before anything is fetched for it and is
    /// kept even if the prefetch fails. City and country carry over from the
    /// previous location until the provider reports the new ones.
    pub async fn update_location(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Arc<LocationRecord>, AppError> {
        validate_coordinates(latitude, longitude)?;
        let (timezone_id, timezone) = self.timezones.resolve_timezone(latitude, longitude).await?;

        let _guard = self.gate.lock().await;
        let previous = self.store.location();
        let location = self.store.replace_location(LocationRecord::new(
            latitude,
            longitude,
            timezone,
            previous.city.as_str(),
            previous.country.as_str(),
            Utc::now(),
        )?);
        self.store.invalidate_instant();
        self.store.invalidate_weekly();
        tracing::info!(
            "location updated to ({}, {}) in {}",
            latitude,
            longitude,
            timezone_id
        );

        let (instant, weekly) = futures::future::join(
            self.provider.fetch_instant(latitude, longitude, &location.timezone_id),
            self.fetch_weekly(&location),
        )
        .await;

        match instant.and_then(|response| {
            let record = map_instant(response.astronomy.as_ref(), Utc::now(), &location.timezone)?;
            Ok((record, response.location))
        }) {
            Ok((record, place)) => {
                self.store.replace_instant(record);
                if let Some(place) = place {
                    self.confirm_place(&location, &place);
                }
            }
            Err(e) => tracing::error!("instant prefetch after location update failed: {}", e),
        }
        if let Err(e) = weekly {
            tracing::error!("weekly prefetch after location update failed: {}", e);
        }

        Ok(self.store.location())
    }

    /// Warm the cache once at startup. Failures are logged and otherwise ignored.
    pub async fn initial_fetch(&self) {
        let instant = self.fresh_instant().await;
        let weekly = self.fresh_weekly().await;
        tracing::info!(
            instant_cached = instant.is_ok(),
            weekly_cached = weekly.is_ok(),
            "initial astronomy fetch finished"
        );
    }

    async fn fetch_instant(&self, location: &LocationRecord) -> Result<Arc<InstantRecord>, AppError> {
        let response = self
            .provider
            .fetch_instant(location.latitude, location.longitude, &location.timezone_id)
            .await?;
        let record = map_instant(response.astronomy.as_ref(), Utc::now(), &location.timezone)?;
        Ok(self.store.replace_instant(record))
    }

    async fn fetch_weekly(&self, location: &LocationRecord) -> Result<Arc<WeeklyRecord>, AppError> {
        let now = Utc::now();
        let raw_days = self
            .provider
            .fetch_daily_range(
                location.latitude,
                location.longitude,
                now - TimeDelta::days(1),
                now + TimeDelta::days(5),
                &location.timezone_id,
            )
            .await?;
        let record = map_weekly(&raw_days, now, &location.timezone)?;
        Ok(self.store.replace_weekly(record))
    }

    fn confirm_place(&self, location: &LocationRecord, place: &RawPlace) {
        let city = place.city.as_deref().map(str::trim).unwrap_or("");
        let country = place.country_name.as_deref().map(str::trim).unwrap_or("");
        if city.is_empty() && country.is_empty() {
            return;
        }
        let city = if city.is_empty() { location.city.as_str() } else { city };
        let country = if country.is_empty() {
            location.country.as_str()
        } else {
            country
        };
        self.store
            .replace_location(location.with_place(city, country, Utc::now()));
    }
}

fn fall_back<T>(
    kind: &str,
    cached: Option<Arc<T>>,
    error: AppError,
) -> Result<Refreshed<T>, AppError> {
    match cached {
        Some(record) => {
            tracing::warn!("{} data refresh failed, returning stale data: {}", kind, error);
            Ok(Refreshed {
                record,
                warning: Some(error.to_string()),
            })
        }
        None => {
            tracing::error!("{} data refresh failed and nothing is cached: {}", kind, error);
            Err(error)
        }
    }
}
