//! ipgeolocation.io v2 client.
//!
//! Astronomy for a single moment, astronomy for a range of days, and the
//! timezone in force at a coordinate.
//! See: https://ipgeolocation.io/documentation/astronomy-api.html

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::provider::{
    parse_timezone_id, AstronomyProvider, RawAstronomy, RawInstantResponse, TimezoneResolver,
};

/// Client for the ipgeolocation.io API.
#[derive(Debug, Clone)]
pub struct IpGeoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- ipgeolocation.io JSON response types ---

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    astronomy: Vec<Option<RawAstronomy>>,
}

#[derive(Debug, Deserialize)]
struct TimezoneResponse {
    time_zone: Option<TimezoneInfo>,
}

#[derive(Debug, Deserialize)]
struct TimezoneInfo {
    name: Option<String>,
}

/// Coordinates with 4 decimal places, '.' as separator.
fn coordinate(value: f64) -> String {
    format!("{:.4}", value)
}

impl IpGeoClient {
    /// `timeout` bounds every request end to end and the connect phase on its own.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("ipgeolocation request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "ipgeolocation returned HTTP {} for {}",
                response.status(),
                path
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::ExternalServiceError(format!("ipgeolocation JSON parse error: {}", e))
        })
    }
}

#[async_trait]
impl AstronomyProvider for IpGeoClient {
    async fn fetch_instant(
        &self,
        latitude: f64,
        longitude: f64,
        timezone_id: &str,
    ) -> Result<RawInstantResponse, AppError> {
        self.get_json(
            "/v2/astronomy",
            &[
                ("lat", coordinate(latitude)),
                ("long", coordinate(longitude)),
                ("time_zone", timezone_id.to_string()),
            ],
        )
        .await
    }

    async fn fetch_daily_range(
        &self,
        latitude: f64,
        longitude: f64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timezone_id: &str,
    ) -> Result<Vec<Option<RawAstronomy>>, AppError> {
        // days are requested as local calendar dates of the location
        let tz = parse_timezone_id(timezone_id)?;
        let date_start = from.with_timezone(&tz).date_naive();
        let date_end = to.with_timezone(&tz).date_naive();

        let response: TimeSeriesResponse = self
            .get_json(
                "/v2/astronomy/timeSeries",
                &[
                    ("lat", coordinate(latitude)),
                    ("long", coordinate(longitude)),
                    ("dateStart", date_start.format("%Y-%m-%d").to_string()),
                    ("dateEnd", date_end.format("%Y-%m-%d").to_string()),
                    ("time_zone", timezone_id.to_string()),
                ],
            )
            .await?;
        Ok(response.astronomy)
    }
}

#[async_trait]
impl TimezoneResolver for IpGeoClient {
    async fn resolve_timezone(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<(String, Tz), AppError> {
        let response: TimezoneResponse = self
            .get_json(
                "/v2/timezone",
                &[
                    ("lat", coordinate(latitude)),
                    ("long", coordinate(longitude)),
                ],
            )
            .await?;

        let name = response
            .time_zone
            .and_then(|tz| tz.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                AppError::ExternalServiceError(format!(
                    "no timezone reported for ({}, {})",
                    latitude, longitude
                ))
            })?;
        let tz = parse_timezone_id(&name)?;
        Ok((tz.name().to_string(), tz))
    }
}
