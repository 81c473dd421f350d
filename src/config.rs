use std::time::Duration;

use chrono::Utc;

use crate::errors::AppError;
use crate::models::LocationRecord;
use crate::services::provider::parse_timezone_id;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ipgeo_api_key: String,
    pub ipgeo_url: String,
    pub port: u16,
    pub default_latitude: f64,
    pub default_longitude: f64,
    /// IANA id of the startup location's timezone.
    pub default_timezone: String,
    pub default_city: String,
    pub default_country: String,
    /// Maximum age of the instant snapshot.
    pub instant_ttl: Duration,
    /// Per-request limit for ipgeolocation calls, connect included.
    pub ipgeo_timeout: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            ipgeo_api_key: std::env::var("IPGEO_API_KEY").expect("IPGEO_API_KEY must be set"),
            ipgeo_url: var_or("IPGEO_URL", "https://api.ipgeolocation.io"),
            port: var_or("PORT", "8080")
                .parse()
                .expect("PORT must be a valid u16"),
            default_latitude: var_or("DEFAULT_LATITUDE", "52.2298")
                .parse()
                .expect("DEFAULT_LATITUDE must be a number"),
            default_longitude: var_or("DEFAULT_LONGITUDE", "21.0117")
                .parse()
                .expect("DEFAULT_LONGITUDE must be a number"),
            default_timezone: var_or("DEFAULT_TIMEZONE", "Europe/Warsaw"),
            default_city: var_or("DEFAULT_CITY", "Warsaw"),
            default_country: var_or("DEFAULT_COUNTRY", "Poland"),
            instant_ttl: Duration::from_secs(
                var_or("INSTANT_TTL_SECS", "900")
                    .parse()
                    .expect("INSTANT_TTL_SECS must be a whole number of seconds"),
            ),
            ipgeo_timeout: Duration::from_secs(
                var_or("IPGEO_TIMEOUT_SECS", "100")
                    .parse()
                    .expect("IPGEO_TIMEOUT_SECS must be a whole number of seconds"),
            ),
        }
    }

    /// The location served until a client sets another one.
    pub fn default_location(&self) -> Result<LocationRecord, AppError> {
        let timezone = parse_timezone_id(&self.default_timezone)
            .map_err(|e| AppError::InternalError(format!("DEFAULT_TIMEZONE: {}", e)))?;
        LocationRecord::new(
            self.default_latitude,
            self.default_longitude,
            timezone,
            self.default_city.as_str(),
            self.default_country.as_str(),
            Utc::now(),
        )
    }
}
