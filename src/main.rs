// Almanac API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use config::AppConfig;
use routes::STALE_HEADER;
use services::ipgeo::IpGeoClient;
use services::refresh::RefreshCoordinator;

/// Almanac API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Almanac API",
        version = "0.1.0",
        description = "Sun and moon data for one configurable location. \
            Fetches astronomy data from ipgeolocation.io, keeps an instant snapshot \
            and a seven-day overview in memory, and computes lunar age and moon \
            phases locally.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Location", description = "The location astronomy data is computed for"),
        (name = "Astronomy", description = "Instant and weekly sun and moon data"),
    ),
    paths(
        routes::health::health_check,
        routes::location::get_location,
        routes::location::update_location,
        routes::astronomy::get_instant,
        routes::astronomy::get_weekly,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::location::LocationResponse,
            routes::location::UpdateLocationRequest,
            routes::astronomy::InstantResponse,
            routes::astronomy::MoonPhaseEventResponse,
            routes::astronomy::WeeklyResponse,
            routes::astronomy::DailyResponse,
            routes::astronomy::TwilightResponse,
            models::MoonPhase,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "almanac_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let location = config
        .default_location()
        .expect("Invalid default location configuration");
    tracing::info!(
        "Default location: {}, {} ({}, {}) in {}",
        location.city,
        location.country,
        location.latitude,
        location.longitude,
        location.timezone_id
    );

    // One client serves both astronomy and timezone lookups
    let ipgeo = Arc::new(
        IpGeoClient::new(&config.ipgeo_url, &config.ipgeo_api_key, config.ipgeo_timeout)
            .expect("Failed to build ipgeolocation client"),
    );

    let coordinator = Arc::new(RefreshCoordinator::new(
        location,
        ipgeo.clone(),
        ipgeo,
        config.instant_ttl,
    ));

    // Warm the cache in the background so startup doesn't wait on the provider
    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.initial_fetch().await });
    }

    // CORS: reads plus location updates; expose X-Astronomy-Stale
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::PUT])
        .allow_headers(Any)
        .expose_headers([STALE_HEADER
            .parse::<axum::http::HeaderName>()
            .expect("valid header name")]);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/location",
            get(routes::location::get_location).put(routes::location::update_location),
        )
        .route(
            "/api/v1/astronomy/instant",
            get(routes::astronomy::get_instant),
        )
        .route("/api/v1/astronomy/weekly", get(routes::astronomy::get_weekly))
        .with_state(coordinator)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
