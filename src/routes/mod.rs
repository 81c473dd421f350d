pub mod astronomy;
pub mod health;
pub mod location;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};

use crate::services::refresh::RefreshCoordinator;

/// State shared by every handler.
pub(crate) type AppState = Arc<RefreshCoordinator>;

/// Response header set when a snapshot is served stale.
pub(crate) const STALE_HEADER: &str = "X-Astronomy-Stale";

pub(crate) fn stale_headers(stale: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if stale {
        headers.insert(STALE_HEADER, HeaderValue::from_static("true"));
    }
    headers
}
