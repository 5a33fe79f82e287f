use std::env;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// Browser access policy for the ticket API.
///
/// Callers authenticate with a bearer token rather than cookies, so credentials
/// are not allowed and an unset origin list opens the API to any origin.
pub fn create_cors_layer() -> CorsLayer {
    cors_layer(env::var("CORS_ALLOWED_ORIGINS").ok().as_deref())
}

fn cors_layer(configured_origins: Option<&str>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(configured_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins(configured: Option<&str>) -> AllowOrigin {
    let origins: Vec<HeaderValue> = configured
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::info!("CORS: Allowing any origin");
        AllowOrigin::any()
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}
