use axum::http::{HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::{CorsSettings, ANY_ORIGIN};

/// Methods advertised to pre-flight requests
pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer for the configured origin policy.
///
/// `"*"` echoes whatever `Origin` the caller sent. Any other list only
/// echoes exact matches. Requested headers are always mirrored.
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let allow_origin = if settings.allows_any_origin() {
        tracing::warn!("CORS echoes any request origin; set cors.allowed_origins to restrict it");
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = settings
            .allowed_origins
            .iter()
            .filter(|origin| origin.as_str() != ANY_ORIGIN)
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Skipping unusable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(settings.allow_credentials)
        .max_age(Duration::from_secs(settings.max_age_secs))
}
