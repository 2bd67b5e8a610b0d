//! CORS middleware configuration.

use tower_http::cors::CorsLayer;

/// Create a CORS layer with permissive settings.
///
/// This allows all origins, methods, and headers. The API fronts an
/// internal tool served from a separate origin in development.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
