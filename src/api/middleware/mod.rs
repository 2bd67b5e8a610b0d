// Middleware module - CORS and rate limiting

pub mod cors;
pub mod rate_limit;

// Re-export for convenience
#[allow(unused_imports)]
pub use cors::create_cors_layer;
