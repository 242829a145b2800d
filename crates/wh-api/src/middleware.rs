//! Middleware for security headers, access logging and CORS.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};

/// Access log: remote-ip "request-line" status-code response-size "referrer" "user-agent" time
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// Pages and forms are same-origin; cross-origin callers may only read.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allowed_methods(vec!["GET"])
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .add((
            header::CONTENT_SECURITY_POLICY,
            "default-src 'self'; img-src 'self' data:; object-src 'none'; frame-ancestors 'none'",
        ))
}
