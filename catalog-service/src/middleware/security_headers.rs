//! Security headers middleware
//!
//! Applies the standard response headers using
//! `tower_http::set_header::SetResponseHeaderLayer`. A header a handler
//! set itself is left alone.

use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

pub const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Apply security headers to the router when `enabled`
pub fn apply_security_headers<S>(mut app: Router<S>, enabled: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !enabled {
        return app;
    }

    let headers = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (header::STRICT_TRANSPORT_SECURITY, HSTS_VALUE),
    ];
    for (name, value) in headers {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ));
    }

    app
}
