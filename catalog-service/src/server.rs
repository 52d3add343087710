//! HTTP server with graceful shutdown

use axum::http::{HeaderValue, Method, StatusCode};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    entities,
    error::Result,
    handlers::entity_router,
    health,
    middleware::{
        apply_security_headers, process_time_middleware, request_id_layer, request_id_propagation_layer,
        sensitive_headers_layer,
    },
    state::AppState,
};

/// Service endpoints plus every entity collection under `api_prefix`
pub fn app_router(state: AppState) -> Router {
    let prefix = state.config().api_prefix.trim_end_matches('/').to_string();

    let mut router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness));

    for schema in entities::all() {
        router = router.nest(&format!("{}/{}", prefix, schema.collection), entity_router(schema));
    }

    router.with_state(state)
}

/// Full application: routes wrapped in the configured middleware stack
pub fn build_router(state: AppState) -> Router {
    let config = state.config().clone();
    apply_middleware(app_router(state), &config)
}

/// Wrap `app` in the middleware stack.
///
/// Layers added later run first.
pub fn apply_middleware(app: Router, config: &Config) -> Router {
    let middleware = &config.middleware;
    let body_limit = middleware.body_limit_mb.saturating_mul(1024 * 1024);

    let mut app = apply_security_headers(app, middleware.security_headers)
        .layer(axum::middleware::from_fn(process_time_middleware));

    if middleware.request_tracking.mask_sensitive_headers {
        app = app.layer(sensitive_headers_layer());
    }
    app = app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().include_headers(true))
            .on_response(DefaultOnResponse::new().include_headers(true)),
    );
    if middleware.request_tracking.propagate_headers {
        app = app.layer(request_id_propagation_layer());
    }
    if middleware.request_tracking.request_id_enabled {
        app = app.layer(request_id_layer());
    }

    app = app
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ));

    if middleware.compression {
        app = app.layer(CompressionLayer::new());
    }
    if let Some(cors) = build_cors_layer(config) {
        app = app.layer(cors);
    }
    if middleware.catch_panic {
        app = app.layer(CatchPanicLayer::new());
    }

    app
}

/// CORS layer for the configured mode; `None` when disabled
fn build_cors_layer(config: &Config) -> Option<CorsLayer> {
    let middleware = &config.middleware;
    match middleware.cors_mode.as_str() {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            Some(CorsLayer::permissive())
        }
        "restrictive" => {
            let origins: Vec<HeaderValue> = middleware
                .allowed_origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            tracing::debug!(origins = origins.len(), "Enabling restrictive CORS");
            Some(
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers(Any),
            )
        }
        _ => {
            tracing::debug!("CORS disabled");
            None
        }
    }
}

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server with the given router until a shutdown signal arrives
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!(
            service = %self.config.service.name,
            environment = %self.config.service.environment,
            %addr,
            "Starting server"
        );
        self.log_middleware_config();

        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    fn log_middleware_config(&self) {
        let middleware = &self.config.middleware;
        tracing::info!(
            panic_recovery = middleware.catch_panic,
            request_id = middleware.request_tracking.request_id_enabled,
            sensitive_header_masking = middleware.request_tracking.mask_sensitive_headers,
            body_limit_mb = middleware.body_limit_mb,
            compression = middleware.compression,
            cors_mode = %middleware.cors_mode,
            security_headers = middleware.security_headers,
            timeout_secs = self.config.service.timeout_secs,
            "Middleware configuration"
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
