//! # catalog-service
//!
//! REST catalog of products, movies and books over a pluggable document
//! store, with a shared filtered listing engine.
//!
//! ## Features
//!
//! - **Schema tables**: each entity is a static [`schema::Schema`]; one
//!   generic validator handles every entity
//! - **Filtered listing**: substring and numeric-range filters, sorting with
//!   a stable id tie-break, clamped pagination
//! - **Storage**: in-memory store by default, SurrealDB behind the
//!   `surrealdb` feature
//! - **Middleware stack**: request ids, timing header, security headers,
//!   CORS, compression, timeouts, body limits, panic recovery
//! - **Health checks**: liveness and readiness probes
//! - **Graceful shutdown**: SIGTERM and SIGINT
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config.clone()).build().await?;
//!
//!     Server::new(config).serve(build_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod listing;
pub mod middleware;
pub mod observability;
pub mod repository;
pub mod responses;
pub mod schema;
pub mod server;
pub mod state;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, Environment, ListingConfig, StorageBackend, StorageConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{entity_router, ApiError, ApiErrorKind, ApiOperation, ListResponse};
    pub use crate::health::{health, readiness, root};
    pub use crate::ids::{EntityId, MakeTypedRequestId, RequestId};
    pub use crate::listing::{ListingMode, ListingPage, ListingParams, ListingQuery, SortDirection, SortSpec};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::repository::{Collection, RepositoryError, RepositoryErrorKind, RepositoryResult};
    pub use crate::responses::{Created, Message};
    pub use crate::schema::{Document, Schema};
    pub use crate::server::{app_router, build_router, Server};
    pub use crate::state::{AppState, AppStateBuilder};
    pub use crate::store::{DocumentStore, MemoryStore, StorageError};
    #[cfg(feature = "surrealdb")]
    pub use crate::store::SurrealStore;

    pub use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, HeaderValue, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{delete, get, post, put},
        Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros and types
    pub use tracing::{debug, error, info, instrument, trace, warn, Level, Span};

    // Re-export tokio for async runtime
    pub use tokio;

    pub use async_trait::async_trait;

    pub use thiserror::Error;

    // Re-export time utilities
    pub use chrono::{DateTime, Utc};

    pub use serde_json::{json, Value};
}
