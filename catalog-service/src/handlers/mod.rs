//! REST handlers for the entity collections
//!
//! Every entity gets the same six routes, generated from its
//! [`Schema`] by [`entity_router`]:
//!
//! | Method | Path       | Success                                  |
//! |--------|------------|------------------------------------------|
//! | POST   | `/`        | 201 + entity, `Location` header          |
//! | GET    | `/`        | 200 list, pagination and sort only       |
//! | GET    | `/search`  | 200 list, filters applied                |
//! | GET    | `/{id}`    | 200 entity                               |
//! | PUT    | `/{id}`    | 200 entity after a partial update        |
//! | DELETE | `/{id}`    | 200 `{"message": ...}`                   |
//!
//! Failures are [`ApiError`]s.

mod error;
mod response;

pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation};
pub use response::ListResponse;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::listing::{ListingMode, ListingParams};
use crate::responses::{Created, Message};
use crate::schema::{Document, Schema, ID_FIELD};
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Routes for one entity, to be nested under `{api_prefix}/{collection}`
pub fn entity_router(schema: &'static Schema) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>, query: Query<ListingParams>| list(schema, state, query, ListingMode::Browse))
                .post(move |state: State<AppState>, body: Result<Json<Value>, JsonRejection>| {
                    create(schema, state, body)
                }),
        )
        .route(
            "/search",
            get(move |state: State<AppState>, query: Query<ListingParams>| list(schema, state, query, ListingMode::Search)),
        )
        .route(
            "/{id}",
            get(move |state: State<AppState>, id: Path<String>| fetch(schema, state, id))
                .put(
                    move |state: State<AppState>, id: Path<String>, body: Result<Json<Value>, JsonRejection>| {
                        update(schema, state, id, body)
                    },
                )
                .delete(move |state: State<AppState>, id: Path<String>| remove(schema, state, id)),
        )
}

async fn list(
    schema: &'static Schema,
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
    mode: ListingMode,
) -> ApiResult<ListResponse> {
    let operation = match mode {
        ListingMode::Browse => ApiOperation::List,
        ListingMode::Search => ApiOperation::Search,
    };

    let page = state
        .collection(schema)
        .list(&params, mode)
        .await
        .map_err(|e| ApiError::from(e).with_operation(operation))?;

    Ok(ListResponse::new(schema.collection, page))
}

async fn create(
    schema: &'static Schema,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Created<Document>> {
    let Json(payload) = body.map_err(|e| ApiError::from_json_rejection(ApiOperation::Create, &e))?;
    let document = state.collection(schema).create(&payload).await?;

    let location = document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(|id| format!("{}/{}/{}", state.config().api_prefix, schema.collection, id));

    let response = Created::new(document);
    Ok(match location {
        Some(location) => response.with_location(location),
        None => response,
    })
}

async fn fetch(schema: &'static Schema, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Document>> {
    Ok(Json(state.collection(schema).get(&id).await?))
}

async fn update(
    schema: &'static Schema,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Document>> {
    let Json(payload) = body.map_err(|e| ApiError::from_json_rejection(ApiOperation::Update, &e))?;
    Ok(Json(state.collection(schema).update(&id, &payload).await?))
}

async fn remove(schema: &'static Schema, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Message> {
    let collection = state.collection(schema);
    let removed = collection.delete(&id).await?;
    Ok(Message::new(format!(
        "{} '{}' deleted successfully",
        schema.entity,
        collection.display_name(&removed)
    )))
}
