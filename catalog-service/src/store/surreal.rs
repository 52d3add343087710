//! SurrealDB-backed document store
//!
//! Supports runtime protocol selection via URL scheme:
//! - `ws://` / `wss://` - WebSocket connections
//! - `http://` / `https://` - HTTP connections
//! - `mem://` - In-memory database (for testing)
//!
//! Records live at `collection:⟨entity id⟩`. SurrealDB owns the `id`
//! field, so the entity id is kept in `entity_id` and renamed on the way
//! in and out.

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentStore, StorageError, StorageErrorKind, StorageOperation, StorageResult};
use crate::config::StorageConfig;
use crate::listing::{Predicate, SortSpec};
use crate::schema::{Document, ID_FIELD};

/// SurrealDB client type alias using the `Any` engine for runtime protocol selection
pub type SurrealClient = surrealdb::Surreal<surrealdb::engine::any::Any>;

const ENTITY_ID: &str = "entity_id";

#[derive(Clone)]
pub struct SurrealStore {
    client: SurrealClient,
}

impl SurrealStore {
    /// Connect, retrying with a fixed delay up to `connect_retries` attempts
    pub async fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let mut attempt = 1;

        loop {
            match try_connect(config).await {
                Ok(client) => {
                    tracing::info!(
                        url = %sanitize_connection_url(&config.url),
                        namespace = %config.namespace,
                        database = %config.database,
                        attempts = attempt,
                        "SurrealDB connected"
                    );
                    return Ok(Self { client });
                }
                Err(e) if attempt >= config.connect_retries => {
                    tracing::error!(attempts = attempt, error = %e, "Giving up on SurrealDB connection");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        retry_in_ms = config.retry_delay_ms,
                        "SurrealDB connection attempt failed"
                    );
                    attempt += 1;
                    tokio::time::sleep(config.retry_delay()).await;
                }
            }
        }
    }

    async fn rows(
        &self,
        operation: StorageOperation,
        collection: &str,
        sql: String,
        bindings: Vec<(String, Value)>,
    ) -> StorageResult<Vec<Value>> {
        tracing::debug!(%operation, collection, sql = %sql, "SurrealQL");

        let mut query = self.client.query(sql).bind(("tb", collection.to_string()));
        for binding in bindings {
            query = query.bind(binding);
        }

        let mut response = query
            .await
            .map_err(|e| storage_error(operation, &e).in_collection(collection))?;
        response
            .take::<Vec<Value>>(0)
            .map_err(|e| storage_error(operation, &e).in_collection(collection))
    }
}

async fn try_connect(config: &StorageConfig) -> StorageResult<SurrealClient> {
    let client = surrealdb::engine::any::connect(config.url.as_str())
        .await
        .map_err(|e| storage_error(StorageOperation::Connect, &e))?;

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client
            .signin(surrealdb::opt::auth::Root { username, password })
            .await
            .map_err(|e| storage_error(StorageOperation::Connect, &e))?;
    }

    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| storage_error(StorageOperation::Connect, &e))?;

    Ok(client)
}

/// WHERE clause and its bound parameters.
///
/// Field names come from static schema tables; only values are bound.
fn where_clause(predicates: &[Predicate]) -> (String, Vec<(String, Value)>) {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    for predicate in predicates {
        match predicate {
            Predicate::Contains { field, needle } => {
                let param = format!("p{}", bindings.len());
                conditions.push(format!("string::lowercase({field} ?? '') CONTAINS ${param}"));
                bindings.push((param, Value::String(needle.clone())));
            }
            Predicate::Range { field, min, max } => {
                if let Some(min) = min {
                    let param = format!("p{}", bindings.len());
                    conditions.push(format!("{field} >= ${param}"));
                    bindings.push((param, Value::from(*min)));
                }
                if let Some(max) = max {
                    let param = format!("p{}", bindings.len());
                    conditions.push(format!("{field} <= ${param}"));
                    bindings.push((param, Value::from(*max)));
                }
                if min.is_none() && max.is_none() {
                    conditions.push(format!("type::is::number({field})"));
                }
            }
        }
    }

    if conditions.is_empty() {
        (String::new(), bindings)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), bindings)
    }
}

/// SET assignments for a patch; removed fields are assigned `NONE`.
///
/// Field names are schema fields accepted by the validator; only values are bound.
fn set_clause(set: Document, unset: &[String]) -> (String, Vec<(String, Value)>) {
    let mut assignments = Vec::new();
    let mut bindings = Vec::new();

    for (field, value) in set {
        let param = format!("s{}", bindings.len());
        assignments.push(format!("{field} = ${param}"));
        bindings.push((param, value));
    }
    for field in unset {
        assignments.push(format!("{field} = NONE"));
    }

    (assignments.join(", "), bindings)
}

fn order_clause(sort: &SortSpec) -> String {
    let field = if sort.field == ID_FIELD { ENTITY_ID } else { sort.field };
    let direction = sort.direction.as_keyword();
    format!(" ORDER BY {field} {direction}, {ENTITY_ID} {direction}")
}

fn to_record(mut document: Document) -> Document {
    if let Some(id) = document.remove(ID_FIELD) {
        document.insert(ENTITY_ID.to_string(), id);
    }
    document
}

fn from_record(operation: StorageOperation, value: Value) -> StorageResult<Document> {
    let Value::Object(mut record) = value else {
        return Err(StorageError::new(
            operation,
            StorageErrorKind::Corrupt,
            "record is not an object",
        ));
    };
    record.remove(ID_FIELD);
    match record.remove(ENTITY_ID) {
        Some(id) => {
            record.insert(ID_FIELD.to_string(), id);
            Ok(record)
        }
        None => Err(StorageError::new(
            operation,
            StorageErrorKind::Corrupt,
            "record has no entity_id",
        )),
    }
}

#[async_trait]
impl DocumentStore for SurrealStore {
    fn backend(&self) -> &'static str {
        "surrealdb"
    }

    async fn count(&self, collection: &str, predicates: &[Predicate]) -> StorageResult<u64> {
        let (filter, bindings) = where_clause(predicates);
        let sql = format!("SELECT count() AS total FROM type::table($tb){filter} GROUP ALL");
        let rows = self.rows(StorageOperation::Count, collection, sql, bindings).await?;
        // GROUP ALL over zero rows yields no row at all
        Ok(rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn find(
        &self,
        collection: &str,
        predicates: &[Predicate],
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> StorageResult<Vec<Document>> {
        let (filter, mut bindings) = where_clause(predicates);
        bindings.push(("limit".to_string(), Value::from(limit)));
        bindings.push(("start".to_string(), Value::from(skip)));
        let sql = format!(
            "SELECT * OMIT id FROM type::table($tb){filter}{} LIMIT $limit START $start",
            order_clause(sort)
        );
        self.rows(StorageOperation::Find, collection, sql, bindings)
            .await?
            .into_iter()
            .map(|row| from_record(StorageOperation::Find, row))
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let sql = "SELECT * OMIT id FROM type::thing($tb, $id)".to_string();
        let bindings = vec![("id".to_string(), Value::String(id.to_string()))];
        self.rows(StorageOperation::Get, collection, sql, bindings)
            .await?
            .into_iter()
            .next()
            .map(|row| from_record(StorageOperation::Get, row))
            .transpose()
    }

    async fn insert(&self, collection: &str, id: &str, document: Document) -> StorageResult<()> {
        let sql = "CREATE type::thing($tb, $id) CONTENT $doc RETURN NONE".to_string();
        let bindings = vec![
            ("id".to_string(), Value::String(id.to_string())),
            ("doc".to_string(), Value::Object(to_record(document))),
        ];
        self.rows(StorageOperation::Insert, collection, sql, bindings).await?;
        Ok(())
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        set: Document,
        unset: &[String],
    ) -> StorageResult<Option<Document>> {
        let (assignments, mut bindings) = set_clause(set, unset);
        if assignments.is_empty() {
            return self.get(collection, id).await;
        }

        // one UPDATE is atomic per record and skips records that do not exist
        let sql = format!("UPDATE type::thing($tb, $id) SET {assignments} RETURN AFTER");
        bindings.push(("id".to_string(), Value::String(id.to_string())));
        self.rows(StorageOperation::Patch, collection, sql, bindings)
            .await?
            .into_iter()
            .next()
            .map(|row| from_record(StorageOperation::Patch, row))
            .transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let sql = "DELETE type::thing($tb, $id) RETURN BEFORE".to_string();
        let bindings = vec![("id".to_string(), Value::String(id.to_string()))];
        self.rows(StorageOperation::Delete, collection, sql, bindings)
            .await?
            .into_iter()
            .next()
            .map(|row| from_record(StorageOperation::Delete, row))
            .transpose()
    }

    async fn ping(&self) -> StorageResult<()> {
        self.client
            .health()
            .await
            .map_err(|e| storage_error(StorageOperation::Ping, &e))
    }
}

/// Sanitize connection URL for safe logging (remove credentials if present)
fn sanitize_connection_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..=scheme_end + 2];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
    }
    url.to_string()
}

fn storage_error(operation: StorageOperation, err: &surrealdb::Error) -> StorageError {
    StorageError::new(operation, categorize(err), err.to_string())
}

fn categorize(err: &surrealdb::Error) -> StorageErrorKind {
    let err_str = err.to_string().to_lowercase();

    if err_str.contains("timeout") || err_str.contains("timed out") {
        StorageErrorKind::Timeout
    } else if err_str.contains("connect")
        || err_str.contains("network")
        || err_str.contains("refused")
        || err_str.contains("auth")
        || err_str.contains("signin")
    {
        StorageErrorKind::ConnectionFailed
    } else {
        StorageErrorKind::QueryFailed
    }
}
