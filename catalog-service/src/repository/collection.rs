use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::config::ListingConfig;
use crate::ids::EntityId;
use crate::listing::{self, ListingError, ListingMode, ListingPage, ListingParams};
use crate::schema::{
    recompute_derived_fields, validate_create, validate_update, Document, PayloadError, Schema, CREATED_AT_FIELD,
    ID_FIELD,
};
use crate::store::DocumentStore;

/// CRUD and listing for one entity collection.
///
/// Stateless apart from the shared store handle; clones are cheap.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    schema: &'static Schema,
    limits: ListingConfig,
}

impl Collection {
    pub fn new(store: Arc<dyn DocumentStore>, schema: &'static Schema, limits: ListingConfig) -> Self {
        Self { store, schema, limits }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Validate `payload`, assign identity and creation time, and store it
    pub async fn create(&self, payload: &Value) -> RepositoryResult<Document> {
        let op = RepositoryOperation::Create;
        let mut document = validate_create(self.schema, payload)
            .map_err(|e| RepositoryError::validation_failed(op, e))?;

        let id = EntityId::new(self.schema.id_prefix);
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        document.insert(CREATED_AT_FIELD.to_string(), Value::String(now_rfc3339()));
        let document = recompute_derived_fields(self.schema, document);

        self.store
            .insert(self.schema.collection, id.as_str(), document.clone())
            .await
            .map_err(|e| RepositoryError::storage_unavailable(op, &e).with_entity(self.schema.entity, id.as_str()))?;

        tracing::info!(entity = self.schema.entity, id = %id, "Entity created");
        Ok(document)
    }

    pub async fn get(&self, raw_id: &str) -> RepositoryResult<Document> {
        self.fetch(RepositoryOperation::FindById, raw_id).await
    }

    /// Apply a partial update.
    ///
    /// Only the supplied fields are written, in one atomic store patch, so
    /// concurrent updates touching different fields both land. An empty
    /// update on a missing id reports the missing id.
    pub async fn update(&self, raw_id: &str, payload: &Value) -> RepositoryResult<Document> {
        let op = RepositoryOperation::Update;
        let id = self.parse_id(op, raw_id)?;

        let patch = match validate_update(self.schema, payload) {
            Ok(patch) => patch,
            Err(PayloadError::EmptyUpdate) => {
                self.fetch(op, raw_id).await?;
                return Err(RepositoryError::from_payload(op, PayloadError::EmptyUpdate)
                    .with_entity(self.schema.entity, id.as_str()));
            }
            Err(e) => return Err(RepositoryError::from_payload(op, e)),
        };

        let (unset, set): (Vec<_>, Vec<_>) = patch.into_iter().partition(|(_, value)| value.is_null());
        let unset: Vec<String> = unset.into_iter().map(|(name, _)| name).collect();

        let patched = self
            .store
            .patch(self.schema.collection, id.as_str(), set.into_iter().collect(), &unset)
            .await
            .map_err(|e| RepositoryError::storage_unavailable(op, &e).with_entity(self.schema.entity, id.as_str()))?;

        match patched {
            Some(document) => {
                tracing::info!(entity = self.schema.entity, id = %id, "Entity updated");
                Ok(recompute_derived_fields(self.schema, document))
            }
            None => Err(RepositoryError::not_found(self.schema.entity, id.as_str()).with_operation(op)),
        }
    }

    /// Remove the entity, returning what was stored
    pub async fn delete(&self, raw_id: &str) -> RepositoryResult<Document> {
        let op = RepositoryOperation::Delete;
        let id = self.parse_id(op, raw_id)?;

        let removed = self
            .store
            .delete(self.schema.collection, id.as_str())
            .await
            .map_err(|e| RepositoryError::storage_unavailable(op, &e).with_entity(self.schema.entity, id.as_str()))?;

        match removed {
            Some(document) => {
                tracing::info!(entity = self.schema.entity, id = %id, "Entity deleted");
                Ok(recompute_derived_fields(self.schema, document))
            }
            None => Err(RepositoryError::not_found(self.schema.entity, id.as_str()).with_operation(op)),
        }
    }

    pub async fn list(&self, params: &ListingParams, mode: ListingMode) -> RepositoryResult<ListingPage> {
        let op = RepositoryOperation::List;
        listing::list(self.store.as_ref(), self.schema, params, mode, &self.limits)
            .await
            .map_err(|e| match e {
                ListingError::Validation(v) => RepositoryError::validation_failed(op, v),
                ListingError::Storage(s) => RepositoryError::storage_unavailable(op, &s),
            })
    }

    /// Quoted in delete confirmations; falls back to the id
    pub fn display_name<'d>(&self, document: &'d Document) -> &'d str {
        document
            .get(self.schema.display_field)
            .or_else(|| document.get(ID_FIELD))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    async fn fetch(&self, op: RepositoryOperation, raw_id: &str) -> RepositoryResult<Document> {
        let id = self.parse_id(op, raw_id)?;
        let document = self
            .store
            .get(self.schema.collection, id.as_str())
            .await
            .map_err(|e| RepositoryError::storage_unavailable(op, &e).with_entity(self.schema.entity, id.as_str()))?;

        document
            .map(|d| recompute_derived_fields(self.schema, d))
            .ok_or_else(|| RepositoryError::not_found(self.schema.entity, id.as_str()).with_operation(op))
    }

    fn parse_id(&self, op: RepositoryOperation, raw_id: &str) -> RepositoryResult<EntityId> {
        EntityId::parse(self.schema.id_prefix, raw_id)
            .map_err(|e| RepositoryError::invalid_id(self.schema.entity, raw_id, e).with_operation(op))
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("collection", &self.schema.collection)
            .field("backend", &self.store.backend())
            .field("limits", &self.limits)
            .finish()
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use crate::entities::{BOOK, MOVIE, PRODUCT};
    use crate::listing::{Predicate, SortSpec};
    use crate::store::{MemoryStore, StorageResult};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Barrier;

    /// Holds every patch until two are in flight, then lets both through
    struct LockstepStore {
        inner: MemoryStore,
        barrier: Barrier,
    }

    #[async_trait]
    impl DocumentStore for LockstepStore {
        fn backend(&self) -> &'static str {
            "lockstep"
        }
        async fn count(&self, collection: &str, predicates: &[Predicate]) -> StorageResult<u64> {
            self.inner.count(collection, predicates).await
        }
        async fn find(
            &self,
            collection: &str,
            predicates: &[Predicate],
            sort: &SortSpec,
            skip: u64,
            limit: u64,
        ) -> StorageResult<Vec<Document>> {
            self.inner.find(collection, predicates, sort, skip, limit).await
        }
        async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
            self.inner.get(collection, id).await
        }
        async fn insert(&self, collection: &str, id: &str, document: Document) -> StorageResult<()> {
            self.inner.insert(collection, id, document).await
        }
        async fn patch(
            &self,
            collection: &str,
            id: &str,
            set: Document,
            unset: &[String],
        ) -> StorageResult<Option<Document>> {
            self.barrier.wait().await;
            self.inner.patch(collection, id, set, unset).await
        }
        async fn delete(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
            self.inner.delete(collection, id).await
        }
        async fn ping(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    fn products() -> Collection {
        Collection::new(Arc::new(MemoryStore::new()), &PRODUCT, ListingConfig::default())
    }

    fn id_of(doc: &Document) -> String {
        doc[ID_FIELD].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_assigns_identity_and_derived_fields() {
        let products = products();
        let created = products
            .create(&json!({"name": "Desk Lamp", "category": "Lighting", "price": 29.99, "quantity": 0}))
            .await
            .unwrap();

        assert!(id_of(&created).starts_with("prod_"));
        assert!(created[CREATED_AT_FIELD].as_str().unwrap().ends_with('Z'));
        assert_eq!(created["in_stock"], json!(false));

        let fetched = products.get(&id_of(&created)).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload_without_storing() {
        let products = products();
        let err = products
            .create(&json!({"name": "Desk Lamp", "category": "Lighting", "price": -1, "quantity": 2}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(err.field_errors[0].field, "price");

        let page = products.list(&ListingParams::new(), ListingMode::Browse).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_update_merges_and_recomputes() {
        let products = products();
        let created = products
            .create(&json!({"name": "Desk Lamp", "category": "Lighting", "price": 29.99, "quantity": 0}))
            .await
            .unwrap();
        let id = id_of(&created);

        let updated = products.update(&id, &json!({"quantity": 5})).await.unwrap();
        assert_eq!(updated["quantity"], json!(5));
        assert_eq!(updated["in_stock"], json!(true));
        assert_eq!(updated["name"], json!("Desk Lamp"));
        assert_eq!(updated[CREATED_AT_FIELD], created[CREATED_AT_FIELD]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_both_fields() {
        let store = Arc::new(LockstepStore {
            inner: MemoryStore::new(),
            barrier: Barrier::new(2),
        });
        let products = Collection::new(store, &PRODUCT, ListingConfig::default());
        let created = products
            .create(&json!({"name": "Lamp", "category": "Lighting", "price": 29.99, "quantity": 0}))
            .await
            .unwrap();
        let id = id_of(&created);

        let stock_patch = json!({"quantity": 7});
        let rename_patch = json!({"name": "Desk Lamp"});
        let (stock, rename) = tokio::join!(
            products.update(&id, &stock_patch),
            products.update(&id, &rename_patch),
        );
        stock.unwrap();
        rename.unwrap();

        let stored = products.get(&id).await.unwrap();
        assert_eq!(stored["name"], json!("Desk Lamp"));
        assert_eq!(stored["quantity"], json!(7));
        assert_eq!(stored["in_stock"], json!(true));
    }

    #[tokio::test]
    async fn test_update_of_missing_id_is_not_found() {
        let products = products();
        let missing = EntityId::new("prod").to_string();

        let err = products.update(&missing, &json!({})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);

        let err = products.update(&missing, &json!({"quantity": 3})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Update);

        // type errors still win over the existence check
        let err = products.update(&missing, &json!({"quantity": "many"})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_update_clears_optional_field() {
        let books = Collection::new(Arc::new(MemoryStore::new()), &BOOK, ListingConfig::default());
        let created = books
            .create(&json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "published_year": 1965,
                "price": 9.99,
                "genre": "science fiction"
            }))
            .await
            .unwrap();
        assert_eq!(created["genre"], json!("Science Fiction"));

        let updated = books.update(&id_of(&created), &json!({"genre": null})).await.unwrap();
        assert!(!updated.contains_key("genre"));
    }

    #[tokio::test]
    async fn test_empty_update_is_distinct_from_invalid() {
        let products = products();
        let created = products
            .create(&json!({"name": "Chair", "category": "Furniture", "price": 45.0, "quantity": 1}))
            .await
            .unwrap();
        let err = products.update(&id_of(&created), &json!({})).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::EmptyUpdate);
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_wrong_prefix_is_invalid_id() {
        let movies = Collection::new(Arc::new(MemoryStore::new()), &MOVIE, ListingConfig::default());
        let product_id = EntityId::new("prod").to_string();
        let err = movies.get(&product_id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidId);

        let err = movies.get("not-an-id").await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidId);
    }

    #[tokio::test]
    async fn test_delete_then_missing() {
        let products = products();
        let created = products
            .create(&json!({"name": "Chair", "category": "Furniture", "price": 45.0, "quantity": 1}))
            .await
            .unwrap();
        let id = id_of(&created);

        let removed = products.delete(&id).await.unwrap();
        assert_eq!(products.display_name(&removed), "Chair");

        let err = products.delete(&id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Delete);
        let err = products.get(&id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }
}
