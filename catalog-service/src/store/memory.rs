use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, StorageResult};
use crate::listing::{compare_documents, matches_all, Predicate, SortSpec};
use crate::schema::Document;

type Collection = BTreeMap<String, Document>;

/// In-process store keyed by collection then id.
///
/// Reads share the lock. Every write, a patch included, happens under a
/// single write acquisition, so concurrent patches to one document never
/// lose each other's fields.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, collection: &str, predicates: &[Predicate]) -> StorageResult<u64> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map_or(0, |docs| docs.values().filter(|d| matches_all(predicates, d)).count());
        Ok(count as u64)
    }

    async fn find(
        &self,
        collection: &str,
        predicates: &[Predicate],
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> StorageResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<&Document> = docs.values().filter(|d| matches_all(predicates, d)).collect();
        matching.sort_by(|a, b| compare_documents(a, b, sort));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(&self, collection: &str, id: &str, document: Document) -> StorageResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        set: Document,
        unset: &[String],
    ) -> StorageResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };

        for name in unset {
            document.remove(name);
        }
        document.extend(set);
        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        Ok(collections.get_mut(collection).and_then(|docs| docs.remove(id)))
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::SortDirection;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, price) in [("c", 30), ("a", 10), ("b", 20), ("d", 20)] {
            store
                .insert("products", id, doc(json!({"id": id, "price": price})))
                .await
                .unwrap();
        }
        store
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d.get("id").and_then(Value::as_str)).collect()
    }

    #[tokio::test]
    async fn test_count_applies_predicates() {
        let store = seeded().await;
        assert_eq!(store.count("products", &[]).await.unwrap(), 4);
        let cheap = [Predicate::range("price", None, Some(20.0))];
        assert_eq!(store.count("products", &cheap).await.unwrap(), 3);
        assert_eq!(store.count("movies", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_sorts_then_windows() {
        let store = seeded().await;
        let sort = SortSpec::new("price", SortDirection::Desc);
        let all = store.find("products", &[], &sort, 0, 10).await.unwrap();
        assert_eq!(ids(&all), vec!["c", "d", "b", "a"]);

        let window = store.find("products", &[], &sort, 1, 2).await.unwrap();
        assert_eq!(ids(&window), vec!["d", "b"]);

        let past_end = store.find("products", &[], &sort, 10, 2).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_patch_and_delete_report_missing_ids() {
        let store = seeded().await;
        let patched = store
            .patch("products", "a", doc(json!({"price": 11, "name": "Lamp"})), &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched, doc(json!({"id": "a", "price": 11, "name": "Lamp"})));

        let patched = store
            .patch("products", "a", Document::new(), &["name".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert!(!patched.contains_key("name"));
        assert_eq!(store.get("products", "a").await.unwrap().unwrap()["price"], json!(11));

        assert!(store.patch("products", "zz", Document::new(), &[]).await.unwrap().is_none());
        assert!(store.patch("movies", "a", Document::new(), &[]).await.unwrap().is_none());

        let removed = store.delete("products", "a").await.unwrap();
        assert!(removed.is_some());
        assert!(store.delete("products", "a").await.unwrap().is_none());
        assert!(store.get("products", "a").await.unwrap().is_none());
    }
}
