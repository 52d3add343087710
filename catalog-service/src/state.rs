//! Application state management

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    repository::Collection,
    schema::Schema,
    store::{self, DocumentStore},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// State over an already-open store
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// CRUD handle for one entity collection
    pub fn collection(&self, schema: &'static Schema) -> Collection {
        Collection::new(self.store.clone(), schema, self.config.listing)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.config.service.name)
            .field("backend", &self.store.backend())
            .finish()
    }
}

/// Builder for AppState
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this store instead of opening the configured one
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the AppState, opening the configured store if none was given
    ///
    /// Uses `Config::default()` when no configuration was set.
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let store = match self.store {
            Some(store) => store,
            None => store::open(&config.storage).await?,
        };

        tracing::debug!(backend = store.backend(), "Application state ready");
        Ok(AppState::new(config, store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MOVIE;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_builder_opens_configured_store() {
        let state = AppState::builder().build().await.unwrap();
        assert_eq!(state.store().backend(), "memory");
        assert_eq!(state.config().service.name, "catalog-service");
    }

    #[tokio::test]
    async fn test_collections_share_the_store() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let state = AppState::builder().store(store).build().await.unwrap();

        let created = state
            .collection(&MOVIE)
            .create(&serde_json::json!({
                "title": "alien",
                "director": "ridley scott",
                "genre": "horror",
                "release_year": 1979,
                "rating": 8.5
            }))
            .await
            .unwrap();

        let id = created["id"].as_str().unwrap();
        let fetched = state.collection(&MOVIE).get(id).await.unwrap();
        assert_eq!(fetched["title"], "Alien");
        assert_eq!(fetched["is_favorite"], false);
    }
}
