//! Catalog reads and writes with a read-through by-id cache.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use curio_core::config::CacheConfig;
use curio_core::error::QueryError;
use curio_core::types::{Category, Collectible};
use curio_database::repositories::CollectibleRepository;

/// Catalog access layered over the collectible repository.
///
/// Single-item lookups go through an in-process moka cache; list queries
/// always hit the store. Writes keep the cache coherent by inserting or
/// invalidating the touched id.
#[derive(Clone)]
pub struct CatalogService {
    repository: CollectibleRepository,
    by_id: Cache<Uuid, Collectible>,
}

impl CatalogService {
    pub fn new(repository: CollectibleRepository, config: &CacheConfig) -> Self {
        let by_id = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();
        Self { repository, by_id }
    }

    pub async fn list_all(&self) -> Result<Vec<Collectible>, QueryError> {
        self.repository.find_all().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Collectible>, QueryError> {
        if let Some(hit) = self.by_id.get(&id).await {
            debug!(%id, "catalog cache hit");
            return Ok(Some(hit));
        }
        let found = self.repository.find_by_id(id).await?;
        if let Some(item) = &found {
            self.by_id.insert(id, item.clone()).await;
        }
        Ok(found)
    }

    pub async fn list_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Collectible>, QueryError> {
        self.repository.find_by_category(category).await
    }

    pub async fn list_by_year(&self, year: i32) -> Result<Vec<Collectible>, QueryError> {
        self.repository.released_in(year).await
    }

    pub async fn create(&self, item: &Collectible) -> Result<(), QueryError> {
        self.repository.insert(item).await?;
        self.by_id.insert(item.id, item.clone()).await;
        Ok(())
    }

    /// Returns `false` when the item does not exist.
    pub async fn update(&self, item: &Collectible) -> Result<bool, QueryError> {
        let updated = self.repository.update(item).await?;
        if updated {
            self.by_id.insert(item.id, item.clone()).await;
        }
        Ok(updated)
    }

    /// Returns `false` when the item does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool, QueryError> {
        let deleted = self.repository.delete(id).await?;
        if deleted {
            self.by_id.invalidate(&id).await;
        }
        Ok(deleted)
    }
}
