//! Tracked-object catalog (spec §4.7: "real catalog ingest is out of scope
//! for this core").

use async_trait::async_trait;
use std::collections::HashMap;
use stellarops_types::{TleSet, TrackedObjectId};
use tokio::sync::RwLock;

/// A catalog entry: a non-owned object this control plane screens against,
/// but never commands.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: TrackedObjectId,
    pub name: String,
    pub tle: TleSet,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list(&self) -> Vec<TrackedObject>;
    async fn upsert(&self, object: TrackedObject);
    async fn get(&self, id: &TrackedObjectId) -> Option<TrackedObject>;
}

/// Seed-and-forget in-memory catalog; a production deployment would back
/// this with a CelesTrak/Space-Track sync job, which is out of scope here.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    objects: RwLock<HashMap<TrackedObjectId, TrackedObject>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(objects: impl IntoIterator<Item = TrackedObject>) -> Self {
        let store = Self::new();
        for object in objects {
            store.objects.blocking_write().insert(object.id.clone(), object);
        }
        store
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list(&self) -> Vec<TrackedObject> {
        self.objects.read().await.values().cloned().collect()
    }

    async fn upsert(&self, object: TrackedObject) {
        self.objects.write().await.insert(object.id.clone(), object);
    }

    async fn get(&self, id: &TrackedObjectId) -> Option<TrackedObject> {
        self.objects.read().await.get(id).cloned()
    }
}
