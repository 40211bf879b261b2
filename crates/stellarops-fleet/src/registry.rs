//! Actor registry: a unique string -> actor handle table (spec §4.5).
//!
//! `DistributedRegistry` gives a cluster-wide lookup abstraction the
//! identical method surface as the in-process table; this core ships only
//! [`InProcessRegistry`], per §1/§5's single-node requirement.

use crate::actor::ActorHandle;
use async_trait::async_trait;
use std::collections::HashMap;
use stellarops_types::SatelliteId;
use tokio::sync::RwLock;

#[async_trait]
pub trait DistributedRegistry: Send + Sync {
    async fn insert(&self, id: SatelliteId, handle: ActorHandle) -> bool;
    async fn get(&self, id: &SatelliteId) -> Option<ActorHandle>;
    async fn remove(&self, id: &SatelliteId) -> Option<ActorHandle>;
    async fn ids(&self) -> Vec<SatelliteId>;
    async fn len(&self) -> usize;
}

/// Single-node registry: read-mostly lookups under a shared read lock,
/// exclusive insert/remove under a short write lock.
#[derive(Default)]
pub struct InProcessRegistry {
    actors: RwLock<HashMap<SatelliteId, ActorHandle>>,
}

impl InProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedRegistry for InProcessRegistry {
    /// Returns `false` (without replacing the existing entry) if `id` is
    /// already registered — insertion is exclusive per §4.5.
    async fn insert(&self, id: SatelliteId, handle: ActorHandle) -> bool {
        let mut actors = self.actors.write().await;
        if actors.contains_key(&id) {
            return false;
        }
        actors.insert(id, handle);
        true
    }

    async fn get(&self, id: &SatelliteId) -> Option<ActorHandle> {
        self.actors.read().await.get(id).cloned()
    }

    async fn remove(&self, id: &SatelliteId) -> Option<ActorHandle> {
        self.actors.write().await.remove(id)
    }

    async fn ids(&self) -> Vec<SatelliteId> {
        self.actors.read().await.keys().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.actors.read().await.len()
    }
}
