//! COA persistence (spec §4.8: "Persist, sort ascending by risk").

use async_trait::async_trait;
use std::collections::HashMap;
use stellarops_types::{Coa, CoaId, ConjunctionId};
use tokio::sync::RwLock;

#[async_trait]
pub trait CoaStore: Send + Sync {
    async fn save(&self, coa: Coa);
    async fn update(&self, coa: &Coa) -> Result<(), stellarops_types::Error>;
    async fn get(&self, id: &CoaId) -> Option<Coa>;
    async fn list_by_conjunction(&self, conjunction_id: &ConjunctionId) -> Vec<Coa>;
}

#[derive(Debug, Default)]
pub struct InMemoryCoaStore {
    records: RwLock<HashMap<CoaId, Coa>>,
}

impl InMemoryCoaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoaStore for InMemoryCoaStore {
    async fn save(&self, coa: Coa) {
        self.records.write().await.insert(coa.id, coa);
    }

    async fn update(&self, coa: &Coa) -> Result<(), stellarops_types::Error> {
        let mut records = self.records.write().await;
        if !records.contains_key(&coa.id) {
            return Err(stellarops_types::Error::not_found("coa", coa.id.to_string()));
        }
        records.insert(coa.id, coa.clone());
        Ok(())
    }

    async fn get(&self, id: &CoaId) -> Option<Coa> {
        self.records.read().await.get(id).cloned()
    }

    async fn list_by_conjunction(&self, conjunction_id: &ConjunctionId) -> Vec<Coa> {
        self.records
            .read()
            .await
            .values()
            .filter(|c| &c.conjunction_id == conjunction_id)
            .cloned()
            .collect()
    }
}
