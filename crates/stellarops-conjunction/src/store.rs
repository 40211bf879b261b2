//! Conjunction record persistence (spec §4.7 step 6: "upsert the conjunction
//! into the store").

use async_trait::async_trait;
use std::collections::HashMap;
use stellarops_types::{Conjunction, ConjunctionId, ConjunctionStatus};
use tokio::sync::RwLock;

#[async_trait]
pub trait ConjunctionStore: Send + Sync {
    async fn upsert(&self, conjunction: Conjunction);
    async fn get(&self, id: &ConjunctionId) -> Option<Conjunction>;
    async fn list(&self) -> Vec<Conjunction>;
    /// Transitions every non-expired, non-resolved record past its TCA to
    /// `Expired`; returns the ids that changed.
    async fn expire_past_tca(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<ConjunctionId>;
}

#[derive(Debug, Default)]
pub struct InMemoryConjunctionStore {
    records: RwLock<HashMap<ConjunctionId, Conjunction>>,
}

impl InMemoryConjunctionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConjunctionStore for InMemoryConjunctionStore {
    async fn upsert(&self, conjunction: Conjunction) {
        self.records.write().await.insert(conjunction.id, conjunction);
    }

    async fn get(&self, id: &ConjunctionId) -> Option<Conjunction> {
        self.records.read().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<Conjunction> {
        self.records.read().await.values().cloned().collect()
    }

    async fn expire_past_tca(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<ConjunctionId> {
        let mut records = self.records.write().await;
        let mut expired = Vec::new();
        for record in records.values_mut() {
            if matches!(
                record.status,
                ConjunctionStatus::Predicted | ConjunctionStatus::Active | ConjunctionStatus::Monitoring
            ) && record.is_past_tca(now)
            {
                record.status = ConjunctionStatus::Expired;
                expired.push(record.id);
            }
        }
        expired
    }
}
