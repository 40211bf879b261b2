//! Mission persistence (spec §4.6: "`MissionStore` trait mirrors
//! `AlarmStore`'s shape").

use async_trait::async_trait;
use stellarops_types::{Mission, MissionId};

#[async_trait]
pub trait MissionStore: Send + Sync {
    async fn save(&self, mission: &Mission) -> Result<(), String>;
    async fn update(&self, mission: &Mission) -> Result<(), String>;
    async fn get(&self, id: &MissionId) -> Result<Option<Mission>, String>;
    async fn list(&self) -> Result<Vec<Mission>, String>;
}

#[derive(Debug, Default)]
pub struct InMemoryMissionStore {
    missions: tokio::sync::Mutex<std::collections::HashMap<MissionId, Mission>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MissionStore for InMemoryMissionStore {
    async fn save(&self, mission: &Mission) -> Result<(), String> {
        self.missions.lock().await.insert(mission.id, mission.clone());
        Ok(())
    }

    async fn update(&self, mission: &Mission) -> Result<(), String> {
        self.missions.lock().await.insert(mission.id, mission.clone());
        Ok(())
    }

    async fn get(&self, id: &MissionId) -> Result<Option<Mission>, String> {
        Ok(self.missions.lock().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Mission>, String> {
        Ok(self.missions.lock().await.values().cloned().collect())
    }
}
