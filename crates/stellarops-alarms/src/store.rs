//! Alarm persistence boundary (spec §4.1).
//!
//! The bus itself is the authoritative in-memory index; `AlarmStore` is the
//! write-through side channel. A persist failure degrades to in-memory-only
//! with a warning — it must never block or fail the caller's `raise`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stellarops_types::{Alarm, AlarmId};

#[async_trait]
pub trait AlarmStore: Send + Sync {
    async fn save(&self, alarm: &Alarm) -> Result<(), String>;
    async fn update(&self, alarm: &Alarm) -> Result<(), String>;
    async fn list(&self) -> Result<Vec<Alarm>, String>;
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<AlarmId>, String>;
}

/// Used by tests and as the degraded-mode target when no real store is wired.
#[derive(Debug, Default)]
pub struct InMemoryAlarmStore {
    alarms: tokio::sync::Mutex<std::collections::HashMap<AlarmId, Alarm>>,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlarmStore for InMemoryAlarmStore {
    async fn save(&self, alarm: &Alarm) -> Result<(), String> {
        self.alarms.lock().await.insert(alarm.id.clone(), alarm.clone());
        Ok(())
    }

    async fn update(&self, alarm: &Alarm) -> Result<(), String> {
        self.alarms.lock().await.insert(alarm.id.clone(), alarm.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Alarm>, String> {
        Ok(self.alarms.lock().await.values().cloned().collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<AlarmId>, String> {
        let mut alarms = self.alarms.lock().await;
        let dead: Vec<AlarmId> = alarms
            .values()
            .filter(|a| {
                a.status == stellarops_types::AlarmStatus::Resolved
                    && a.resolved_at.unwrap_or(a.created_at) < cutoff
            })
            .map(|a| a.id)
            .collect();
        for id in &dead {
            alarms.remove(id);
        }
        Ok(dead)
    }
}
