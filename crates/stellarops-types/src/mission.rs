//! Mission entity and status machine (spec §3, §4.6).

use crate::ids::{CoaId, MissionId, SatelliteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered critical < high < normal < low, matching the scheduler's
/// priority-queue comparison (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MissionPriority {
    Critical,
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl MissionStatus {
    /// Whether `self -> next` is a legal transition (spec §4.6 state
    /// machine). Never allows moving backwards or running->canceled.
    pub fn can_transition_to(self, next: MissionStatus) -> bool {
        use MissionStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduled)
                | (Pending, Canceled)
                | (Scheduled, Running)
                | (Scheduled, Canceled)
                | (Running, Completed)
                | (Running, Failed)
                | (Failed, Scheduled) // retry
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub satellite_id: SatelliteId,
    pub coa_id: Option<CoaId>,
    pub mission_type: String,
    pub priority: MissionPriority,
    pub status: MissionStatus,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub required_energy: f64,
    pub required_memory: f64,
    pub required_bandwidth: f64,
    pub payload: BTreeMap<String, serde_json::Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub enqueue_seq: u64,
}

impl Mission {
    pub fn transition_to(&mut self, next: MissionStatus) -> Result<(), crate::Error> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::invalid_state(format!(
                "mission {} cannot transition {:?} -> {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn is_cancelable(&self) -> bool {
        matches!(self.status, MissionStatus::Pending | MissionStatus::Scheduled)
    }
}
