//! Alarm entity (spec §3, §4.1).

use crate::ids::AlarmId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlarmSeverity {
    Info,
    Warning,
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlarmStatus {
    /// Status only ever advances active -> acknowledged -> resolved.
    pub fn rank(self) -> u8 {
        match self {
            AlarmStatus::Active => 0,
            AlarmStatus::Acknowledged => 1,
            AlarmStatus::Resolved => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub alarm_type: String,
    pub severity: AlarmSeverity,
    pub message: String,
    /// `kind:id` convention, e.g. `satellite:SAT-1`.
    pub source: String,
    pub details: BTreeMap<String, serde_json::Value>,
    pub status: AlarmStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alarm {
    pub fn new(
        id: AlarmId,
        alarm_type: impl Into<String>,
        severity: AlarmSeverity,
        message: impl Into<String>,
        source: impl Into<String>,
        details: BTreeMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            alarm_type: alarm_type.into(),
            severity,
            message: message.into(),
            source: source.into(),
            details,
            status: AlarmStatus::Active,
            created_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
        }
    }

    /// DB-indexing convention: extracts the `satellite:<id>` style prefix
    /// from `source`.
    pub fn source_kind(&self) -> Option<&str> {
        self.source.split(':').next()
    }

    /// Monotonic acknowledge: a no-op if already acknowledged or resolved.
    pub fn acknowledge(&mut self, user: impl Into<String>, now: DateTime<Utc>) {
        if self.status.rank() >= AlarmStatus::Acknowledged.rank() {
            return;
        }
        self.status = AlarmStatus::Acknowledged;
        self.acknowledged_at = Some(now);
        self.acknowledged_by = Some(user.into());
    }

    /// Monotonic resolve: a no-op if already resolved.
    pub fn resolve(&mut self, now: DateTime<Utc>) {
        if self.status.rank() >= AlarmStatus::Resolved.rank() {
            return;
        }
        self.status = AlarmStatus::Resolved;
        self.resolved_at = Some(now);
    }
}
