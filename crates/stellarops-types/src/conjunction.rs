//! Conjunction entity and severity classification (spec §3, §4.7).

use crate::ids::{ConjunctionId, SatelliteId, TrackedObjectId};
use crate::satellite::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConjunctionSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ConjunctionSeverity {
    /// Deterministic function of miss distance at creation time
    /// (spec §3: critical<1 km, high<5, medium<10, low>=10).
    pub fn from_miss_distance_km(miss_distance_km: f64) -> Self {
        if miss_distance_km < 1.0 {
            ConjunctionSeverity::Critical
        } else if miss_distance_km < 5.0 {
            ConjunctionSeverity::High
        } else if miss_distance_km < 10.0 {
            ConjunctionSeverity::Medium
        } else {
            ConjunctionSeverity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConjunctionStatus {
    Predicted,
    Active,
    Monitoring,
    Resolved,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conjunction {
    pub id: ConjunctionId,
    pub asset_id: SatelliteId,
    pub secondary_object_id: TrackedObjectId,
    pub tca: DateTime<Utc>,
    pub miss_distance_km: f64,
    pub relative_velocity_km_s: f64,
    pub collision_probability: Option<f64>,
    pub severity: ConjunctionSeverity,
    pub status: ConjunctionStatus,
    pub asset_position_at_tca: Position,
    pub secondary_position_at_tca: Position,
    pub created_at: DateTime<Utc>,
}

impl Conjunction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ConjunctionId,
        asset_id: SatelliteId,
        secondary_object_id: TrackedObjectId,
        tca: DateTime<Utc>,
        miss_distance_km: f64,
        relative_velocity_km_s: f64,
        asset_position_at_tca: Position,
        secondary_position_at_tca: Position,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            asset_id,
            secondary_object_id,
            tca,
            miss_distance_km,
            relative_velocity_km_s,
            collision_probability: None,
            severity: ConjunctionSeverity::from_miss_distance_km(miss_distance_km),
            status: ConjunctionStatus::Predicted,
            asset_position_at_tca,
            secondary_position_at_tca,
            created_at,
        }
    }

    pub fn is_past_tca(&self, now: DateTime<Utc>) -> bool {
        self.tca < now
    }
}
