//! Course-of-Action entity (spec §3, §4.8, §4.9).

use crate::ids::{CoaId, ConjunctionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoaType {
    RetrogradeBurn,
    ProgradeBurn,
    InclinationChange,
    Phasing,
    StationKeeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoaStatus {
    Proposed,
    Selected,
    Rejected,
    Executing,
    Completed,
    Failed,
}

impl CoaStatus {
    /// At most one COA per conjunction may be in one of these statuses.
    pub fn is_committed(self) -> bool {
        matches!(self, CoaStatus::Selected | CoaStatus::Executing | CoaStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaV {
    pub magnitude_m_s: f64,
    pub direction: (f64, f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitSnapshot {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coa {
    pub id: CoaId,
    pub conjunction_id: ConjunctionId,
    pub coa_type: CoaType,
    pub delta_v: DeltaV,
    pub burn_start_time: DateTime<Utc>,
    pub burn_duration_seconds: f64,
    pub estimated_fuel_kg: f64,
    pub predicted_miss_distance_km: f64,
    pub pre_burn_orbit: OrbitSnapshot,
    pub post_burn_orbit: OrbitSnapshot,
    pub risk_score: f64,
    pub status: CoaStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Coa {
    pub fn reject(&mut self) {
        if self.status == CoaStatus::Proposed {
            self.status = CoaStatus::Rejected;
        }
    }

    pub fn can_be_deleted(&self) -> bool {
        self.status == CoaStatus::Proposed
    }
}
