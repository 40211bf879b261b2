//! Trajectory points returned by the orbital client (spec §3, §4.4).

use crate::satellite::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx_km_s: f64,
    pub vy_km_s: f64,
    pub vz_km_s: f64,
}

/// A single sample of a propagated trajectory. `timestamp` is Unix seconds
/// (spec §3 calls this out explicitly, unlike the chrono timestamps used
/// elsewhere in the data model).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub timestamp: i64,
    pub position: Position,
    pub velocity: Option<Velocity>,
}

/// An ordered, finite, uniform-step trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub step_seconds: i64,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(step_seconds: i64, points: Vec<TrajectoryPoint>) -> Self {
        Self { step_seconds, points }
    }

    pub fn at(&self, timestamp: i64) -> Option<&TrajectoryPoint> {
        self.points.iter().find(|p| p.timestamp == timestamp)
    }
}
