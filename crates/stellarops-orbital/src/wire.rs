//! JSON wire types for the orbital propagation service HTTP contract
//! (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct PropagatePositionRequest {
    pub satellite_id: String,
    pub tle1: String,
    pub tle2: String,
    pub t: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePosition {
    pub x_km: f64,
    pub y_km: f64,
    pub z_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireVelocity {
    pub vx_km_s: f64,
    pub vy_km_s: f64,
    pub vz_km_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireGeodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropagatePositionResponse {
    pub success: bool,
    pub position: Option<WirePosition>,
    pub velocity: Option<WireVelocity>,
    pub geodetic: Option<WireGeodetic>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropagateTrajectoryRequest {
    pub satellite_id: String,
    pub tle1: String,
    pub tle2: String,
    pub t_start: i64,
    pub t_end: i64,
    pub step_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTrajectoryPoint {
    pub timestamp: i64,
    pub position: WirePosition,
    pub velocity: Option<WireVelocity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropagateTrajectoryResponse {
    pub success: bool,
    #[serde(default)]
    pub points: Vec<WireTrajectoryPoint>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroundStationSpec {
    pub id: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub min_elevation_deg: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibilityRequest {
    pub satellite_id: String,
    pub tle1: String,
    pub tle2: String,
    pub ground_station: GroundStationSpec,
    pub t_start: i64,
    pub t_end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityPass {
    pub aos: i64,
    pub los: i64,
    pub max_elevation_deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityResponse {
    pub success: bool,
    #[serde(default)]
    pub passes: Vec<VisibilityPass>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_seconds: u64,
}
