//! Pre-flight and pre-execution mission validation (spec §4.6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use stellarops_fleet::SatelliteFleet;
use stellarops_types::{Mission, MissionPriority, SatelliteMode};

/// Minimum lead time before a deadline for a mission to still be admissible.
pub const MIN_DEADLINE_LEAD: chrono::Duration = chrono::Duration::minutes(5);
/// Critical missions' deadline must be within this horizon.
pub const CRITICAL_DEADLINE_HORIZON: chrono::Duration = chrono::Duration::hours(24);
/// `orbit_adjust` missions require at least this much energy headroom.
pub const ORBIT_ADJUST_MIN_ENERGY_PCT: f64 = 20.0;

/// Ground-station online/offline lookup, consulted by `downlink` validation.
#[async_trait]
pub trait GroundStationDirectory: Send + Sync {
    async fn is_online(&self, ground_station_id: &str) -> bool;
}

/// Default directory used when no real ground-station component is wired:
/// every station is considered online.
#[derive(Debug, Default)]
pub struct AlwaysOnlineDirectory;

#[async_trait]
impl GroundStationDirectory for AlwaysOnlineDirectory {
    async fn is_online(&self, _ground_station_id: &str) -> bool {
        true
    }
}

#[derive(Default)]
pub struct ValidationOptions {
    pub strict: bool,
}

pub struct Validator {
    fleet: Arc<SatelliteFleet>,
    ground_stations: Arc<dyn GroundStationDirectory>,
}

impl Validator {
    pub fn new(fleet: Arc<SatelliteFleet>, ground_stations: Arc<dyn GroundStationDirectory>) -> Self {
        Self {
            fleet,
            ground_stations,
        }
    }

    /// Static pre-flight checks: satellite existence/health, resource
    /// headroom, deadline legality, type-specific rules.
    pub async fn validate(&self, mission: &Mission, options: ValidationOptions, now: DateTime<Utc>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let satellite = self.fleet.get_state(&mission.satellite_id).await;
        match &satellite {
            None => errors.push(format!("satellite {} does not exist", mission.satellite_id)),
            Some(s) if s.mode == SatelliteMode::Survival => {
                errors.push(format!("satellite {} is inactive (survival mode)", mission.satellite_id));
            }
            Some(_) => {}
        }

        if let Some(s) = &satellite {
            let required_energy = if options.strict {
                mission.required_energy * 2.0
            } else {
                mission.required_energy
            };
            if required_energy > s.energy {
                errors.push(format!(
                    "insufficient energy headroom: requires {required_energy}, satellite has {}",
                    s.energy
                ));
            }
        }

        match mission.deadline {
            None => {
                if mission.priority == MissionPriority::Critical {
                    errors.push("critical missions must have a deadline".to_string());
                }
            }
            Some(deadline) => {
                if deadline <= now {
                    errors.push("deadline has already passed".to_string());
                } else if deadline - now < MIN_DEADLINE_LEAD {
                    errors.push("deadline is less than 5 minutes away".to_string());
                } else if mission.priority == MissionPriority::Critical
                    && deadline - now > CRITICAL_DEADLINE_HORIZON
                {
                    errors.push("critical mission deadline must be within 24 hours".to_string());
                }
            }
        }

        self.validate_type_specific(mission, &mut errors).await;

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    async fn validate_type_specific(&self, mission: &Mission, errors: &mut Vec<String>) {
        match mission.mission_type.as_str() {
            "downlink" => match mission.payload.get("ground_station_id").and_then(|v| v.as_str()) {
                Some(station_id) => {
                    if !self.ground_stations.is_online(station_id).await {
                        errors.push(format!("ground station {station_id} is offline"));
                    }
                }
                None => errors.push("downlink missions require payload.ground_station_id".to_string()),
            },
            "imaging" => {
                let lat = mission.payload.get("latitude_deg").and_then(|v| v.as_f64());
                let lon = mission.payload.get("longitude_deg").and_then(|v| v.as_f64());
                match (lat, lon) {
                    (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {}
                    _ => errors.push("imaging missions require valid payload.latitude_deg/longitude_deg".to_string()),
                }
            }
            "orbit_adjust" => {
                if let Some(s) = self.fleet.get_state(&mission.satellite_id).await {
                    if s.energy < ORBIT_ADJUST_MIN_ENERGY_PCT {
                        errors.push(format!(
                            "orbit_adjust requires at least {ORBIT_ADJUST_MIN_ENERGY_PCT}% energy, satellite has {}",
                            s.energy
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    /// Additionally consults live actor state immediately before admission:
    /// mode must be nominal, except critical missions are also allowed in
    /// safe mode; no missions are eligible while the satellite is in
    /// survival mode.
    pub async fn validate_for_execution(&self, mission: &Mission, now: DateTime<Utc>) -> Result<(), Vec<String>> {
        let mut errors = self
            .validate(mission, ValidationOptions { strict: false }, now)
            .await
            .err()
            .unwrap_or_default();

        if let Some(satellite) = self.fleet.get_state(&mission.satellite_id).await {
            let eligible_modes: HashSet<SatelliteMode> = match mission.priority {
                MissionPriority::Critical => {
                    [SatelliteMode::Nominal, SatelliteMode::Safe].into_iter().collect()
                }
                _ => [SatelliteMode::Nominal].into_iter().collect(),
            };
            if !eligible_modes.contains(&satellite.mode) {
                errors.push(format!(
                    "satellite {} in mode {:?} is not eligible to execute this mission",
                    mission.satellite_id, satellite.mode
                ));
            }
            if mission.required_energy > satellite.energy {
                errors.push(format!(
                    "satellite {} no longer has sufficient energy at admission time",
                    mission.satellite_id
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_clock::{Clock, FixedClock};
    use stellarops_types::{MissionId, MissionStatus, SatelliteId};

    fn base_mission(satellite_id: &str, now: DateTime<Utc>) -> Mission {
        Mission {
            id: MissionId::new(uuid::Uuid::from_u128(1)),
            satellite_id: SatelliteId::new(satellite_id),
            coa_id: None,
            mission_type: "station_keeping".to_string(),
            priority: MissionPriority::Normal,
            status: MissionStatus::Pending,
            scheduled_start: None,
            deadline: Some(now + chrono::Duration::hours(1)),
            required_energy: 10.0,
            required_memory: 0.0,
            required_bandwidth: 0.0,
            payload: Default::default(),
            retry_count: 0,
            max_retries: 3,
            created_at: now,
            enqueue_seq: 0,
        }
    }

    async fn fleet_with(id: &str, energy: f64) -> Arc<SatelliteFleet> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(Utc::now()));
        let fleet = Arc::new(SatelliteFleet::new(clock));
        fleet.start(SatelliteId::new(id)).await;
        fleet
            .update_energy(&SatelliteId::new(id), energy - 100.0)
            .await;
        tokio::task::yield_now().await;
        fleet
    }

    #[tokio::test]
    async fn rejects_mission_for_nonexistent_satellite() {
        let fleet = fleet_with("SAT-1", 100.0).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));
        let now = Utc::now();
        let mission = base_mission("SAT-ghost", now);
        let err = validator
            .validate(&mission, ValidationOptions::default(), now)
            .await
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("does not exist")));
    }

    #[tokio::test]
    async fn rejects_insufficient_energy_with_strict_doubling() {
        let fleet = fleet_with("SAT-1", 15.0).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));
        let now = Utc::now();
        let mut mission = base_mission("SAT-1", now);
        mission.required_energy = 10.0;

        assert!(validator
            .validate(&mission, ValidationOptions { strict: false }, now)
            .await
            .is_ok());
        let err = validator
            .validate(&mission, ValidationOptions { strict: true }, now)
            .await
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("insufficient energy")));
    }

    #[tokio::test]
    async fn critical_mission_requires_deadline_within_24h() {
        let fleet = fleet_with("SAT-1", 100.0).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));
        let now = Utc::now();
        let mut mission = base_mission("SAT-1", now);
        mission.priority = MissionPriority::Critical;
        mission.deadline = None;
        let err = validator
            .validate(&mission, ValidationOptions::default(), now)
            .await
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("must have a deadline")));

        mission.deadline = Some(now + chrono::Duration::hours(48));
        let err = validator
            .validate(&mission, ValidationOptions::default(), now)
            .await
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("within 24 hours")));
    }

    #[tokio::test]
    async fn imaging_requires_valid_lat_lon() {
        let fleet = fleet_with("SAT-1", 100.0).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));
        let now = Utc::now();
        let mut mission = base_mission("SAT-1", now);
        mission.mission_type = "imaging".to_string();
        let err = validator
            .validate(&mission, ValidationOptions::default(), now)
            .await
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("latitude_deg")));

        mission
            .payload
            .insert("latitude_deg".to_string(), serde_json::json!(10.0));
        mission
            .payload
            .insert("longitude_deg".to_string(), serde_json::json!(20.0));
        assert!(validator
            .validate(&mission, ValidationOptions::default(), now)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn validate_for_execution_rejects_survival_mode() {
        let fleet = fleet_with("SAT-1", 2.0).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));
        let now = Utc::now();
        let mission = base_mission("SAT-1", now);
        let err = validator.validate_for_execution(&mission, now).await.unwrap_err();
        assert!(err.iter().any(|e| e.contains("not eligible")));
    }
}
