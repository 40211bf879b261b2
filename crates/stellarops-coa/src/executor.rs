//! COA execution state machine (spec §4.9).
//!
//! Mission creation goes through the same `MissionStore` + `Scheduler` used
//! by the mission executor, not a private path, so scheduler admission
//! rules apply uniformly. `handle_mission_complete`/`handle_mission_failure`
//! are meant to be driven by a `missions:*` subscription in `stellarops-core`
//! rather than called directly, keeping this executor decoupled from the
//! mission executor (spec §5 actor-per-component model).

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use stellarops_alarms::AlarmBusHandle;
use stellarops_clock::Clock;
use stellarops_conjunction::ConjunctionStore;
use stellarops_eventbus::EventBus;
use stellarops_missions::{MissionStore, Scheduler};
use stellarops_types::{
    AlarmSeverity, Coa, CoaId, CoaStatus, CoaType, Event, Mission, MissionId, MissionPriority, MissionStatus,
    OrbitSnapshot,
};
use tracing::warn;

use crate::store::CoaStore;

pub const PRE_BURN_MISSION_TYPE: &str = "pre_burn";
pub const BURN_MISSION_TYPE: &str = "burn";
pub const MANEUVER_VERIFY_MISSION_TYPE: &str = "maneuver_verify";

/// RMS orbital-element deviation (%) above which a correction COA is
/// warranted (spec §4.9). Generating that correction COA is out of scope.
pub const CORRECTION_THRESHOLD_PCT: f64 = 1.0;

/// Mirrors `Coa::status` for the slice of the lifecycle this executor
/// drives; kept distinct because a COA not yet selected has no execution
/// state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoaExecState {
    Selected,
    Executing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ExecutionStatus {
    pub coa_id: CoaId,
    pub state: CoaExecState,
    pub missions_total: usize,
    pub missions_completed: usize,
    pub percent_complete: f64,
}

pub struct CoaExecutor {
    coas: Arc<dyn CoaStore>,
    conjunctions: Arc<dyn ConjunctionStore>,
    missions: Arc<dyn MissionStore>,
    scheduler: Arc<Scheduler>,
    alarms: AlarmBusHandle,
    events: EventBus<Event>,
    clock: Arc<dyn Clock>,
}

impl CoaExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        coas: Arc<dyn CoaStore>,
        conjunctions: Arc<dyn ConjunctionStore>,
        missions: Arc<dyn MissionStore>,
        scheduler: Arc<Scheduler>,
        alarms: AlarmBusHandle,
        events: EventBus<Event>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coas,
            conjunctions,
            missions,
            scheduler,
            alarms,
            events,
            clock,
        }
    }

    /// Transitions a `selected` COA to `executing` and enqueues its mission
    /// sequence. Station-keeping has no missions and goes straight to
    /// `completed`. On any mission-creation failure the COA reverts to
    /// `selected` and the error propagates.
    pub async fn execute_coa(&self, mut coa: Coa) -> Result<(Coa, Vec<Mission>), stellarops_types::Error> {
        if coa.status != CoaStatus::Selected {
            return Err(stellarops_types::Error::invalid_state(format!(
                "coa {} must be selected to execute, is {:?}",
                coa.id, coa.status
            )));
        }

        if coa.coa_type == CoaType::StationKeeping {
            coa.status = CoaStatus::Completed;
            self.persist(&coa).await;
            return Ok((coa, Vec::new()));
        }

        let Some(conjunction) = self.conjunctions.get(&coa.conjunction_id).await else {
            return Err(stellarops_types::Error::not_found(
                "conjunction",
                coa.conjunction_id.to_string(),
            ));
        };

        coa.status = CoaStatus::Executing;
        self.persist(&coa).await;

        match self.build_and_enqueue_missions(&coa, conjunction.asset_id.clone()).await {
            Ok(missions) => Ok((coa, missions)),
            Err(err) => {
                coa.status = CoaStatus::Selected;
                self.persist(&coa).await;
                Err(err)
            }
        }
    }

    async fn build_and_enqueue_missions(
        &self,
        coa: &Coa,
        satellite_id: stellarops_types::SatelliteId,
    ) -> Result<Vec<Mission>, stellarops_types::Error> {
        let now = self.clock.now_utc();
        let missions = vec![
            pre_burn_mission(self.clock.as_ref(), coa, satellite_id.clone(), now),
            burn_mission(self.clock.as_ref(), coa, satellite_id.clone(), now),
            verify_mission(self.clock.as_ref(), coa, satellite_id, now),
        ];

        for mission in &missions {
            self.missions.save(mission).await.map_err(stellarops_types::Error::Fatal)?;
        }
        for mission in &missions {
            self.scheduler.enqueue(mission);
        }
        Ok(missions)
    }

    /// Invoked for `MissionStatusChanged` events where `mission.status ==
    /// Completed`; a no-op unless the mission is the COA's `maneuver_verify`
    /// step. Reads an `actual_*` orbit triple from the mission payload if a
    /// runner populated one; otherwise the deviation check is skipped since
    /// this core has no independent telemetry source of its own.
    pub async fn handle_mission_complete(&self, mission: &Mission) {
        if mission.mission_type != MANEUVER_VERIFY_MISSION_TYPE {
            return;
        }
        let Some(coa_id) = mission.coa_id else { return };
        let Some(mut coa) = self.coas.get(&coa_id).await else { return };

        coa.status = CoaStatus::Completed;
        self.persist(&coa).await;

        match actual_orbit_from_payload(&mission.payload) {
            Some(actual) => {
                let deviation_pct = verify_post_burn_deviation_pct(&coa.post_burn_orbit, &actual);
                if deviation_pct > CORRECTION_THRESHOLD_PCT {
                    warn!(
                        coa_id = %coa.id,
                        deviation_pct,
                        "post-burn orbit deviates past threshold, correction COA warranted"
                    );
                }
            }
            None => {
                warn!(coa_id = %coa.id, "maneuver_verify completed with no actual-orbit telemetry, skipping deviation check");
            }
        }

        self.events.publish("ssa:coa", Event::CoaCompleted(Arc::new(coa))).await;
    }

    /// Invoked when one of this COA's missions permanently fails.
    pub async fn handle_mission_failure(&self, mission: &Mission, reason: String) {
        let Some(coa_id) = mission.coa_id else { return };
        let Some(mut coa) = self.coas.get(&coa_id).await else { return };

        coa.status = CoaStatus::Failed;
        coa.failure_reason = Some(reason.clone());
        self.persist(&coa).await;

        self.alarms
            .raise(
                "coa_execution_failed",
                AlarmSeverity::Major,
                reason.clone(),
                format!("coa:{}", coa.id),
                BTreeMap::new(),
            )
            .await;
        self.events
            .publish("ssa:coa", Event::CoaFailed { coa_id: coa.id, reason })
            .await;
    }

    pub async fn get_execution_status(&self, coa_id: CoaId) -> Option<ExecutionStatus> {
        let coa = self.coas.get(&coa_id).await?;
        let state = match coa.status {
            CoaStatus::Executing => CoaExecState::Executing,
            CoaStatus::Completed => CoaExecState::Completed,
            CoaStatus::Failed => CoaExecState::Failed,
            // Not yet entered this executor's lifecycle.
            CoaStatus::Proposed | CoaStatus::Rejected | CoaStatus::Selected => CoaExecState::Selected,
        };

        if coa.coa_type == CoaType::StationKeeping {
            let complete = matches!(coa.status, CoaStatus::Completed);
            return Some(ExecutionStatus {
                coa_id,
                state,
                missions_total: 0,
                missions_completed: 0,
                percent_complete: if complete { 100.0 } else { 0.0 },
            });
        }

        let related: Vec<Mission> = self
            .missions
            .list()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.coa_id == Some(coa_id))
            .collect();
        let total = related.len();
        let completed = related.iter().filter(|m| m.status == MissionStatus::Completed).count();
        let percent_complete = if total == 0 { 0.0 } else { 100.0 * completed as f64 / total as f64 };

        Some(ExecutionStatus {
            coa_id,
            state,
            missions_total: total,
            missions_completed: completed,
            percent_complete,
        })
    }

    async fn persist(&self, coa: &Coa) {
        if self.coas.update(coa).await.is_err() {
            self.coas.save(coa.clone()).await;
        }
    }
}

fn pre_burn_mission(clock: &dyn Clock, coa: &Coa, satellite_id: stellarops_types::SatelliteId, now: DateTime<Utc>) -> Mission {
    let mut payload = BTreeMap::new();
    payload.insert("delta_v_m_s".to_string(), serde_json::json!(coa.delta_v.magnitude_m_s));

    Mission {
        id: MissionId::new(clock.new_id()),
        satellite_id,
        coa_id: Some(coa.id),
        mission_type: PRE_BURN_MISSION_TYPE.to_string(),
        priority: MissionPriority::High,
        status: MissionStatus::Pending,
        scheduled_start: Some(coa.burn_start_time - chrono::Duration::minutes(30)),
        deadline: Some(coa.burn_start_time),
        required_energy: 10.0,
        required_memory: 5.0,
        required_bandwidth: 0.0,
        payload,
        retry_count: 0,
        max_retries: 3,
        created_at: now,
        enqueue_seq: 0,
    }
}

fn burn_mission(clock: &dyn Clock, coa: &Coa, satellite_id: stellarops_types::SatelliteId, now: DateTime<Utc>) -> Mission {
    let mut payload = BTreeMap::new();
    payload.insert("delta_v_m_s".to_string(), serde_json::json!(coa.delta_v.magnitude_m_s));
    payload.insert("direction".to_string(), serde_json::json!(coa.delta_v.direction));
    payload.insert("duration_s".to_string(), serde_json::json!(coa.burn_duration_seconds));
    payload.insert("fuel_estimate_kg".to_string(), serde_json::json!(coa.estimated_fuel_kg));

    Mission {
        id: MissionId::new(clock.new_id()),
        satellite_id,
        coa_id: Some(coa.id),
        mission_type: BURN_MISSION_TYPE.to_string(),
        priority: MissionPriority::Critical,
        status: MissionStatus::Pending,
        scheduled_start: Some(coa.burn_start_time),
        deadline: Some(coa.burn_start_time + chrono::Duration::seconds(coa.burn_duration_seconds as i64 + 300)),
        required_energy: 30.0,
        required_memory: 0.0,
        required_bandwidth: 0.0,
        payload,
        retry_count: 0,
        max_retries: 3,
        created_at: now,
        enqueue_seq: 0,
    }
}

fn verify_mission(clock: &dyn Clock, coa: &Coa, satellite_id: stellarops_types::SatelliteId, now: DateTime<Utc>) -> Mission {
    let verify_time = coa.burn_start_time + chrono::Duration::seconds(coa.burn_duration_seconds as i64 + 60);
    Mission {
        id: MissionId::new(clock.new_id()),
        satellite_id,
        coa_id: Some(coa.id),
        mission_type: MANEUVER_VERIFY_MISSION_TYPE.to_string(),
        priority: MissionPriority::High,
        status: MissionStatus::Pending,
        scheduled_start: Some(verify_time),
        deadline: Some(verify_time + chrono::Duration::seconds(3600)),
        required_energy: 15.0,
        required_memory: 0.0,
        required_bandwidth: 1.0,
        payload: BTreeMap::new(),
        retry_count: 0,
        max_retries: 3,
        created_at: now,
        enqueue_seq: 0,
    }
}

fn actual_orbit_from_payload(payload: &BTreeMap<String, serde_json::Value>) -> Option<OrbitSnapshot> {
    Some(OrbitSnapshot {
        semi_major_axis_km: payload.get("actual_semi_major_axis_km")?.as_f64()?,
        eccentricity: payload.get("actual_eccentricity")?.as_f64()?,
        inclination_deg: payload.get("actual_inclination_deg")?.as_f64()?,
    })
}

/// RMS deviation (%) between expected and actual orbital elements across
/// {a, e, i} (spec §4.9).
fn verify_post_burn_deviation_pct(expected: &OrbitSnapshot, actual: &OrbitSnapshot) -> f64 {
    let rel = |e: f64, a: f64| if e.abs() < f64::EPSILON { 0.0 } else { (a - e) / e };
    let da = rel(expected.semi_major_axis_km, actual.semi_major_axis_km);
    let de = rel(expected.eccentricity, actual.eccentricity);
    let di = rel(expected.inclination_deg, actual.inclination_deg);
    (((da * da + de * de + di * di) / 3.0).sqrt() * 100.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_clock::FixedClock;
    use stellarops_conjunction::InMemoryConjunctionStore;
    use stellarops_missions::InMemoryMissionStore;
    use stellarops_types::{Conjunction, ConjunctionId, DeltaV, Position, SatelliteId, TrackedObjectId};

    fn executor() -> (
        CoaExecutor,
        Arc<crate::store::InMemoryCoaStore>,
        Arc<InMemoryConjunctionStore>,
        Arc<InMemoryMissionStore>,
        Arc<FixedClock>,
    ) {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let coas = Arc::new(crate::store::InMemoryCoaStore::new());
        let conjunctions = Arc::new(InMemoryConjunctionStore::new());
        let missions = Arc::new(InMemoryMissionStore::new());
        let scheduler = Arc::new(Scheduler::new(missions.clone()));
        let events = EventBus::<Event>::default();
        let alarm_store = Arc::new(stellarops_alarms::InMemoryAlarmStore::new());
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let alarms = stellarops_alarms::spawn(alarm_store, clock_dyn.clone(), events.clone());

        let executor = CoaExecutor::new(
            coas.clone(),
            conjunctions.clone(),
            missions.clone(),
            scheduler,
            alarms,
            events,
            clock_dyn,
        );
        (executor, coas, conjunctions, missions, clock)
    }

    fn conjunction(asset_id: SatelliteId) -> Conjunction {
        Conjunction::new(
            ConjunctionId::new(uuid::Uuid::from_u128(1)),
            asset_id,
            TrackedObjectId::new("DEBRIS-1"),
            Utc::now() + chrono::Duration::hours(5),
            0.8,
            1.0,
            Position::ORIGIN,
            Position::ORIGIN,
            Utc::now(),
        )
    }

    fn selected_coa(conjunction_id: ConjunctionId, coa_type: CoaType) -> Coa {
        let now = Utc::now();
        Coa {
            id: CoaId::new(uuid::Uuid::from_u128(2)),
            conjunction_id,
            coa_type,
            delta_v: DeltaV {
                magnitude_m_s: 5.0,
                direction: (1.0, 0.0, 0.0),
            },
            burn_start_time: now + chrono::Duration::hours(1),
            burn_duration_seconds: 50.0,
            estimated_fuel_kg: 0.9,
            predicted_miss_distance_km: 5.8,
            pre_burn_orbit: OrbitSnapshot {
                semi_major_axis_km: 6921.0,
                eccentricity: 0.0,
                inclination_deg: 51.6,
            },
            post_burn_orbit: OrbitSnapshot {
                semi_major_axis_km: 6931.0,
                eccentricity: 0.0,
                inclination_deg: 51.6,
            },
            risk_score: 20.0,
            status: CoaStatus::Selected,
            failure_reason: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn execute_coa_builds_the_three_mission_sequence_in_priority_and_time_order() {
        let (executor, coas, conjunctions, _missions, _clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id.clone());
        conjunctions.upsert(conj.clone()).await;

        let coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coas.save(coa.clone()).await;

        let (executed, missions) = executor.execute_coa(coa.clone()).await.unwrap();
        assert_eq!(executed.status, CoaStatus::Executing);
        assert_eq!(missions.len(), 3);

        assert_eq!(missions[0].mission_type, PRE_BURN_MISSION_TYPE);
        assert_eq!(missions[0].priority, MissionPriority::High);
        assert_eq!(missions[0].deadline, Some(coa.burn_start_time));

        assert_eq!(missions[1].mission_type, BURN_MISSION_TYPE);
        assert_eq!(missions[1].priority, MissionPriority::Critical);

        assert_eq!(missions[2].mission_type, MANEUVER_VERIFY_MISSION_TYPE);
        assert_eq!(missions[2].priority, MissionPriority::High);

        assert!(missions[0].scheduled_start.unwrap() < missions[1].scheduled_start.unwrap());
        assert!(missions[1].scheduled_start.unwrap() < missions[2].scheduled_start.unwrap());
    }

    #[tokio::test]
    async fn station_keeping_skips_straight_to_completed_with_no_missions() {
        let (executor, coas, conjunctions, _missions, _clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id);
        conjunctions.upsert(conj.clone()).await;

        let coa = selected_coa(conj.id, CoaType::StationKeeping);
        coas.save(coa.clone()).await;

        let (executed, missions) = executor.execute_coa(coa).await.unwrap();
        assert_eq!(executed.status, CoaStatus::Completed);
        assert!(missions.is_empty());
    }

    #[tokio::test]
    async fn execute_coa_rejects_a_coa_that_is_not_selected() {
        let (executor, _coas, conjunctions, _missions, _clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id);
        conjunctions.upsert(conj.clone()).await;

        let mut coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coa.status = CoaStatus::Proposed;

        assert!(executor.execute_coa(coa).await.is_err());
    }

    #[tokio::test]
    async fn handle_mission_complete_ignores_non_verify_missions() {
        let (executor, coas, conjunctions, _missions, clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id.clone());
        conjunctions.upsert(conj.clone()).await;
        let coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coas.save(coa.clone()).await;

        let mission = burn_mission(clock.as_ref(), &coa, asset_id, clock.now_utc());
        executor.handle_mission_complete(&mission).await;

        let reloaded = coas.get(&coa.id).await.unwrap();
        assert_eq!(reloaded.status, CoaStatus::Selected);
    }

    #[tokio::test]
    async fn handle_mission_complete_on_verify_mission_completes_the_coa() {
        let (executor, coas, conjunctions, _missions, clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id.clone());
        conjunctions.upsert(conj.clone()).await;
        let coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coas.save(coa.clone()).await;

        let mission = verify_mission(clock.as_ref(), &coa, asset_id, clock.now_utc());
        executor.handle_mission_complete(&mission).await;

        let reloaded = coas.get(&coa.id).await.unwrap();
        assert_eq!(reloaded.status, CoaStatus::Completed);
    }

    #[tokio::test]
    async fn handle_mission_failure_marks_coa_failed_with_reason_and_raises_alarm() {
        let (executor, coas, conjunctions, _missions, clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id.clone());
        conjunctions.upsert(conj.clone()).await;
        let coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coas.save(coa.clone()).await;

        let mission = burn_mission(clock.as_ref(), &coa, asset_id, clock.now_utc());
        executor.handle_mission_failure(&mission, "thruster fault".to_string()).await;

        let reloaded = coas.get(&coa.id).await.unwrap();
        assert_eq!(reloaded.status, CoaStatus::Failed);
        assert_eq!(reloaded.failure_reason.as_deref(), Some("thruster fault"));
    }

    #[tokio::test]
    async fn get_execution_status_reports_percent_complete() {
        let (executor, coas, conjunctions, missions, _clock) = executor();
        let asset_id = SatelliteId::new("SAT-1");
        let conj = conjunction(asset_id.clone());
        conjunctions.upsert(conj.clone()).await;
        let coa = selected_coa(conj.id, CoaType::RetrogradeBurn);
        coas.save(coa.clone()).await;

        let (_, mission_seq) = executor.execute_coa(coa.clone()).await.unwrap();
        let mut first = mission_seq[0].clone();
        first.status = MissionStatus::Completed;
        missions.update(&first).await.unwrap();

        let status = executor.get_execution_status(coa.id).await.unwrap();
        assert_eq!(status.missions_total, 3);
        assert_eq!(status.missions_completed, 1);
        assert!((status.percent_complete - 33.333_333_333_333_33).abs() < 1e-6);
    }

    #[test]
    fn verify_post_burn_deviation_is_zero_for_identical_orbits() {
        let orbit = OrbitSnapshot {
            semi_major_axis_km: 6931.0,
            eccentricity: 0.0,
            inclination_deg: 51.6,
        };
        assert_eq!(verify_post_burn_deviation_pct(&orbit, &orbit), 0.0);
    }

    #[test]
    fn verify_post_burn_deviation_is_positive_for_differing_orbits() {
        let expected = OrbitSnapshot {
            semi_major_axis_km: 6931.0,
            eccentricity: 0.0,
            inclination_deg: 51.6,
        };
        let actual = OrbitSnapshot {
            semi_major_axis_km: 7000.0,
            eccentricity: 0.0,
            inclination_deg: 51.6,
        };
        assert!(verify_post_burn_deviation_pct(&expected, &actual) > CORRECTION_THRESHOLD_PCT);
    }
}
