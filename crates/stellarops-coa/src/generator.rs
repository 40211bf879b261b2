//! COA generation and risk scoring (spec §4.8).
//!
//! Triggered by a `conjunction_detected` event or called explicitly for a
//! conjunction id; the subscription side lives in `stellarops-core`'s
//! startup wiring, this module is the pure generation step given a loaded
//! conjunction record.

use chrono::{DateTime, Utc};
use std::f64::consts::TAU;
use std::sync::Arc;
use stellarops_clock::Clock;
use stellarops_eventbus::EventBus;
use stellarops_fleet::SatelliteFleet;
use stellarops_types::{Coa, CoaId, CoaStatus, CoaType, Conjunction, DeltaV, Event, OrbitSnapshot};
use tracing::{info, warn};

use crate::physics;
use crate::store::CoaStore;

/// Default lead time between COA generation and the scheduled burn (spec §6
/// `maneuver_lead_time_hours`), when nothing closer is forced by the
/// conjunction's own TCA.
pub const DEFAULT_MANEUVER_LEAD_TIME_HOURS: f64 = 12.0;

/// Minimum gap kept between a burn and TCA so the maneuver has time to take
/// effect before closest approach.
const MIN_TCA_MARGIN: chrono::Duration = chrono::Duration::minutes(30);

pub struct CoaGenerator {
    fleet: Arc<SatelliteFleet>,
    store: Arc<dyn CoaStore>,
    events: EventBus<Event>,
    clock: Arc<dyn Clock>,
    lead_time_hours: f64,
}

impl CoaGenerator {
    pub fn new(fleet: Arc<SatelliteFleet>, store: Arc<dyn CoaStore>, events: EventBus<Event>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fleet,
            store,
            events,
            clock,
            lead_time_hours: DEFAULT_MANEUVER_LEAD_TIME_HOURS,
        }
    }

    /// Overrides the burn lead time (spec §6 `maneuver_lead_time_hours`).
    pub fn with_lead_time_hours(mut self, hours: f64) -> Self {
        self.lead_time_hours = hours;
        self
    }

    /// Generates, scores, and persists COA candidates for `conjunction`,
    /// sorted ascending by risk. If no satellite linkage can be found for
    /// the conjunction's primary object, logs and generates nothing.
    pub async fn generate(&self, conjunction: &Conjunction) -> Vec<Coa> {
        let now = self.clock.now_utc();
        let Some(satellite) = self.fleet.get_state(&conjunction.asset_id).await else {
            warn!(asset_id = %conjunction.asset_id, "no satellite linkage for conjunction, generating nothing");
            return Vec::new();
        };
        let Some(tle) = &satellite.tle else {
            warn!(asset_id = %conjunction.asset_id, "satellite has no TLE, generating nothing");
            return Vec::new();
        };

        let r_km = circular_radius_km(mean_motion_rev_per_day(&tle.line2));
        let inclination_deg = parse_inclination_deg(&tle.line2);
        let pre_burn_orbit = OrbitSnapshot {
            semi_major_axis_km: r_km,
            eccentricity: 0.0,
            inclination_deg,
        };

        let hours_to_tca = (conjunction.tca - now).num_seconds() as f64 / 3600.0;
        let period_hours = physics::orbital_period_seconds(r_km) / 3600.0;

        // Scheduled burn time: the configured lead time out from generation,
        // pulled in to stay a safety margin ahead of TCA when the
        // conjunction is sooner than the usual lead time allows.
        let lead = chrono::Duration::milliseconds((self.lead_time_hours * 3_600_000.0) as i64);
        let latest_burn_time = conjunction.tca - MIN_TCA_MARGIN;
        let burn_start_time = (now + lead).min(latest_burn_time);

        let mut candidates = Vec::new();
        for coa_type in [
            CoaType::RetrogradeBurn,
            CoaType::ProgradeBurn,
            CoaType::InclinationChange,
            CoaType::Phasing,
            CoaType::StationKeeping,
        ] {
            if !is_feasible(coa_type, hours_to_tca, period_hours) {
                continue;
            }
            candidates.push(build_candidate(
                &self.clock,
                conjunction,
                &pre_burn_orbit,
                coa_type,
                r_km,
                hours_to_tca,
                now,
                burn_start_time,
            ));
        }

        candidates.sort_by(|a, b| a.risk_score.partial_cmp(&b.risk_score).unwrap_or(std::cmp::Ordering::Equal));

        for coa in &candidates {
            self.store.save(coa.clone()).await;
        }

        info!(conjunction_id = %conjunction.id, count = candidates.len(), "COAs generated");
        self.events
            .publish(
                "ssa:coa",
                Event::CoasGenerated {
                    conjunction_id: conjunction.id,
                    coas: candidates.iter().cloned().map(Arc::new).collect(),
                },
            )
            .await;

        candidates
    }
}

fn build_candidate(
    clock: &Arc<dyn Clock>,
    conjunction: &Conjunction,
    pre_burn_orbit: &OrbitSnapshot,
    coa_type: CoaType,
    r_km: f64,
    hours_to_tca: f64,
    now: DateTime<Utc>,
    burn_start_time: DateTime<Utc>,
) -> Coa {
    let (delta_v_km_s, post_burn_orbit) = match coa_type {
        CoaType::ProgradeBurn => {
            let dv = physics::hohmann_altitude_delta_v_km_s(r_km, true);
            (
                dv,
                OrbitSnapshot {
                    semi_major_axis_km: r_km + 10.0,
                    ..*pre_burn_orbit
                },
            )
        }
        CoaType::RetrogradeBurn => {
            let dv = physics::hohmann_altitude_delta_v_km_s(r_km, false);
            (
                dv,
                OrbitSnapshot {
                    semi_major_axis_km: r_km - 10.0,
                    ..*pre_burn_orbit
                },
            )
        }
        CoaType::InclinationChange => {
            let v = physics::circular_speed_km_s(r_km);
            let dv = physics::plane_change_delta_v_km_s(v);
            (
                dv,
                OrbitSnapshot {
                    inclination_deg: pre_burn_orbit.inclination_deg + 0.1,
                    ..*pre_burn_orbit
                },
            )
        }
        CoaType::Phasing => {
            let dv = physics::hohmann_altitude_delta_v_km_s(r_km, true);
            (
                dv,
                OrbitSnapshot {
                    semi_major_axis_km: r_km + 10.0,
                    ..*pre_burn_orbit
                },
            )
        }
        CoaType::StationKeeping => (0.0, *pre_burn_orbit),
    };

    let delta_v_m_s = physics::km_s_to_m_s(delta_v_km_s);
    let fuel_used_kg = physics::fuel_used_kg(delta_v_m_s, physics::DEFAULT_MASS_KG);
    let burn_duration_seconds = physics::burn_duration_seconds(delta_v_km_s);
    let improvement_km = physics::predicted_improvement_km(coa_type);
    let risk_score = physics::risk_score(fuel_used_kg, hours_to_tca, improvement_km, coa_type);

    Coa {
        id: CoaId::new(clock.new_id()),
        conjunction_id: conjunction.id,
        coa_type,
        delta_v: DeltaV {
            magnitude_m_s: delta_v_m_s,
            direction: (1.0, 0.0, 0.0),
        },
        burn_start_time,
        burn_duration_seconds,
        estimated_fuel_kg: fuel_used_kg,
        predicted_miss_distance_km: conjunction.miss_distance_km + improvement_km,
        pre_burn_orbit: *pre_burn_orbit,
        post_burn_orbit,
        risk_score,
        status: CoaStatus::Proposed,
        failure_reason: None,
        created_at: now,
    }
}

fn is_feasible(coa_type: CoaType, hours_to_tca: f64, period_hours: f64) -> bool {
    match coa_type {
        CoaType::RetrogradeBurn | CoaType::ProgradeBurn => hours_to_tca >= 2.0,
        CoaType::InclinationChange => hours_to_tca >= 4.0,
        CoaType::Phasing => hours_to_tca >= 2.0 * period_hours,
        CoaType::StationKeeping => true,
    }
}

/// Same trailing-field convention `stellarops_orbital::MockOrbitalClient`
/// uses so hand-written test TLEs stay readable.
fn mean_motion_rev_per_day(tle2: &str) -> f64 {
    tle2.split_whitespace()
        .last()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(15.0)
}

fn parse_inclination_deg(tle2: &str) -> f64 {
    tle2.split_whitespace().nth(2).and_then(|s| s.parse::<f64>().ok()).unwrap_or(51.6)
}

fn circular_radius_km(mean_motion_rev_per_day: f64) -> f64 {
    let period_s = 86400.0 / mean_motion_rev_per_day.max(0.1);
    (physics::MU_KM3_S2 * (period_s / TAU).powi(2)).cbrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_clock::FixedClock;
    use stellarops_types::{ConjunctionId, Position, SatelliteId, TleSet, TrackedObjectId};

    fn conjunction(tca: DateTime<Utc>) -> Conjunction {
        Conjunction::new(
            ConjunctionId::new(uuid::Uuid::from_u128(1)),
            SatelliteId::new("SAT-1"),
            TrackedObjectId::new("DEBRIS-1"),
            tca,
            0.8,
            1.0,
            Position::ORIGIN,
            Position::ORIGIN,
            Utc::now(),
        )
    }

    fn tle() -> TleSet {
        TleSet {
            line1: "1 00000U 00000A   00000.00000000  .00000000  00000-0  00000-0 0  0000".to_string(),
            line2: "2 00000  51.6000 000.0000 0000000 000.0000 000.0000 15.50000000000000".to_string(),
            epoch: Utc::now(),
        }
    }

    async fn generator() -> (CoaGenerator, Arc<SatelliteFleet>, Arc<crate::store::InMemoryCoaStore>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(Utc::now()));
        let fleet = Arc::new(SatelliteFleet::new(clock.clone()));
        let store = Arc::new(crate::store::InMemoryCoaStore::new());
        let events = EventBus::<Event>::default();
        let generator = CoaGenerator::new(fleet.clone(), store.clone(), events, clock);
        (generator, fleet, store)
    }

    #[tokio::test]
    async fn generates_nothing_without_satellite_linkage() {
        let (generator, _fleet, _store) = generator().await;
        let conjunction = conjunction(Utc::now() + chrono::Duration::hours(5));
        assert!(generator.generate(&conjunction).await.is_empty());
    }

    #[tokio::test]
    async fn generates_all_feasible_types_sorted_ascending_by_risk() {
        let (generator, fleet, store) = generator().await;
        let id = SatelliteId::new("SAT-1");
        fleet.start(id.clone()).await;
        fleet.set_tle(&id, tle()).await;
        tokio::task::yield_now().await;

        let conjunction = conjunction(Utc::now() + chrono::Duration::hours(5));
        let candidates = generator.generate(&conjunction).await;

        assert!(candidates.len() >= 4);
        for pair in candidates.windows(2) {
            assert!(pair[0].risk_score <= pair[1].risk_score);
        }
        assert_eq!(store.list_by_conjunction(&conjunction.id).await.len(), candidates.len());
    }

    #[tokio::test]
    async fn short_time_to_tca_excludes_inclination_and_phasing() {
        let (generator, fleet, _store) = generator().await;
        let id = SatelliteId::new("SAT-1");
        fleet.start(id.clone()).await;
        fleet.set_tle(&id, tle()).await;
        tokio::task::yield_now().await;

        let conjunction = conjunction(Utc::now() + chrono::Duration::hours(2) + chrono::Duration::minutes(1));
        let candidates = generator.generate(&conjunction).await;
        assert!(!candidates.iter().any(|c| c.coa_type == CoaType::InclinationChange));
        assert!(candidates.iter().any(|c| c.coa_type == CoaType::StationKeeping));
    }
}
