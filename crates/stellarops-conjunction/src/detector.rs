//! Periodic conjunction-screening pipeline (spec §4.7).
//!
//! Each tick snapshots the fleet and catalog, fetches trajectories over a
//! shared horizon, aligns them by timestamp, and upserts any conjunction
//! candidate under the threshold. Cycles never overlap: a tick that fires
//! while the previous one is still running is skipped and logged, never
//! queued.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeMap as Map};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stellarops_alarms::AlarmBusHandle;
use stellarops_clock::Clock;
use stellarops_eventbus::EventBus;
use stellarops_fleet::SatelliteFleet;
use stellarops_orbital::BreakeredOrbitalClient;
use stellarops_types::{
    AlarmSeverity, Conjunction, ConjunctionId, ConjunctionSeverity, Event, Position, Trajectory, TrackedObjectId,
    Velocity,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::catalog::{CatalogStore, TrackedObject};
use crate::store::ConjunctionStore;

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub interval_ms: u64,
    pub horizon_hours: f64,
    pub step_seconds: i64,
    pub miss_distance_threshold_km: f64,
    pub concurrency: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            horizon_hours: 24.0,
            step_seconds: 60,
            miss_distance_threshold_km: 10.0,
            concurrency: 10,
        }
    }
}

struct ClosestApproach {
    timestamp: i64,
    distance_km: f64,
    asset_position: Position,
    asset_velocity: Option<Velocity>,
    object_position: Position,
    object_velocity: Option<Velocity>,
}

pub struct Detector {
    fleet: Arc<SatelliteFleet>,
    orbital: Arc<BreakeredOrbitalClient>,
    catalog: Arc<dyn CatalogStore>,
    conjunctions: Arc<dyn ConjunctionStore>,
    alarms: AlarmBusHandle,
    events: EventBus<Event>,
    clock: Arc<dyn Clock>,
    config: DetectorConfig,
    in_flight: AtomicBool,
}

impl Detector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fleet: Arc<SatelliteFleet>,
        orbital: Arc<BreakeredOrbitalClient>,
        catalog: Arc<dyn CatalogStore>,
        conjunctions: Arc<dyn ConjunctionStore>,
        alarms: AlarmBusHandle,
        events: EventBus<Event>,
        clock: Arc<dyn Clock>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            fleet,
            orbital,
            catalog,
            conjunctions,
            alarms,
            events,
            clock,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Spawns the tick loop. The returned handle runs until aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let detector = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(detector.config.interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                detector.run_cycle().await;
            }
        })
    }

    /// Runs one detection cycle if no other cycle is in flight; otherwise
    /// skips and logs. Returns the number of conjunctions newly upserted.
    pub async fn run_cycle(&self) -> usize {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("conjunction detector cycle skipped: previous cycle still running");
            return 0;
        }
        let detected = self.run_cycle_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        detected
    }

    async fn run_cycle_inner(&self) -> usize {
        let now = self.clock.now_utc();
        let t_start = now.timestamp();
        let horizon_seconds = (self.config.horizon_hours * 3600.0) as i64;
        let t_end = t_start + horizon_seconds;
        let step = self.config.step_seconds;

        let assets: Vec<_> = self
            .fleet
            .list_states()
            .await
            .into_iter()
            .filter(|s| s.tle.is_some())
            .collect();
        let catalog = self.catalog.list().await;

        let mut detected = 0;
        if !assets.is_empty() && !catalog.is_empty() {
            let catalog_trajectories = self.fetch_catalog_trajectories(&catalog, t_start, t_end, step).await;

            for asset in &assets {
                let tle = asset.tle.as_ref().expect("filtered to satellites with a TLE");
                let asset_trajectory = match self
                    .orbital
                    .propagate_trajectory(asset.id.as_str(), &tle.line1, &tle.line2, t_start, t_end, step)
                    .await
                {
                    Ok(trajectory) => trajectory,
                    Err(err) => {
                        warn!(satellite_id = %asset.id, error = %err, "asset trajectory fetch failed");
                        continue;
                    }
                };
                let asset_points: Map<i64, _> =
                    asset_trajectory.points.iter().map(|p| (p.timestamp, p)).collect();

                for (object_id, object_trajectory) in &catalog_trajectories {
                    if let Some(approach) = closest_approach(&asset_points, object_trajectory) {
                        if approach.distance_km >= self.config.miss_distance_threshold_km {
                            continue;
                        }
                        if self
                            .record_conjunction(&asset.id, object_id, approach, now)
                            .await
                        {
                            detected += 1;
                        }
                    }
                }
            }
        }

        let expired = self.conjunctions.expire_past_tca(now).await;
        for id in expired {
            if let Some(conjunction) = self.conjunctions.get(&id).await {
                self.events
                    .publish("ssa:conjunctions", Event::ConjunctionExpired(Arc::new(conjunction)))
                    .await;
            }
        }

        detected
    }

    async fn fetch_catalog_trajectories(
        &self,
        catalog: &[TrackedObject],
        t_start: i64,
        t_end: i64,
        step: i64,
    ) -> Vec<(TrackedObjectId, Trajectory)> {
        let results = Arc::new(Mutex::new(Vec::with_capacity(catalog.len())));
        let concurrency = self.config.concurrency.max(1);

        stream::iter(catalog.to_vec())
            .for_each_concurrent(Some(concurrency), |object| {
                let orbital = self.orbital.clone();
                let results = results.clone();
                async move {
                    match orbital
                        .propagate_trajectory(object.id.as_str(), &object.tle.line1, &object.tle.line2, t_start, t_end, step)
                        .await
                    {
                        Ok(trajectory) => results.lock().await.push((object.id.clone(), trajectory)),
                        Err(err) => {
                            warn!(object_id = %object.id, error = %err, "catalog trajectory fetch failed");
                        }
                    }
                }
            })
            .await;

        Arc::try_unwrap(results)
            .expect("for_each_concurrent awaited every clone to completion")
            .into_inner()
    }

    async fn record_conjunction(
        &self,
        asset_id: &stellarops_types::SatelliteId,
        object_id: &TrackedObjectId,
        approach: ClosestApproach,
        created_at: DateTime<Utc>,
    ) -> bool {
        let tca = DateTime::<Utc>::from_timestamp(approach.timestamp, 0).unwrap_or(created_at);
        let relative_velocity_km_s = match (approach.asset_velocity, approach.object_velocity) {
            (Some(a), Some(b)) => {
                let dvx = a.vx_km_s - b.vx_km_s;
                let dvy = a.vy_km_s - b.vy_km_s;
                let dvz = a.vz_km_s - b.vz_km_s;
                (dvx * dvx + dvy * dvy + dvz * dvz).sqrt()
            }
            _ => 0.0,
        };

        let conjunction = Conjunction::new(
            ConjunctionId::new(self.clock.new_id()),
            asset_id.clone(),
            object_id.clone(),
            tca,
            approach.distance_km,
            relative_velocity_km_s,
            approach.asset_position,
            approach.object_position,
            created_at,
        );

        self.conjunctions.upsert(conjunction.clone()).await;
        info!(
            conjunction_id = %conjunction.id,
            asset_id = %asset_id,
            object_id = %object_id,
            miss_distance_km = approach.distance_km,
            "conjunction detected"
        );
        self.events
            .publish("ssa:conjunctions", Event::ConjunctionDetected(Arc::new(conjunction.clone())))
            .await;

        let severity = match conjunction.severity {
            ConjunctionSeverity::Critical => AlarmSeverity::Critical,
            ConjunctionSeverity::High => AlarmSeverity::Major,
            ConjunctionSeverity::Medium | ConjunctionSeverity::Low => AlarmSeverity::Minor,
        };
        self.alarms
            .raise(
                "conjunction_detected",
                severity,
                format!(
                    "{} vs {} at {:.3} km at {}",
                    asset_id, object_id, approach.distance_km, tca
                ),
                format!("conjunction:{}", conjunction.id),
                BTreeMap::new(),
            )
            .await;

        true
    }
}

/// Earliest-timestamp-wins tie-break, per spec: strictly-smaller distance
/// replaces the candidate, equal distance only replaces when earlier.
fn closest_approach(
    asset_points: &Map<i64, &stellarops_types::TrajectoryPoint>,
    object_trajectory: &Trajectory,
) -> Option<ClosestApproach> {
    let mut best: Option<ClosestApproach> = None;
    for point in &object_trajectory.points {
        let Some(asset_point) = asset_points.get(&point.timestamp) else {
            continue;
        };
        let distance_km = asset_point.position.distance_km(&point.position);
        let replace = match &best {
            None => true,
            Some(current) => {
                distance_km < current.distance_km
                    || (distance_km == current.distance_km && point.timestamp < current.timestamp)
            }
        };
        if replace {
            best = Some(ClosestApproach {
                timestamp: point.timestamp,
                distance_km,
                asset_position: asset_point.position,
                asset_velocity: asset_point.velocity,
                object_position: point.position,
                object_velocity: point.velocity,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalogStore;
    use crate::store::InMemoryConjunctionStore;
    use stellarops_breaker::BreakerRegistry;
    use stellarops_clock::FixedClock;
    use stellarops_orbital::MockOrbitalClient;
    use stellarops_types::{Event, Position, SatelliteId, SatelliteMode, TleSet};

    fn make_detector(threshold: f64) -> (Arc<Detector>, Arc<SatelliteFleet>, Arc<InMemoryCatalogStore>, Arc<InMemoryConjunctionStore>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(Utc::now()));
        let fleet = Arc::new(SatelliteFleet::new(clock.clone()));
        let orbital = Arc::new(BreakeredOrbitalClient::new(Arc::new(MockOrbitalClient), Arc::new(BreakerRegistry::default())));
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let conjunctions = Arc::new(InMemoryConjunctionStore::new());
        let events = EventBus::<Event>::default();
        let alarms_store = Arc::new(stellarops_alarms::InMemoryAlarmStore::new());
        let alarms = stellarops_alarms::spawn(alarms_store, clock.clone(), events.clone());

        let config = DetectorConfig {
            miss_distance_threshold_km: threshold,
            horizon_hours: 1.0,
            step_seconds: 60,
            concurrency: 4,
            ..Default::default()
        };
        let detector = Arc::new(Detector::new(
            fleet.clone(),
            orbital,
            catalog.clone(),
            conjunctions.clone(),
            alarms,
            events,
            clock,
            config,
        ));
        (detector, fleet, catalog, conjunctions)
    }

    fn tle(mean_motion: f64) -> TleSet {
        TleSet {
            line1: "1 00000U 00000A   00000.00000000  .00000000  00000-0  00000-0 0  0000".to_string(),
            line2: format!(
                "2 00000  51.6000 000.0000 0000000 000.0000 000.0000 {mean_motion:.8}"
            ),
            epoch: Utc::now(),
        }
    }

    #[tokio::test]
    async fn skips_cycle_when_no_assets_or_catalog() {
        let (detector, _fleet, _catalog, _conjunctions) = make_detector(10.0);
        assert_eq!(detector.run_cycle().await, 0);
    }

    #[tokio::test]
    async fn same_orbit_same_phase_is_flagged_as_a_conjunction() {
        let (detector, fleet, catalog, conjunctions) = make_detector(1_000_000.0);
        let id = SatelliteId::new("SAT-1");
        fleet.start(id.clone()).await;
        fleet.set_tle(&id, tle(15.5)).await;
        fleet.set_mode(&id, SatelliteMode::Nominal).await;
        tokio::task::yield_now().await;

        catalog
            .upsert(crate::catalog::TrackedObject {
                id: TrackedObjectId::new("DEBRIS-1"),
                name: "DEBRIS-1".to_string(),
                tle: tle(15.5),
            })
            .await;

        let detected = detector.run_cycle().await;
        assert_eq!(detected, 1);
        assert_eq!(conjunctions.list().await.len(), 1);
    }

    #[tokio::test]
    async fn distant_catalog_object_is_not_flagged() {
        let (detector, fleet, catalog, conjunctions) = make_detector(0.001);
        let id = SatelliteId::new("SAT-1");
        fleet.start(id.clone()).await;
        fleet.set_tle(&id, tle(15.5)).await;
        tokio::task::yield_now().await;

        catalog
            .upsert(crate::catalog::TrackedObject {
                id: TrackedObjectId::new("DEBRIS-1"),
                name: "DEBRIS-1".to_string(),
                tle: tle(14.0),
            })
            .await;

        let detected = detector.run_cycle().await;
        assert_eq!(detected, 0);
        assert!(conjunctions.list().await.is_empty());
    }

    #[test]
    fn closest_approach_prefers_earliest_timestamp_on_tie() {
        let p0 = stellarops_types::TrajectoryPoint {
            timestamp: 0,
            position: Position { x_km: 0.0, y_km: 0.0, z_km: 0.0 },
            velocity: None,
        };
        let p60 = stellarops_types::TrajectoryPoint {
            timestamp: 60,
            position: Position { x_km: 0.0, y_km: 0.0, z_km: 0.0 },
            velocity: None,
        };
        let asset_points: Map<i64, &stellarops_types::TrajectoryPoint> =
            [(0, &p0), (60, &p60)].into_iter().collect();
        let object_trajectory = Trajectory::new(
            60,
            vec![
                stellarops_types::TrajectoryPoint {
                    timestamp: 0,
                    position: Position { x_km: 5.0, y_km: 0.0, z_km: 0.0 },
                    velocity: None,
                },
                stellarops_types::TrajectoryPoint {
                    timestamp: 60,
                    position: Position { x_km: 5.0, y_km: 0.0, z_km: 0.0 },
                    velocity: None,
                },
            ],
        );
        let best = closest_approach(&asset_points, &object_trajectory).unwrap();
        assert_eq!(best.timestamp, 0);
    }
}
