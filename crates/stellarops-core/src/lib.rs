//! Supervising wiring for the StellarOps control-plane core.
//!
//! [`System::bootstrap`] starts every component in the dependency order of
//! spec §6 (Clock -> Event Bus -> Alarm Bus -> Satellite Fleet -> Breakers
//! -> Orbital Client -> Mission Scheduler -> Mission Executor -> Conjunction
//! Detector -> COA Planner -> COA Executor -> TLE Watcher) and
//! [`System::spawn_background_tasks`] starts the long-running loops that
//! glue them together over the event bus.

pub mod config;

use std::sync::Arc;
use std::time::Duration;
use stellarops_alarms::AlarmBusHandle;
use stellarops_breaker::BreakerRegistry;
use stellarops_clock::{Clock, SystemClock};
use stellarops_coa::executor::CoaExecutor;
use stellarops_coa::generator::CoaGenerator;
use stellarops_coa::store::InMemoryCoaStore;
use stellarops_conjunction::detector::{Detector, DetectorConfig};
use stellarops_conjunction::{CatalogStore, ConjunctionStore, InMemoryCatalogStore, InMemoryConjunctionStore};
use stellarops_eventbus::EventBus;
use stellarops_fleet::SatelliteFleet;
use stellarops_missions::{AlwaysOnlineDirectory, Executor as MissionExecutor, InMemoryMissionStore, MissionStore, NoopMissionRunner, Scheduler, Validator};
use stellarops_orbital::{BreakeredOrbitalClient, HttpOrbitalClient, MockOrbitalClient, OrbitalClient};
use stellarops_types::{Event, MissionStatus};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;

/// One line per started component (spec §6: "Each component must report
/// readiness").
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub entries: Vec<(&'static str, bool)>,
}

impl ReadinessReport {
    pub fn all_ready(&self) -> bool {
        self.entries.iter().all(|(_, ready)| *ready)
    }
}

/// Every component this core wires, held long enough to spawn the
/// background tasks that connect them.
pub struct System {
    pub clock: Arc<dyn Clock>,
    pub events: EventBus<Event>,
    pub alarms: AlarmBusHandle,
    pub fleet: Arc<SatelliteFleet>,
    pub breakers: Arc<BreakerRegistry>,
    pub orbital: Arc<BreakeredOrbitalClient>,
    pub mission_store: Arc<dyn MissionStore>,
    pub scheduler: Arc<Scheduler>,
    pub validator: Arc<Validator>,
    pub mission_executor: Arc<MissionExecutor>,
    pub catalog: Arc<dyn CatalogStore>,
    pub conjunctions: Arc<dyn ConjunctionStore>,
    pub detector: Arc<Detector>,
    pub coa_store: Arc<InMemoryCoaStore>,
    pub coa_generator: Arc<CoaGenerator>,
    pub coa_executor: Arc<CoaExecutor>,
    pub tle_watcher: Arc<stellarops_tle::TleWatcher>,
    pub config: AppConfig,
}

impl System {
    /// Constructs every component in dependency order. Nothing is spawned
    /// yet; call [`System::spawn_background_tasks`] once the caller is
    /// ready to start the long-running loops.
    pub fn bootstrap(config: AppConfig) -> (Self, ReadinessReport) {
        let mut readiness = Vec::new();

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        readiness.push(("clock", true));

        let events = EventBus::<Event>::default();
        readiness.push(("event_bus", true));

        let alarm_store = Arc::new(stellarops_alarms::InMemoryAlarmStore::new());
        let alarms = stellarops_alarms::spawn(alarm_store, clock.clone(), events.clone());
        readiness.push(("alarm_bus", true));

        let fleet = Arc::new(SatelliteFleet::new(clock.clone()));
        readiness.push(("satellite_fleet", true));

        let breakers = Arc::new(BreakerRegistry::default());
        readiness.push(("breakers", true));

        let inner_orbital: Arc<dyn OrbitalClient> = match &config.orbital.base_url {
            Some(url) => {
                info!(base_url = %url, "using HTTP orbital client");
                Arc::new(HttpOrbitalClient::new(url.clone()))
            }
            None => {
                info!("no orbital base_url configured, using the deterministic mock client");
                Arc::new(MockOrbitalClient)
            }
        };
        let orbital = Arc::new(BreakeredOrbitalClient::new(inner_orbital, breakers.clone()));
        readiness.push(("orbital_client", true));

        let mission_store: Arc<dyn MissionStore> = Arc::new(InMemoryMissionStore::new());
        let scheduler = Arc::new(Scheduler::new(mission_store.clone()));
        readiness.push(("mission_scheduler", true));

        let validator = Arc::new(Validator::new(fleet.clone(), Arc::new(AlwaysOnlineDirectory)));
        let mission_executor = Arc::new(MissionExecutor::new(
            mission_store.clone(),
            clock.clone(),
            events.clone(),
            alarms.clone(),
            Arc::new(NoopMissionRunner),
            config.mission_executor.max_concurrent_missions,
        ));
        readiness.push(("mission_executor", true));

        let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let conjunctions: Arc<dyn ConjunctionStore> = Arc::new(InMemoryConjunctionStore::new());
        let detector = Arc::new(Detector::new(
            fleet.clone(),
            orbital.clone(),
            catalog.clone(),
            conjunctions.clone(),
            alarms.clone(),
            events.clone(),
            clock.clone(),
            config.detector.clone().into(),
        ));
        readiness.push(("conjunction_detector", true));

        let coa_store = Arc::new(InMemoryCoaStore::new());
        let coa_generator = Arc::new(
            CoaGenerator::new(fleet.clone(), coa_store.clone(), events.clone(), clock.clone())
                .with_lead_time_hours(config.coa_planner.maneuver_lead_time_hours),
        );
        readiness.push(("coa_planner", true));

        let coa_executor = Arc::new(CoaExecutor::new(
            coa_store.clone(),
            conjunctions.clone(),
            mission_store.clone(),
            scheduler.clone(),
            alarms.clone(),
            events.clone(),
            clock.clone(),
        ));
        readiness.push(("coa_executor", true));

        let tle_watcher = Arc::new(
            stellarops_tle::TleWatcher::new(alarms.clone())
                .with_threshold(chrono::Duration::hours(config.tle_watcher.stale_threshold_hours)),
        );
        readiness.push(("tle_watcher", true));

        (
            Self {
                clock,
                events,
                alarms,
                fleet,
                breakers,
                orbital,
                mission_store,
                scheduler,
                validator,
                mission_executor,
                catalog,
                conjunctions,
                detector,
                coa_store,
                coa_generator,
                coa_executor,
                tle_watcher,
                config,
            },
            ReadinessReport { entries: readiness },
        )
    }

    /// Starts the detector's own periodic loop plus the glue tasks that
    /// aren't owned by a single component: mission admission/execution,
    /// COA generation off `ssa:conjunctions`, COA execution off
    /// `missions:*`, periodic TLE freshness checks, and alarm retention.
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![self.detector.clone().spawn()];
        handles.push(self.spawn_mission_loop());
        handles.push(self.spawn_coa_generation_loop());
        handles.push(self.spawn_coa_execution_loop());
        handles.push(self.spawn_tle_watch_loop());
        handles.push(self.spawn_alarm_retention_loop());
        handles
    }

    /// Pops admitted missions off the scheduler and drives them to
    /// completion; a mission that comes back `scheduled` (i.e. a retry was
    /// queued) is re-enqueued. The scheduler polls rather than blocks, so
    /// an empty queue backs off briefly instead of busy-spinning.
    fn spawn_mission_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let system = self.clone();
        tokio::spawn(async move {
            loop {
                match system.scheduler.admit_next(&system.validator).await {
                    Some(mission) => {
                        let after = system.mission_executor.run_mission(mission).await;
                        if after.status == MissionStatus::Scheduled {
                            system.scheduler.enqueue(&after);
                        }
                    }
                    None => tokio::time::sleep(Duration::from_millis(200)).await,
                }
            }
        })
    }

    /// On `ConjunctionDetected`, synthesizes and persists COA candidates.
    fn spawn_coa_generation_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let system = self.clone();
        tokio::spawn(async move {
            let sub = system.events.subscribe("ssa:conjunctions").await;
            loop {
                if let Event::ConjunctionDetected(conjunction) = sub.recv().await {
                    system.coa_generator.generate(&conjunction).await;
                }
            }
        })
    }

    /// Drives `CoaExecutor::handle_mission_complete`/`handle_mission_failure`
    /// off `missions:*`, decoupling the COA executor from the mission
    /// executor per the actor-per-component model (spec §5).
    fn spawn_coa_execution_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let system = self.clone();
        tokio::spawn(async move {
            let sub = system.events.subscribe("missions:*").await;
            loop {
                match sub.recv().await {
                    Event::MissionStatusChanged { mission, .. } if mission.status == MissionStatus::Completed => {
                        system.coa_executor.handle_mission_complete(&mission).await;
                    }
                    Event::MissionPermanentFailure { mission_id, reason } => {
                        match system.mission_store.get(&mission_id).await {
                            Ok(Some(mission)) => {
                                system.coa_executor.handle_mission_failure(&mission, reason).await;
                            }
                            _ => warn!(%mission_id, "permanent mission failure for an id this core no longer has"),
                        }
                    }
                    _ => {}
                }
            }
        })
    }

    fn spawn_tle_watch_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let system = self.clone();
        let interval = Duration::from_secs(system.config.tle_watcher.check_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let satellites = system.fleet.list_states().await;
                let now = system.clock.now_utc();
                system.tle_watcher.check(&satellites, now).await;
            }
        })
    }

    fn spawn_alarm_retention_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let system = self.clone();
        let interval = Duration::from_secs(system.config.alarm_bus.purge_interval_secs);
        let retention = chrono::Duration::seconds(system.config.alarm_bus.retention_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let cutoff = system.clock.now_utc() - retention;
                let deleted = system.alarms.purge_resolved(Some(cutoff)).await;
                if deleted > 0 {
                    info!(deleted, "purged resolved alarms past retention");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_coa::store::CoaStore;

    #[test]
    fn bootstrap_reports_every_component_ready() {
        let (_, readiness) = System::bootstrap(AppConfig::default());
        assert!(readiness.all_ready());
        assert_eq!(readiness.entries.len(), 12);
    }

    #[tokio::test]
    async fn conjunction_detected_flows_through_to_persisted_coas() {
        let (system, _) = System::bootstrap(AppConfig::default());
        let system = Arc::new(system);
        let _handle = system.spawn_coa_generation_loop();

        let id = stellarops_types::SatelliteId::new("SAT-1");
        system.fleet.start(id.clone()).await;
        system
            .fleet
            .set_tle(
                &id,
                stellarops_types::TleSet {
                    line1: "1 00000U".to_string(),
                    line2: "2 00000  51.6000 000.0000 0000000 000.0000 000.0000 15.50000000000000".to_string(),
                    epoch: system.clock.now_utc(),
                },
            )
            .await;
        tokio::task::yield_now().await;

        let conjunction = stellarops_types::Conjunction::new(
            stellarops_types::ConjunctionId::new(system.clock.new_id()),
            id,
            stellarops_types::TrackedObjectId::new("DEBRIS-1"),
            system.clock.now_utc() + chrono::Duration::hours(5),
            0.8,
            1.0,
            stellarops_types::Position::ORIGIN,
            stellarops_types::Position::ORIGIN,
            system.clock.now_utc(),
        );
        system.events.publish("ssa:conjunctions", Event::ConjunctionDetected(Arc::new(conjunction.clone()))).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if !system.coa_store.list_by_conjunction(&conjunction.id).await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("COAs were generated for the published conjunction");
    }
}
