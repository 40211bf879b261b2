//! Mission executor (spec §4.6): drives an admitted mission
//! `scheduled -> running -> {completed, failed}`, with exponential
//! back-off retry and alarm reporting on failure.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stellarops_alarms::AlarmBusHandle;
use stellarops_clock::Clock;
use stellarops_eventbus::EventBus;
use stellarops_types::{AlarmSeverity, Event, Mission, MissionStatus};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::store::MissionStore;

/// Base back-off unit; a mission's Nth retry waits
/// `base * 2^(retry_count - 1)`, capped at [`MAX_RETRY_BACKOFF`].
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(2);
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);

/// Retry-count threshold at which a `mission_failure` alarm escalates from
/// warning to major (spec §4.6).
pub const MAJOR_RETRY_THRESHOLD: u32 = 3;

/// The actual work a mission performs. The executor only manages the status
/// machine, retries, and alarms — `MissionRunner` is where a COA burn, a
/// downlink, or any other mission-specific action actually happens.
#[async_trait]
pub trait MissionRunner: Send + Sync {
    async fn execute(&self, mission: &Mission) -> Result<(), String>;
}

/// Always succeeds; useful for mission types whose execution is a no-op
/// from the control plane's point of view (e.g. bookkeeping-only missions)
/// and in tests that only exercise the status machine.
#[derive(Debug, Default)]
pub struct NoopMissionRunner;

#[async_trait]
impl MissionRunner for NoopMissionRunner {
    async fn execute(&self, _mission: &Mission) -> Result<(), String> {
        Ok(())
    }
}

pub fn retry_backoff(base: Duration, retry_count: u32) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(16);
    let scaled = base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
    scaled.min(MAX_RETRY_BACKOFF)
}

pub struct Executor {
    store: Arc<dyn MissionStore>,
    clock: Arc<dyn Clock>,
    events: EventBus<Event>,
    alarms: AlarmBusHandle,
    runner: Arc<dyn MissionRunner>,
    semaphore: Arc<Semaphore>,
    retry_base: Duration,
}

impl Executor {
    pub fn new(
        store: Arc<dyn MissionStore>,
        clock: Arc<dyn Clock>,
        events: EventBus<Event>,
        alarms: AlarmBusHandle,
        runner: Arc<dyn MissionRunner>,
        max_concurrent_missions: usize,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            alarms,
            runner,
            semaphore: Arc::new(Semaphore::new(max_concurrent_missions.max(1))),
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Runs `mission` (already `scheduled`) to completion, honoring the
    /// concurrency bound. Returns the mission's final state: `completed`,
    /// terminally `failed`, or back to `scheduled` if a retry was queued —
    /// the caller (the scheduling loop in `stellarops-core`) is responsible
    /// for re-enqueuing a `scheduled` result.
    pub async fn run_mission(&self, mut mission: Mission) -> Mission {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");

        if mission.transition_to(MissionStatus::Running).is_err() {
            warn!(mission_id = %mission.id, status = ?mission.status, "executor received mission in unexpected state");
            return mission;
        }
        mission.scheduled_start.get_or_insert_with(|| self.clock.now_utc());
        self.persist_and_publish(&mission).await;

        match self.runner.execute(&mission).await {
            Ok(()) => {
                let _ = mission.transition_to(MissionStatus::Completed);
                info!(mission_id = %mission.id, "mission completed");
                self.persist_and_publish(&mission).await;
                mission
            }
            Err(reason) => self.handle_failure(mission, reason).await,
        }
    }

    async fn handle_failure(&self, mut mission: Mission, reason: String) -> Mission {
        let _ = mission.transition_to(MissionStatus::Failed);
        self.persist_and_publish(&mission).await;

        if mission.retry_count < mission.max_retries {
            mission.retry_count += 1;
            let severity = if mission.retry_count >= MAJOR_RETRY_THRESHOLD {
                AlarmSeverity::Major
            } else {
                AlarmSeverity::Warning
            };
            self.alarms
                .raise(
                    "mission_failure",
                    severity,
                    reason.clone(),
                    format!("mission:{}", mission.id),
                    Default::default(),
                )
                .await;

            let backoff = retry_backoff(self.retry_base, mission.retry_count);
            warn!(mission_id = %mission.id, retry_count = mission.retry_count, backoff_ms = backoff.as_millis() as u64, "retrying mission after back-off");
            tokio::time::sleep(backoff).await;

            let _ = mission.transition_to(MissionStatus::Scheduled);
            self.persist_and_publish(&mission).await;
            mission
        } else {
            self.alarms
                .raise(
                    "mission_permanent_failure",
                    AlarmSeverity::Critical,
                    reason.clone(),
                    format!("mission:{}", mission.id),
                    Default::default(),
                )
                .await;
            self.events
                .publish(
                    "missions:*",
                    Event::MissionPermanentFailure {
                        mission_id: mission.id,
                        reason,
                    },
                )
                .await;
            mission
        }
    }

    /// Cooperative cancellation: only legal while the mission is
    /// `pending`/`scheduled` (spec §4.6). Canceling an already-canceled
    /// mission is a no-op rather than an error.
    pub async fn cancel(&self, mut mission: Mission) -> Result<Mission, stellarops_types::Error> {
        if mission.status == MissionStatus::Canceled {
            return Ok(mission);
        }
        if !mission.is_cancelable() {
            return Err(stellarops_types::Error::invalid_state(format!(
                "mission {} cannot be canceled from {:?}",
                mission.id, mission.status
            )));
        }
        mission.transition_to(MissionStatus::Canceled)?;
        self.persist_and_publish(&mission).await;
        Ok(mission)
    }

    async fn persist_and_publish(&self, mission: &Mission) {
        if let Err(err) = self.store.update(mission).await {
            warn!(mission_id = %mission.id, error = %err, "mission persist failed");
        }
        self.events
            .publish(
                "missions:*",
                Event::MissionStatusChanged {
                    mission_id: mission.id,
                    mission: Arc::new(mission.clone()),
                },
            )
            .await;
    }
}
