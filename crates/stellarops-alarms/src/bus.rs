//! The alarm bus task: a single owner of the alarm index, serialized via a
//! request queue, plus the `AlarmBusHandle` callers actually hold (spec
//! §4.1, §5: "single-owner index, serialized via a request queue").

use crate::store::AlarmStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use stellarops_clock::Clock;
use stellarops_eventbus::EventBus;
use stellarops_types::{Alarm, AlarmId, AlarmSeverity, AlarmStatus, Event};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Default retention window for `purge_resolved` when the caller doesn't
/// supply an explicit `older_than` (spec §6 config).
pub const DEFAULT_RETENTION: chrono::Duration = chrono::Duration::seconds(7 * 24 * 3600);

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<AlarmStatus>,
    pub severity: Option<AlarmSeverity>,
    pub source_prefix: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AlarmSummary {
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub active_critical: usize,
    pub active_major: usize,
}

enum Request {
    Raise {
        alarm_type: String,
        severity: AlarmSeverity,
        message: String,
        source: String,
        details: BTreeMap<String, serde_json::Value>,
        reply: oneshot::Sender<Alarm>,
    },
    Acknowledge {
        id: AlarmId,
        user: String,
        reply: oneshot::Sender<Option<Alarm>>,
    },
    Resolve {
        id: AlarmId,
        reply: oneshot::Sender<Option<Alarm>>,
    },
    List {
        filter: ListFilter,
        reply: oneshot::Sender<Vec<Alarm>>,
    },
    Summary {
        reply: oneshot::Sender<AlarmSummary>,
    },
    PurgeResolved {
        older_than: Option<DateTime<Utc>>,
        reply: oneshot::Sender<usize>,
    },
}

/// Cheaply cloneable handle to the alarm bus task.
#[derive(Clone)]
pub struct AlarmBusHandle {
    tx: mpsc::Sender<Request>,
}

impl AlarmBusHandle {
    pub async fn raise(
        &self,
        alarm_type: impl Into<String>,
        severity: AlarmSeverity,
        message: impl Into<String>,
        source: impl Into<String>,
        details: BTreeMap<String, serde_json::Value>,
    ) -> Alarm {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Request::Raise {
                alarm_type: alarm_type.into(),
                severity,
                message: message.into(),
                source: source.into(),
                details,
                reply,
            })
            .await;
        rx.await.expect("alarm bus task is alive")
    }

    pub async fn acknowledge(&self, id: AlarmId, user: impl Into<String>) -> Option<Alarm> {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Request::Acknowledge {
                id,
                user: user.into(),
                reply,
            })
            .await;
        rx.await.expect("alarm bus task is alive")
    }

    pub async fn resolve(&self, id: AlarmId) -> Option<Alarm> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Request::Resolve { id, reply }).await;
        rx.await.expect("alarm bus task is alive")
    }

    pub async fn list(&self, filter: ListFilter) -> Vec<Alarm> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Request::List { filter, reply }).await;
        rx.await.expect("alarm bus task is alive")
    }

    pub async fn summary(&self) -> AlarmSummary {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Request::Summary { reply }).await;
        rx.await.expect("alarm bus task is alive")
    }

    pub async fn purge_resolved(&self, older_than: Option<DateTime<Utc>>) -> usize {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Request::PurgeResolved { older_than, reply })
            .await;
        rx.await.expect("alarm bus task is alive")
    }
}

/// Spawns the bus task and returns a handle to it. `store` backs every
/// mutation with write-through persistence that degrades to a warning log
/// on failure rather than blocking the caller.
pub fn spawn(
    store: Arc<dyn AlarmStore>,
    clock: Arc<dyn Clock>,
    events: EventBus<Event>,
) -> AlarmBusHandle {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(run(rx, store, clock, events));
    AlarmBusHandle { tx }
}

async fn run(
    mut rx: mpsc::Receiver<Request>,
    store: Arc<dyn AlarmStore>,
    clock: Arc<dyn Clock>,
    events: EventBus<Event>,
) {
    let mut alarms: std::collections::HashMap<AlarmId, Alarm> = std::collections::HashMap::new();

    while let Some(req) = rx.recv().await {
        match req {
            Request::Raise {
                alarm_type,
                severity,
                message,
                source,
                details,
                reply,
            } => {
                let alarm = Alarm::new(
                    AlarmId::new(clock.new_id()),
                    alarm_type,
                    severity,
                    message,
                    source,
                    details,
                    clock.now_utc(),
                );
                if let Err(err) = store.save(&alarm).await {
                    warn!(alarm_id = %alarm.id, error = %err, "alarm persist failed, degrading to in-memory-only");
                }
                alarms.insert(alarm.id, alarm.clone());
                let topic = format!("alarms:{}", alarm.source_kind().unwrap_or("unknown"));
                events.publish("alarms:all", Event::AlarmRaised(Arc::new(alarm.clone()))).await;
                events.publish(topic, Event::AlarmRaised(Arc::new(alarm.clone()))).await;
                let _ = reply.send(alarm);
            }
            Request::Acknowledge { id, user, reply } => {
                let Some(alarm) = alarms.get_mut(&id) else {
                    let _ = reply.send(None);
                    continue;
                };
                alarm.acknowledge(user, clock.now_utc());
                let alarm = alarm.clone();
                if let Err(err) = store.update(&alarm).await {
                    warn!(alarm_id = %alarm.id, error = %err, "alarm persist failed, degrading to in-memory-only");
                }
                events.publish("alarms:all", Event::AlarmAcknowledged(Arc::new(alarm.clone()))).await;
                let _ = reply.send(Some(alarm));
            }
            Request::Resolve { id, reply } => {
                let Some(alarm) = alarms.get_mut(&id) else {
                    let _ = reply.send(None);
                    continue;
                };
                alarm.resolve(clock.now_utc());
                let alarm = alarm.clone();
                if let Err(err) = store.update(&alarm).await {
                    warn!(alarm_id = %alarm.id, error = %err, "alarm persist failed, degrading to in-memory-only");
                }
                events.publish("alarms:all", Event::AlarmResolved(Arc::new(alarm.clone()))).await;
                let _ = reply.send(Some(alarm));
            }
            Request::List { filter, reply } => {
                let mut matches: Vec<Alarm> = alarms
                    .values()
                    .filter(|a| filter.status.map_or(true, |s| s == a.status))
                    .filter(|a| filter.severity.map_or(true, |s| s == a.severity))
                    .filter(|a| {
                        filter
                            .source_prefix
                            .as_ref()
                            .map_or(true, |p| a.source.starts_with(p.as_str()))
                    })
                    .cloned()
                    .collect();
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                if let Some(limit) = filter.limit {
                    matches.truncate(limit);
                }
                let _ = reply.send(matches);
            }
            Request::Summary { reply } => {
                let mut summary = AlarmSummary::default();
                for alarm in alarms.values() {
                    *summary.by_status.entry(status_label(alarm.status)).or_insert(0) += 1;
                    *summary.by_severity.entry(severity_label(alarm.severity)).or_insert(0) += 1;
                    if alarm.status == AlarmStatus::Active {
                        match alarm.severity {
                            AlarmSeverity::Critical => summary.active_critical += 1,
                            AlarmSeverity::Major => summary.active_major += 1,
                            _ => {}
                        }
                    }
                }
                let _ = reply.send(summary);
            }
            Request::PurgeResolved { older_than, reply } => {
                let cutoff = older_than.unwrap_or_else(|| clock.now_utc() - DEFAULT_RETENTION);
                let deleted_ids = match store.delete_older_than(cutoff).await {
                    Ok(ids) => ids,
                    Err(err) => {
                        warn!(error = %err, "alarm store purge failed");
                        Vec::new()
                    }
                };
                let mut count = 0;
                for id in &deleted_ids {
                    if alarms.remove(id).is_some() {
                        count += 1;
                    }
                }
                // Catch anything resolved-and-stale that the store missed
                // (e.g. the in-memory degraded path never persisted it).
                let stragglers: Vec<AlarmId> = alarms
                    .values()
                    .filter(|a| a.status == AlarmStatus::Resolved && a.resolved_at.unwrap_or(a.created_at) < cutoff)
                    .map(|a| a.id)
                    .collect();
                for id in stragglers {
                    alarms.remove(&id);
                    count += 1;
                }
                let _ = reply.send(count);
            }
        }
    }
}

fn status_label(status: AlarmStatus) -> &'static str {
    match status {
        AlarmStatus::Active => "active",
        AlarmStatus::Acknowledged => "acknowledged",
        AlarmStatus::Resolved => "resolved",
    }
}

fn severity_label(severity: AlarmSeverity) -> &'static str {
    match severity {
        AlarmSeverity::Info => "info",
        AlarmSeverity::Warning => "warning",
        AlarmSeverity::Minor => "minor",
        AlarmSeverity::Major => "major",
        AlarmSeverity::Critical => "critical",
    }
}
