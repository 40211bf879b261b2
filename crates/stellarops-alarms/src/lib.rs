//! Authoritative in-memory alarm index, persisted write-through, published
//! on the event bus (spec §4.1).

pub mod bus;
pub mod store;

pub use bus::{spawn, AlarmBusHandle, AlarmSummary, ListFilter, DEFAULT_RETENTION};
pub use store::{AlarmStore, InMemoryAlarmStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stellarops_clock::FixedClock;
    use stellarops_eventbus::EventBus;
    use stellarops_types::{AlarmSeverity, AlarmStatus, Event};

    fn handle() -> AlarmBusHandle {
        let store = Arc::new(InMemoryAlarmStore::new());
        let clock = Arc::new(FixedClock::at(chrono::Utc::now()));
        let events = EventBus::<Event>::default();
        spawn(store, clock, events)
    }

    #[tokio::test]
    async fn raise_inserts_into_the_index() {
        let bus = handle();
        let alarm = bus
            .raise(
                "energy_critical",
                AlarmSeverity::Critical,
                "energy below survival threshold",
                "satellite:SAT-1",
                Default::default(),
            )
            .await;
        assert_eq!(alarm.status, AlarmStatus::Active);

        let listed = bus.list(ListFilter::default()).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, alarm.id);
    }

    #[tokio::test]
    async fn raise_publishes_on_the_shared_event_bus() {
        let store = Arc::new(InMemoryAlarmStore::new());
        let clock = Arc::new(FixedClock::at(chrono::Utc::now()));
        let events = EventBus::<Event>::default();
        let sub = events.subscribe("alarms:all").await;
        let bus = spawn(store, clock, events);

        bus.raise(
            "energy_critical",
            AlarmSeverity::Critical,
            "msg",
            "satellite:SAT-1",
            Default::default(),
        )
        .await;

        let event = sub.recv().await;
        assert!(matches!(event, Event::AlarmRaised(_)));
    }

    #[tokio::test]
    async fn acknowledge_then_resolve_is_monotonic() {
        let bus = handle();
        let alarm = bus
            .raise("t", AlarmSeverity::Minor, "m", "satellite:SAT-1", Default::default())
            .await;

        let acked = bus.acknowledge(alarm.id, "operator-1").await.unwrap();
        assert_eq!(acked.status, AlarmStatus::Acknowledged);

        let resolved = bus.resolve(alarm.id).await.unwrap();
        assert_eq!(resolved.status, AlarmStatus::Resolved);

        // Re-acknowledging a resolved alarm is a no-op.
        let still_resolved = bus.acknowledge(alarm.id, "operator-2").await.unwrap();
        assert_eq!(still_resolved.status, AlarmStatus::Resolved);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_source_prefix() {
        let bus = handle();
        bus.raise("a", AlarmSeverity::Minor, "m", "satellite:SAT-1", Default::default())
            .await;
        let b = bus
            .raise("b", AlarmSeverity::Major, "m", "mission:M-1", Default::default())
            .await;
        bus.resolve(b.id).await;

        let active = bus
            .list(ListFilter {
                status: Some(AlarmStatus::Active),
                ..Default::default()
            })
            .await;
        assert_eq!(active.len(), 1);

        let satellite_only = bus
            .list(ListFilter {
                source_prefix: Some("satellite:".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(satellite_only.len(), 1);
    }

    #[tokio::test]
    async fn summary_counts_active_critical_and_major() {
        let bus = handle();
        bus.raise("a", AlarmSeverity::Critical, "m", "satellite:SAT-1", Default::default())
            .await;
        bus.raise("b", AlarmSeverity::Major, "m", "satellite:SAT-2", Default::default())
            .await;
        bus.raise("c", AlarmSeverity::Info, "m", "satellite:SAT-3", Default::default())
            .await;

        let summary = bus.summary().await;
        assert_eq!(summary.active_critical, 1);
        assert_eq!(summary.active_major, 1);
        assert_eq!(summary.by_status.get("active").copied().unwrap_or(0), 3);
    }

    #[tokio::test]
    async fn purge_resolved_removes_only_resolved_past_cutoff() {
        let store = Arc::new(InMemoryAlarmStore::new());
        let clock = Arc::new(FixedClock::at(chrono::Utc::now()));
        let events = EventBus::<Event>::default();
        let bus = spawn(store, clock.clone(), events);

        let a = bus
            .raise("a", AlarmSeverity::Minor, "m", "satellite:SAT-1", Default::default())
            .await;
        bus.resolve(a.id).await;

        let b = bus
            .raise("b", AlarmSeverity::Minor, "m", "satellite:SAT-2", Default::default())
            .await;
        // not resolved -- must survive purge regardless of cutoff

        clock.advance(chrono::Duration::seconds(3600));
        let cutoff = clock.now_utc();
        let deleted = bus.purge_resolved(Some(cutoff)).await;
        assert_eq!(deleted, 1);

        let remaining = bus.list(ListFilter::default()).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }
}
