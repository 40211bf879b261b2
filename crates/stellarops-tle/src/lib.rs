//! TLE freshness watcher (spec §4.10).
//!
//! The stats computation is a pure function of the fleet snapshot so it is
//! unit-testable without a running alarm bus; [`TleWatcher`] is the thin,
//! impure wrapper invoked after each external TLE ingest cycle.

use std::collections::BTreeMap;
use stellarops_alarms::AlarmBusHandle;
use stellarops_types::{AlarmSeverity, Satellite};
use tracing::info;

/// Threshold past which a satellite's TLE counts as stale (spec §4.10: 24h).
pub const DEFAULT_FRESHNESS_THRESHOLD: chrono::Duration = chrono::Duration::hours(24);

/// Stale fraction above which staleness escalates to a major alarm.
pub const CRITICAL_STALE_FRACTION_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreshnessStats {
    pub total: usize,
    pub with_tle: usize,
    pub fresh: usize,
    pub stale: usize,
    pub never_updated: usize,
}

impl FreshnessStats {
    pub fn stale_fraction_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.stale as f64 / self.total as f64
        }
    }
}

/// Classifies every satellite in `satellites` as fresh, stale, or never
/// having received a TLE, relative to `now - threshold`.
pub fn compute_freshness(
    satellites: &[Satellite],
    now: chrono::DateTime<chrono::Utc>,
    threshold: chrono::Duration,
) -> FreshnessStats {
    let mut stats = FreshnessStats {
        total: satellites.len(),
        ..Default::default()
    };
    for satellite in satellites {
        match &satellite.tle {
            None => stats.never_updated += 1,
            Some(tle) => {
                stats.with_tle += 1;
                if now - tle.epoch < threshold {
                    stats.fresh += 1;
                } else {
                    stats.stale += 1;
                }
            }
        }
    }
    stats
}

pub struct TleWatcher {
    alarms: AlarmBusHandle,
    threshold: chrono::Duration,
}

impl TleWatcher {
    pub fn new(alarms: AlarmBusHandle) -> Self {
        Self {
            alarms,
            threshold: DEFAULT_FRESHNESS_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: chrono::Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Computes freshness over `satellites` and raises graduated alarms.
    /// Invoked after each external TLE ingest cycle (ingest itself is out of
    /// scope per §4.10).
    pub async fn check(&self, satellites: &[Satellite], now: chrono::DateTime<chrono::Utc>) -> FreshnessStats {
        let stats = compute_freshness(satellites, now, self.threshold);
        info!(
            total = stats.total,
            fresh = stats.fresh,
            stale = stats.stale,
            never_updated = stats.never_updated,
            "TLE freshness check"
        );

        if stats.stale > 0 {
            self.alarms
                .raise(
                    "stale_tle_data",
                    AlarmSeverity::Warning,
                    format!("{} of {} satellites have a stale TLE", stats.stale, stats.total),
                    "tle_watcher".to_string(),
                    BTreeMap::new(),
                )
                .await;
        }

        if stats.stale_fraction_pct() > CRITICAL_STALE_FRACTION_PCT {
            self.alarms
                .raise(
                    "critical_tle_staleness",
                    AlarmSeverity::Major,
                    format!("{:.1}% of satellites have a stale TLE", stats.stale_fraction_pct()),
                    "tle_watcher".to_string(),
                    BTreeMap::new(),
                )
                .await;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_types::{Position, SatelliteId, SatelliteMode, TleSet};

    fn satellite_with_tle(id: &str, epoch: chrono::DateTime<chrono::Utc>) -> Satellite {
        Satellite {
            id: SatelliteId::new(id),
            mode: SatelliteMode::Nominal,
            energy: 100.0,
            memory_used: 0.0,
            position: Position::ORIGIN,
            tle: Some(TleSet {
                line1: "1 00000U".to_string(),
                line2: "2 00000".to_string(),
                epoch,
            }),
            mass_kg: 500.0,
            created_at: epoch,
            checkpointed_at: None,
        }
    }

    fn satellite_without_tle(id: &str, now: chrono::DateTime<chrono::Utc>) -> Satellite {
        Satellite::new(SatelliteId::new(id), now)
    }

    #[test]
    fn classifies_fresh_stale_and_never_updated() {
        let now = chrono::Utc::now();
        let satellites = vec![
            satellite_with_tle("SAT-1", now - chrono::Duration::hours(1)),
            satellite_with_tle("SAT-2", now - chrono::Duration::hours(48)),
            satellite_without_tle("SAT-3", now),
        ];
        let stats = compute_freshness(&satellites, now, DEFAULT_FRESHNESS_THRESHOLD);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_tle, 2);
        assert_eq!(stats.fresh, 1);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.never_updated, 1);
    }

    #[test]
    fn stale_fraction_is_a_percentage_of_total() {
        let now = chrono::Utc::now();
        let satellites = vec![
            satellite_with_tle("SAT-1", now - chrono::Duration::hours(48)),
            satellite_with_tle("SAT-2", now - chrono::Duration::hours(48)),
            satellite_with_tle("SAT-3", now),
        ];
        let stats = compute_freshness(&satellites, now, DEFAULT_FRESHNESS_THRESHOLD);
        assert!((stats.stale_fraction_pct() - 66.666_666_666_666_66).abs() < 1e-6);
    }

    #[tokio::test]
    async fn check_raises_warning_for_any_stale_and_major_past_50_percent() {
        let clock: std::sync::Arc<dyn stellarops_clock::Clock> =
            std::sync::Arc::new(stellarops_clock::FixedClock::at(chrono::Utc::now()));
        let events = stellarops_eventbus::EventBus::<stellarops_types::Event>::default();
        let alarms_store = std::sync::Arc::new(stellarops_alarms::InMemoryAlarmStore::new());
        let alarms = stellarops_alarms::spawn(alarms_store, clock.clone(), events);
        let watcher = TleWatcher::new(alarms.clone());

        let now = clock.now_utc();
        let satellites = vec![
            satellite_with_tle("SAT-1", now - chrono::Duration::hours(48)),
            satellite_with_tle("SAT-2", now - chrono::Duration::hours(48)),
            satellite_with_tle("SAT-3", now),
        ];
        watcher.check(&satellites, now).await;

        let summary = alarms.summary().await;
        assert_eq!(*summary.by_status.get("active").unwrap_or(&0), 2);
    }
}
