//! Priority mission scheduler (spec §4.6).
//!
//! A `BinaryHeap` is a max-heap; [`SchedulerEntry`]'s `Ord` impl is written
//! backwards on purpose so that popping the heap's greatest element yields
//! the spec's min-first semantics: priority ascending
//! (critical<high<normal<low), deadline ascending with no-deadline last,
//! enqueue order ascending.

use crate::store::MissionStore;
use crate::validator::Validator;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stellarops_types::{Mission, MissionId, MissionPriority, MissionStatus};

/// Minimum back-off before re-attempting an ineligible mission, so the
/// scheduler doesn't busy-spin on a satellite that isn't ready yet.
pub const ADMISSION_BACKOFF: Duration = Duration::from_secs(5);

struct SchedulerEntry {
    mission_id: MissionId,
    priority: MissionPriority,
    deadline: Option<chrono::DateTime<Utc>>,
    enqueue_seq: u64,
    retry_after: Instant,
}

impl SchedulerEntry {
    fn sort_key(&self) -> (MissionPriority, chrono::DateTime<Utc>, u64) {
        (
            self.priority,
            self.deadline.unwrap_or(chrono::DateTime::<Utc>::MAX_UTC),
            self.enqueue_seq,
        )
    }
}

impl PartialEq for SchedulerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.mission_id == other.mission_id
    }
}
impl Eq for SchedulerEntry {}

impl PartialOrd for SchedulerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap::pop returns the Ord-greatest entry, and we
        // want that to be the logically smallest (highest-priority) one.
        other.sort_key().cmp(&self.sort_key())
    }
}

/// Priority queue over mission ids, backed by `MissionStore` for the
/// mission bodies admission needs to re-validate.
pub struct Scheduler {
    heap: Mutex<BinaryHeap<SchedulerEntry>>,
    next_seq: AtomicU64,
    store: Arc<dyn MissionStore>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn MissionStore>) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            next_seq: AtomicU64::new(0),
            store,
        }
    }

    /// Enqueues `mission`, assigning it the next enqueue sequence number
    /// (ascending enqueue order is the scheduler's final tiebreaker).
    pub fn enqueue(&self, mission: &Mission) {
        let enqueue_seq = self.next_seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.push(SchedulerEntry {
            mission_id: mission.id,
            priority: mission.priority,
            deadline: mission.deadline,
            enqueue_seq,
            retry_after: Instant::now(),
        });
    }

    fn push(&self, entry: SchedulerEntry) {
        self.heap.lock().expect("scheduler mutex poisoned").push(entry);
    }

    fn pop_ready(&self) -> Option<SchedulerEntry> {
        let mut heap = self.heap.lock().expect("scheduler mutex poisoned");
        match heap.peek() {
            Some(top) if top.retry_after <= Instant::now() => heap.pop(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().expect("scheduler mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pops entries in priority order, skipping any still in back-off,
    /// re-validates each against live satellite state, and transitions the
    /// first eligible mission `pending -> scheduled`, persisting and
    /// returning it. Ineligible missions are reinserted with a fresh
    /// back-off rather than dropped; a mission the store no longer has (e.g.
    /// canceled and removed) is silently skipped.
    pub async fn admit_next(&self, validator: &Validator) -> Option<Mission> {
        loop {
            let entry = self.pop_ready()?;
            let Ok(Some(mut mission)) = self.store.get(&entry.mission_id).await else {
                continue;
            };
            if mission.status != MissionStatus::Pending {
                continue;
            }

            let now = Utc::now();
            match validator.validate_for_execution(&mission, now).await {
                Ok(()) => {
                    if mission.transition_to(MissionStatus::Scheduled).is_ok() {
                        let _ = self.store.update(&mission).await;
                        return Some(mission);
                    }
                }
                Err(_) => self.push(SchedulerEntry {
                    retry_after: Instant::now() + ADMISSION_BACKOFF,
                    ..entry
                }),
            }
        }
    }

    /// Cancels a queued mission if present. Callers are responsible for the
    /// `Mission::transition_to(Canceled)` call and persisting it; this just
    /// drops the scheduler's own queue entry.
    pub fn remove(&self, mission_id: MissionId) {
        let mut heap = self.heap.lock().expect("scheduler mutex poisoned");
        let remaining: Vec<SchedulerEntry> = heap.drain().filter(|e| e.mission_id != mission_id).collect();
        *heap = remaining.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMissionStore;
    use crate::validator::{AlwaysOnlineDirectory, Validator};
    use stellarops_clock::{Clock, FixedClock};
    use stellarops_fleet::SatelliteFleet;
    use stellarops_types::SatelliteId;

    fn mission(priority: MissionPriority, deadline: Option<chrono::DateTime<Utc>>, seq_hint: u128) -> Mission {
        Mission {
            id: MissionId::new(uuid::Uuid::from_u128(seq_hint)),
            satellite_id: SatelliteId::new("SAT-1"),
            coa_id: None,
            mission_type: "station_keeping".to_string(),
            priority,
            status: MissionStatus::Pending,
            scheduled_start: None,
            deadline,
            required_energy: 0.0,
            required_memory: 0.0,
            required_bandwidth: 0.0,
            payload: Default::default(),
            retry_count: 0,
            max_retries: 3,
            created_at: Utc::now(),
            enqueue_seq: 0,
        }
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Arc::new(InMemoryMissionStore::new()))
    }

    #[test]
    fn pops_highest_priority_first() {
        let scheduler = scheduler();
        let low = mission(MissionPriority::Low, None, 1);
        let critical = mission(MissionPriority::Critical, None, 2);
        let normal = mission(MissionPriority::Normal, None, 3);
        scheduler.enqueue(&low);
        scheduler.enqueue(&critical);
        scheduler.enqueue(&normal);

        let mut heap = scheduler.heap.lock().unwrap();
        let first = heap.pop().unwrap();
        assert_eq!(first.mission_id, critical.id);
    }

    #[test]
    fn ties_on_priority_break_by_earlier_deadline_then_enqueue_order() {
        let scheduler = scheduler();
        let now = Utc::now();
        let later = mission(MissionPriority::Normal, Some(now + chrono::Duration::hours(2)), 1);
        let sooner = mission(MissionPriority::Normal, Some(now + chrono::Duration::hours(1)), 2);
        let no_deadline = mission(MissionPriority::Normal, None, 3);
        scheduler.enqueue(&later);
        scheduler.enqueue(&sooner);
        scheduler.enqueue(&no_deadline);

        let mut heap = scheduler.heap.lock().unwrap();
        assert_eq!(heap.pop().unwrap().mission_id, sooner.id);
        assert_eq!(heap.pop().unwrap().mission_id, later.id);
        assert_eq!(heap.pop().unwrap().mission_id, no_deadline.id);
    }

    #[test]
    fn remove_drops_the_matching_entry() {
        let scheduler = scheduler();
        let a = mission(MissionPriority::Normal, None, 1);
        let b = mission(MissionPriority::Normal, None, 2);
        scheduler.enqueue(&a);
        scheduler.enqueue(&b);
        scheduler.remove(a.id);
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test]
    async fn admit_next_transitions_pending_to_scheduled() {
        let store = Arc::new(InMemoryMissionStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(Utc::now()));
        let fleet = Arc::new(SatelliteFleet::new(clock));
        fleet.start(SatelliteId::new("SAT-1")).await;
        let validator = Validator::new(fleet, Arc::new(AlwaysOnlineDirectory));

        let scheduler = Scheduler::new(store.clone());
        let m = mission(MissionPriority::Normal, Some(Utc::now() + chrono::Duration::hours(1)), 1);
        store.save(&m).await.unwrap();
        scheduler.enqueue(&m);

        let admitted = scheduler.admit_next(&validator).await.unwrap();
        assert_eq!(admitted.status, MissionStatus::Scheduled);
    }
}
