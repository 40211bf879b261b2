//! Clock & id minting (spec §2: "injected everywhere for testability").
//!
//! Every component that needs `now()` or a fresh id takes a `Clock` handle
//! rather than calling `Utc::now()`/`Uuid::new_v4()` directly, so tests can
//! swap in [`FixedClock`] and drive deterministic scenarios (spec §8's
//! end-to-end scenarios all depend on this).

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// A monotonic + wall-clock time source plus id minting.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_utc(&self) -> DateTime<Utc>;
    fn monotonic_now(&self) -> Instant;
    fn new_id(&self) -> Uuid;
}

/// Production clock: real wall-clock time, real monotonic instants, random
/// v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }

    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic clock for tests: wall-clock time is settable and only
/// advances when told to; ids are sequential rather than random so test
/// assertions can reference them by index.
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
    monotonic_origin: Instant,
    elapsed_ms: AtomicI64,
    next_id: AtomicI64,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
            monotonic_origin: Instant::now(),
            elapsed_ms: AtomicI64::new(0),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += delta;
        self.elapsed_ms
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    fn monotonic_now(&self) -> Instant {
        self.monotonic_origin
            + std::time::Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst).max(0) as u64)
    }

    fn new_id(&self) -> Uuid {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u128(n as u128)
    }
}
