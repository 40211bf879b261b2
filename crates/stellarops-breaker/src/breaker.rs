//! A single named circuit breaker (spec §4.3).

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use stellarops_types::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// A boxed, owned future — the shape `call`/`with_fallback` accept so
/// callers don't need to name their closure's future type.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub failure_window: Duration,
    pub reset_timeout: Duration,
}

impl BreakerConfig {
    pub const fn new(failure_threshold: u32, failure_window: Duration, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            failure_window,
            reset_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Default)]
pub struct BreakerCounters {
    pub success: AtomicU64,
    pub failure: AtomicU64,
    pub rejected: AtomicU64,
    pub fallback: AtomicU64,
}

struct Internal {
    state: BreakerState,
    opened_at: Option<Instant>,
    /// Sliding window of recent failure timestamps (closed-state only).
    recent_failures: VecDeque<Instant>,
}

/// A single named breaker guarding one downstream dependency.
pub struct CircuitBreaker {
    pub name: &'static str,
    pub config: BreakerConfig,
    inner: Mutex<Internal>,
    pub counters: BreakerCounters,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(Internal {
                state: BreakerState::Closed,
                opened_at: None,
                recent_failures: VecDeque::new(),
            }),
            counters: BreakerCounters::default(),
        }
    }

    pub async fn state(&self) -> BreakerState {
        let mut guard = self.inner.lock().await;
        self.refresh_state(&mut guard);
        guard.state
    }

    /// Best-effort, non-blocking hint for the degradation aggregator; the
    /// authoritative check always goes through [`Self::state`].
    pub fn is_open_sync_hint(&self) -> bool {
        self.inner
            .try_lock()
            .map(|g| g.state == BreakerState::Open)
            .unwrap_or(false)
    }

    fn refresh_state(&self, guard: &mut Internal) {
        if guard.state == BreakerState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.config.reset_timeout {
                    guard.state = BreakerState::HalfOpen;
                    info!(breaker = self.name, "transitioning open -> half_open");
                }
            }
        }
    }

    /// Run `f`, routing the call through this breaker's state machine.
    /// `fallback`, if present, is used whenever the breaker is open (instead
    /// of a `CircuitOpen` error) or when `f` itself errors.
    pub async fn call<T>(
        &self,
        f: impl FnOnce() -> BoxFuture<'static, Result<T, Error>>,
        fallback: Option<Box<dyn FnOnce() -> BoxFuture<'static, Result<T, Error>> + Send>>,
    ) -> Result<T, Error> {
        let admit = {
            let mut guard = self.inner.lock().await;
            self.refresh_state(&mut guard);
            match guard.state {
                BreakerState::Open => false,
                BreakerState::Closed | BreakerState::HalfOpen => true,
            }
        };

        if !admit {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(breaker = self.name, "call rejected, circuit open");
            if let Some(fallback) = fallback {
                self.counters.fallback.fetch_add(1, Ordering::Relaxed);
                return fallback().await;
            }
            return Err(Error::CircuitOpen(self.name.to_string()));
        }

        match f().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                self.counters.failure.fetch_add(1, Ordering::Relaxed);
                if let Some(fallback) = fallback {
                    self.counters.fallback.fetch_add(1, Ordering::Relaxed);
                    fallback().await
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn on_success(&self) {
        self.counters.success.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.lock().await;
        match guard.state {
            BreakerState::HalfOpen => {
                guard.state = BreakerState::Closed;
                guard.opened_at = None;
                guard.recent_failures.clear();
                info!(breaker = self.name, "half_open -> closed after success");
            }
            BreakerState::Closed => {
                guard.recent_failures.clear();
            }
            BreakerState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        match guard.state {
            BreakerState::HalfOpen => {
                guard.state = BreakerState::Open;
                guard.opened_at = Some(now);
                warn!(breaker = self.name, "half_open -> open after failure");
            }
            BreakerState::Closed => {
                let window = self.config.failure_window;
                guard.recent_failures.push_back(now);
                while let Some(&front) = guard.recent_failures.front() {
                    if now.duration_since(front) > window {
                        guard.recent_failures.pop_front();
                    } else {
                        break;
                    }
                }
                if guard.recent_failures.len() as u32 >= self.config.failure_threshold {
                    guard.state = BreakerState::Open;
                    guard.opened_at = Some(now);
                    guard.recent_failures.clear();
                    warn!(breaker = self.name, "closed -> open, failure threshold reached");
                }
            }
            BreakerState::Open => {}
        }
    }
}
