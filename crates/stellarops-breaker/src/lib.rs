//! Circuit breakers, degradation-mode aggregation, and cache-backed
//! fallbacks guarding outbound calls to external services (spec §4.3).

pub mod breaker;
pub mod fallback;
pub mod registry;

pub use breaker::{BoxFuture, BreakerConfig, BreakerCounters, BreakerState, CircuitBreaker};
pub use fallback::{with_fallback, FallbackOptions, TtlCache};
pub use registry::{BreakerRegistry, OperationalMode};
