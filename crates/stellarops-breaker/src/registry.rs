//! Named breaker registry and degradation-mode aggregation (spec §4.3).

use crate::breaker::{BreakerConfig, BreakerState, CircuitBreaker};
use std::time::Duration;

/// Overall system degradation, derived from breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalMode {
    Full,
    Degraded,
    Critical,
    Emergency,
}

/// The four named breakers this core always wires: `orbital` (the
/// strictest — threshold 3, 30s window, 15s reset), `celestrak`,
/// `spacetrack`, `intel`.
pub struct BreakerRegistry {
    pub orbital: CircuitBreaker,
    pub celestrak: CircuitBreaker,
    pub spacetrack: CircuitBreaker,
    pub intel: CircuitBreaker,
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self {
            orbital: CircuitBreaker::new(
                "orbital",
                BreakerConfig::new(3, Duration::from_secs(30), Duration::from_secs(15)),
            ),
            celestrak: CircuitBreaker::new(
                "celestrak",
                BreakerConfig::new(5, Duration::from_secs(60), Duration::from_secs(30)),
            ),
            spacetrack: CircuitBreaker::new(
                "spacetrack",
                BreakerConfig::new(5, Duration::from_secs(60), Duration::from_secs(30)),
            ),
            intel: CircuitBreaker::new(
                "intel",
                BreakerConfig::new(5, Duration::from_secs(120), Duration::from_secs(60)),
            ),
        }
    }
}

impl BreakerRegistry {
    pub fn by_name(&self, name: &str) -> Option<&CircuitBreaker> {
        match name {
            "orbital" => Some(&self.orbital),
            "celestrak" => Some(&self.celestrak),
            "spacetrack" => Some(&self.spacetrack),
            "intel" => Some(&self.intel),
            _ => None,
        }
    }

    /// `orbital` open always forces `critical`, regardless of how many
    /// other breakers are open (spec §4.3).
    pub async fn operational_mode(&self) -> OperationalMode {
        let orbital_open = self.orbital.state().await == BreakerState::Open;
        let mut open_count = 0;
        for b in [&self.celestrak, &self.spacetrack, &self.intel] {
            if b.state().await == BreakerState::Open {
                open_count += 1;
            }
        }
        if orbital_open {
            return OperationalMode::Critical;
        }
        match open_count {
            0 => OperationalMode::Full,
            1 => OperationalMode::Degraded,
            2 => OperationalMode::Critical,
            _ => OperationalMode::Emergency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BoxFuture;
    use stellarops_types::Error;

    fn failing() -> BoxFuture<'static, Result<u32, Error>> {
        Box::pin(async { Err(Error::Transient("boom".into())) })
    }

    #[tokio::test(start_paused = true)]
    async fn orbital_open_is_always_critical() {
        let registry = BreakerRegistry::default();
        for _ in 0..registry.orbital.config.failure_threshold {
            let _ = registry.orbital.call(failing, None).await;
        }
        assert_eq!(registry.operational_mode().await, OperationalMode::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn full_mode_when_nothing_open() {
        let registry = BreakerRegistry::default();
        assert_eq!(registry.operational_mode().await, OperationalMode::Full);
    }
}
