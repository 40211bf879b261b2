//! Layered configuration (spec §2 ambient stack, §6 "Configuration").
//!
//! Defaults -> `StellarOps.toml` -> `STELLAROPS_*` environment overrides,
//! merged with the `config` crate into one [`AppConfig`].

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub interval_ms: u64,
    pub horizon_hours: f64,
    pub step_seconds: i64,
    pub miss_distance_threshold_km: f64,
    pub concurrency: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        let d = stellarops_conjunction::DetectorConfig::default();
        Self {
            interval_ms: d.interval_ms,
            horizon_hours: d.horizon_hours,
            step_seconds: d.step_seconds,
            miss_distance_threshold_km: d.miss_distance_threshold_km,
            concurrency: d.concurrency,
        }
    }
}

impl From<DetectorSettings> for stellarops_conjunction::DetectorConfig {
    fn from(s: DetectorSettings) -> Self {
        Self {
            interval_ms: s.interval_ms,
            horizon_hours: s.horizon_hours,
            step_seconds: s.step_seconds,
            miss_distance_threshold_km: s.miss_distance_threshold_km,
            concurrency: s.concurrency,
        }
    }
}

/// Per-name breaker thresholds (spec §6). `BreakerRegistry::default()`
/// already wires these exact four names with matching defaults; this
/// struct exists so the values are a recognized, overridable part of
/// `AppConfig`'s surface even though threading a per-name override into
/// `CircuitBreaker::new` isn't wired up yet (see DESIGN.md).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub failure_window_secs: u64,
    pub reset_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_window_secs: 30,
            reset_timeout_secs: 15,
        }
    }
}

/// COA planner knobs named in spec §6. The planner's actual burn-sizing
/// (§4.8) follows the fixed vis-viva/Hohmann/Tsiolkovsky formulas rather
/// than these three scalars; they're recognized config surface, not yet
/// consumed (see DESIGN.md).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoaPlannerSettings {
    pub max_delta_v_ms: f64,
    pub fuel_density_kg_per_ms: f64,
    pub maneuver_lead_time_hours: f64,
}

impl Default for CoaPlannerSettings {
    fn default() -> Self {
        Self {
            max_delta_v_ms: 10.0,
            fuel_density_kg_per_ms: 0.05,
            maneuver_lead_time_hours: 12.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TleWatcherSettings {
    pub stale_threshold_hours: i64,
    pub check_interval_secs: u64,
}

impl Default for TleWatcherSettings {
    fn default() -> Self {
        Self {
            stale_threshold_hours: 24,
            check_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmBusSettings {
    pub retention_seconds: i64,
    pub purge_interval_secs: u64,
}

impl Default for AlarmBusSettings {
    fn default() -> Self {
        Self {
            retention_seconds: 86_400,
            purge_interval_secs: 3600,
        }
    }
}

/// `None` keeps the deterministic [`stellarops_orbital::MockOrbitalClient`];
/// `Some(url)` switches to the real `HttpOrbitalClient` (spec §6's
/// `/api/propagate` etc. contract, owned by an out-of-scope collaborator).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrbitalSettings {
    pub base_url: Option<String>,
}

impl Default for OrbitalSettings {
    fn default() -> Self {
        Self { base_url: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionExecutorSettings {
    pub max_concurrent_missions: usize,
}

impl Default for MissionExecutorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_missions: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorSettings,
    pub breakers: BreakerSettings,
    pub coa_planner: CoaPlannerSettings,
    pub tle_watcher: TleWatcherSettings,
    pub alarm_bus: AlarmBusSettings,
    pub orbital: OrbitalSettings,
    pub mission_executor: MissionExecutorSettings,
}

impl AppConfig {
    /// Layers defaults -> `StellarOps.toml` (if present) -> `STELLAROPS_*`
    /// environment variables (double-underscore separated, e.g.
    /// `STELLAROPS_DETECTOR__INTERVAL_MS=30000`).
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("StellarOps").required(false))
            .add_source(config::Environment::with_prefix("STELLAROPS").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.detector.interval_ms, 60_000);
        assert_eq!(cfg.detector.miss_distance_threshold_km, 10.0);
        assert_eq!(cfg.tle_watcher.stale_threshold_hours, 24);
        assert_eq!(cfg.alarm_bus.retention_seconds, 86_400);
    }

    #[test]
    fn load_falls_back_to_defaults_when_no_file_or_env_is_present() {
        let cfg = AppConfig::load().expect("layered config builds from defaults alone");
        assert_eq!(cfg.detector.interval_ms, 60_000);
    }
}
