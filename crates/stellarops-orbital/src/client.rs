//! The typed orbital client trait plus its two implementations (spec §4.4).
//!
//! Every outbound call goes through the `orbital` breaker — see
//! [`BreakeredOrbitalClient`], the wrapper every caller in this workspace is
//! expected to hold instead of talking to a raw implementation directly.

use crate::wire::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stellarops_breaker::{BoxFuture, BreakerRegistry};
use stellarops_types::{Error, Position, Velocity};

const EARTH_RADIUS_KM: f64 = 6378.137;
const EARTH_MU_KM3_S2: f64 = 398_600.4418;

/// Default per-call connect+read timeout (spec §5).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagatedState {
    pub position: Position,
    pub velocity: Velocity,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub version: String,
    pub uptime_seconds: u64,
}

/// A single visibility pass of a satellite over a ground station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
    pub aos_unix: i64,
    pub los_unix: i64,
    pub max_elevation_deg: f64,
}

#[derive(Debug, Clone)]
pub struct GroundStationQuery {
    pub id: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub min_elevation_deg: f64,
}

/// Typed wrapper over the external propagator. Implementations must not
/// apply their own timeout/retry policy — that is [`BreakeredOrbitalClient`]'s
/// job, so every call is uniformly subject to the `orbital` breaker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrbitalClient: Send + Sync {
    async fn propagate_position(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_unix: i64,
    ) -> Result<PropagatedState, Error>;

    async fn propagate_trajectory(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_start: i64,
        t_end: i64,
        step_seconds: i64,
    ) -> Result<stellarops_types::Trajectory, Error>;

    async fn calculate_visibility(
        &self,
        satellite_id: &str,
        tle: (&str, &str),
        ground_station: &GroundStationQuery,
        t_start: i64,
        t_end: i64,
    ) -> Result<Vec<Pass>, Error>;

    async fn health(&self) -> Result<HealthStatus, Error>;
}

/// `reqwest`-based production client speaking the JSON contract of §6.
pub struct HttpOrbitalClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpOrbitalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(DEFAULT_CALL_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl OrbitalClient for HttpOrbitalClient {
    async fn propagate_position(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_unix: i64,
    ) -> Result<PropagatedState, Error> {
        let req = PropagatePositionRequest {
            satellite_id: satellite_id.to_string(),
            tle1: tle1.to_string(),
            tle2: tle2.to_string(),
            t: t_unix,
        };
        let resp: PropagatePositionResponse = self
            .http
            .post(format!("{}/api/propagate", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if !resp.success {
            return Err(Error::Transient(
                resp.error_message.unwrap_or_else(|| "propagate failed".into()),
            ));
        }
        let position = resp.position.ok_or_else(|| Error::Transient("missing position".into()))?;
        let velocity = resp.velocity.ok_or_else(|| Error::Transient("missing velocity".into()))?;
        let geodetic = resp.geodetic.ok_or_else(|| Error::Transient("missing geodetic".into()))?;
        Ok(PropagatedState {
            position: Position {
                x_km: position.x_km,
                y_km: position.y_km,
                z_km: position.z_km,
            },
            velocity: Velocity {
                vx_km_s: velocity.vx_km_s,
                vy_km_s: velocity.vy_km_s,
                vz_km_s: velocity.vz_km_s,
            },
            latitude_deg: geodetic.latitude_deg,
            longitude_deg: geodetic.longitude_deg,
            altitude_km: geodetic.altitude_km,
        })
    }

    async fn propagate_trajectory(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_start: i64,
        t_end: i64,
        step_seconds: i64,
    ) -> Result<stellarops_types::Trajectory, Error> {
        let req = PropagateTrajectoryRequest {
            satellite_id: satellite_id.to_string(),
            tle1: tle1.to_string(),
            tle2: tle2.to_string(),
            t_start,
            t_end,
            step_seconds,
        };
        let resp: PropagateTrajectoryResponse = self
            .http
            .post(format!("{}/api/trajectory", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if !resp.success {
            return Err(Error::Transient(
                resp.error_message.unwrap_or_else(|| "trajectory failed".into()),
            ));
        }
        let points = resp
            .points
            .into_iter()
            .map(|p| stellarops_types::TrajectoryPoint {
                timestamp: p.timestamp,
                position: Position {
                    x_km: p.position.x_km,
                    y_km: p.position.y_km,
                    z_km: p.position.z_km,
                },
                velocity: p.velocity.map(|v| Velocity {
                    vx_km_s: v.vx_km_s,
                    vy_km_s: v.vy_km_s,
                    vz_km_s: v.vz_km_s,
                }),
            })
            .collect();
        Ok(stellarops_types::Trajectory::new(step_seconds, points))
    }

    async fn calculate_visibility(
        &self,
        satellite_id: &str,
        tle: (&str, &str),
        ground_station: &GroundStationQuery,
        t_start: i64,
        t_end: i64,
    ) -> Result<Vec<Pass>, Error> {
        let req = VisibilityRequest {
            satellite_id: satellite_id.to_string(),
            tle1: tle.0.to_string(),
            tle2: tle.1.to_string(),
            ground_station: GroundStationSpec {
                id: ground_station.id.clone(),
                name: ground_station.name.clone(),
                latitude_deg: ground_station.latitude_deg,
                longitude_deg: ground_station.longitude_deg,
                altitude_m: ground_station.altitude_m,
                min_elevation_deg: ground_station.min_elevation_deg,
            },
            t_start,
            t_end,
        };
        let resp: VisibilityResponse = self
            .http
            .post(format!("{}/api/visibility", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if !resp.success {
            return Err(Error::Transient(
                resp.error_message.unwrap_or_else(|| "visibility failed".into()),
            ));
        }
        Ok(resp
            .passes
            .into_iter()
            .map(|p| Pass {
                aos_unix: p.aos,
                los_unix: p.los,
                max_elevation_deg: p.max_elevation_deg,
            })
            .collect())
    }

    async fn health(&self) -> Result<HealthStatus, Error> {
        let resp: HealthResponse = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(HealthStatus {
            healthy: resp.healthy,
            version: resp.version,
            uptime_seconds: resp.uptime_seconds,
        })
    }
}

/// Deterministic in-memory implementation selected via
/// `AppConfig.orbital.mode = "mock"`. Models satellites on simplified
/// circular orbits derived from the TLE's mean-motion field (mean anomaly
/// rate), so two calls with the same inputs always agree — this is what the
/// detector and COA planner tests run against.
#[derive(Debug, Default)]
pub struct MockOrbitalClient;

impl MockOrbitalClient {
    /// Extract mean motion (revolutions/day) from TLE line 2, columns 53-63
    /// in the real format; this mock instead takes it from a trailing
    /// whitespace-separated field so hand-written test TLEs stay readable.
    fn mean_motion_rev_per_day(tle2: &str) -> f64 {
        tle2.split_whitespace()
            .last()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(15.0)
    }

    /// Vis-viva for a circular orbit: radius such that the period implied
    /// by `mean_motion` is consistent with Earth's gravitational parameter.
    fn circular_radius_km(mean_motion_rev_per_day: f64) -> f64 {
        let period_s = 86400.0 / mean_motion_rev_per_day.max(0.1);
        (EARTH_MU_KM3_S2 * (period_s / std::f64::consts::TAU).powi(2)).cbrt()
    }

    fn state_at(satellite_id: &str, tle2: &str, t_unix: i64) -> PropagatedState {
        let mean_motion = Self::mean_motion_rev_per_day(tle2);
        let radius_km = Self::circular_radius_km(mean_motion);
        let angular_rate_rad_s = mean_motion * std::f64::consts::TAU / 86400.0;
        let phase_offset = phase_seed(satellite_id);
        let theta = phase_offset + angular_rate_rad_s * t_unix as f64;
        let speed_km_s = angular_rate_rad_s * radius_km;

        PropagatedState {
            position: Position {
                x_km: radius_km * theta.cos(),
                y_km: radius_km * theta.sin(),
                z_km: 0.0,
            },
            velocity: Velocity {
                vx_km_s: -speed_km_s * theta.sin(),
                vy_km_s: speed_km_s * theta.cos(),
                vz_km_s: 0.0,
            },
            latitude_deg: 0.0,
            longitude_deg: theta.to_degrees() % 360.0,
            altitude_km: radius_km - EARTH_RADIUS_KM,
        }
    }
}

/// Stable deterministic phase derived from the satellite id's bytes, so
/// repeated calls for the same id always land on the same orbit phase.
fn phase_seed(satellite_id: &str) -> f64 {
    let sum: u32 = satellite_id.bytes().map(u32::from).sum();
    (sum as f64 % 360.0).to_radians()
}

#[async_trait]
impl OrbitalClient for MockOrbitalClient {
    async fn propagate_position(
        &self,
        satellite_id: &str,
        _tle1: &str,
        tle2: &str,
        t_unix: i64,
    ) -> Result<PropagatedState, Error> {
        Ok(Self::state_at(satellite_id, tle2, t_unix))
    }

    async fn propagate_trajectory(
        &self,
        satellite_id: &str,
        _tle1: &str,
        tle2: &str,
        t_start: i64,
        t_end: i64,
        step_seconds: i64,
    ) -> Result<stellarops_types::Trajectory, Error> {
        if step_seconds <= 0 {
            return Err(Error::ValidationFailed(vec!["step_seconds must be positive".into()]));
        }
        let mut points = Vec::new();
        let mut t = t_start;
        while t <= t_end {
            let state = Self::state_at(satellite_id, tle2, t);
            points.push(stellarops_types::TrajectoryPoint {
                timestamp: t,
                position: state.position,
                velocity: Some(state.velocity),
            });
            t += step_seconds;
        }
        Ok(stellarops_types::Trajectory::new(step_seconds, points))
    }

    async fn calculate_visibility(
        &self,
        _satellite_id: &str,
        _tle: (&str, &str),
        _ground_station: &GroundStationQuery,
        t_start: i64,
        t_end: i64,
    ) -> Result<Vec<Pass>, Error> {
        // Deterministic single pass spanning the middle third of the window.
        let span = (t_end - t_start).max(0);
        Ok(vec![Pass {
            aos_unix: t_start + span / 3,
            los_unix: t_start + 2 * span / 3,
            max_elevation_deg: 45.0,
        }])
    }

    async fn health(&self) -> Result<HealthStatus, Error> {
        Ok(HealthStatus {
            healthy: true,
            version: "mock-1.0".to_string(),
            uptime_seconds: 0,
        })
    }
}

/// Wraps any [`OrbitalClient`] so every call is routed through the `orbital`
/// breaker, per spec §4.4 ("all routed through the `orbital` breaker").
pub struct BreakeredOrbitalClient {
    inner: Arc<dyn OrbitalClient>,
    breakers: Arc<BreakerRegistry>,
}

impl BreakeredOrbitalClient {
    pub fn new(inner: Arc<dyn OrbitalClient>, breakers: Arc<BreakerRegistry>) -> Self {
        Self { inner, breakers }
    }

    pub async fn propagate_position(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_unix: i64,
    ) -> Result<PropagatedState, Error> {
        let inner = self.inner.clone();
        let (satellite_id, tle1, tle2) = (satellite_id.to_string(), tle1.to_string(), tle2.to_string());
        self.run(move || {
            Box::pin(async move {
                tokio::time::timeout(
                    DEFAULT_CALL_TIMEOUT,
                    inner.propagate_position(&satellite_id, &tle1, &tle2, t_unix),
                )
                .await
                .map_err(|_| Error::Timeout {
                    operation: "propagate_position".into(),
                    after_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
                })?
            })
        })
        .await
    }

    pub async fn propagate_trajectory(
        &self,
        satellite_id: &str,
        tle1: &str,
        tle2: &str,
        t_start: i64,
        t_end: i64,
        step_seconds: i64,
    ) -> Result<stellarops_types::Trajectory, Error> {
        let inner = self.inner.clone();
        let (satellite_id, tle1, tle2) = (satellite_id.to_string(), tle1.to_string(), tle2.to_string());
        self.run(move || {
            Box::pin(async move {
                tokio::time::timeout(
                    DEFAULT_CALL_TIMEOUT,
                    inner.propagate_trajectory(&satellite_id, &tle1, &tle2, t_start, t_end, step_seconds),
                )
                .await
                .map_err(|_| Error::Timeout {
                    operation: "propagate_trajectory".into(),
                    after_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
                })?
            })
        })
        .await
    }

    pub async fn calculate_visibility(
        &self,
        satellite_id: &str,
        tle: (&str, &str),
        ground_station: &GroundStationQuery,
        t_start: i64,
        t_end: i64,
    ) -> Result<Vec<Pass>, Error> {
        let inner = self.inner.clone();
        let satellite_id = satellite_id.to_string();
        let (tle1, tle2) = (tle.0.to_string(), tle.1.to_string());
        let ground_station = ground_station.clone();
        self.run(move || {
            Box::pin(async move {
                tokio::time::timeout(
                    DEFAULT_CALL_TIMEOUT,
                    inner.calculate_visibility(&satellite_id, (&tle1, &tle2), &ground_station, t_start, t_end),
                )
                .await
                .map_err(|_| Error::Timeout {
                    operation: "calculate_visibility".into(),
                    after_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
                })?
            })
        })
        .await
    }

    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let inner = self.inner.clone();
        self.run(move || {
            Box::pin(async move {
                tokio::time::timeout(DEFAULT_CALL_TIMEOUT, inner.health())
                    .await
                    .map_err(|_| Error::Timeout {
                        operation: "health".into(),
                        after_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
                    })?
            })
        })
        .await
    }

    async fn run<T>(&self, f: impl FnOnce() -> BoxFuture<'static, Result<T, Error>>) -> Result<T, Error> {
        self.breakers.orbital.call(f, None).await
    }
}
