//! Typed client for the external orbital propagation service (spec §4.4).
//!
//! Everything here is pure request/response plumbing plus a deterministic
//! mock — the satellite fleet and conjunction detector never talk to
//! `reqwest` directly, only to [`OrbitalClient`] through [`BreakeredOrbitalClient`].

pub mod client;
pub mod wire;

pub use client::{
    BreakeredOrbitalClient, GroundStationQuery, HealthStatus, HttpOrbitalClient, MockOrbitalClient,
    OrbitalClient, Pass, PropagatedState, DEFAULT_CALL_TIMEOUT,
};
