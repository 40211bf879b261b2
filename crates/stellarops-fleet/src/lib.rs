//! Satellite actor-per-id fleet and registry (spec §4.5).

pub mod actor;
pub mod fleet;
pub mod registry;

pub use actor::{ActorHandle, SatelliteCommand};
pub use fleet::{MutationOutcome, SatelliteFleet, StartOutcome};
pub use registry::{DistributedRegistry, InProcessRegistry};
