//! Shared data model and error types for the StellarOps control plane.
//!
//! Every other crate in this workspace depends on this one; it carries no
//! behavior beyond small, pure helpers attached to the entities themselves
//! (mode derivation, status-transition legality, severity classification).

pub mod alarm;
pub mod coa;
pub mod conjunction;
pub mod error;
pub mod events;
pub mod ids;
pub mod mission;
pub mod satellite;
pub mod trajectory;

pub use alarm::{Alarm, AlarmSeverity, AlarmStatus};
pub use coa::{Coa, CoaStatus, CoaType, DeltaV, OrbitSnapshot};
pub use conjunction::{Conjunction, ConjunctionSeverity, ConjunctionStatus};
pub use error::{Error, Result};
pub use events::Event;
pub use ids::{AlarmId, CoaId, ConjunctionId, GroundStationId, MissionId, SatelliteId, TrackedObjectId};
pub use mission::{Mission, MissionPriority, MissionStatus};
pub use satellite::{Position, Satellite, SatelliteMode, TleSet};
pub use trajectory::{Trajectory, TrajectoryPoint, Velocity};
