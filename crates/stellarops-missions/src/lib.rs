//! Mission store, validator, priority scheduler, and executor (spec §4.6).

pub mod executor;
pub mod scheduler;
pub mod store;
pub mod validator;

pub use executor::{Executor, MissionRunner, NoopMissionRunner, DEFAULT_RETRY_BASE, MAX_RETRY_BACKOFF};
pub use scheduler::{Scheduler, ADMISSION_BACKOFF};
pub use store::{InMemoryMissionStore, MissionStore};
pub use validator::{AlwaysOnlineDirectory, GroundStationDirectory, ValidationOptions, Validator};
