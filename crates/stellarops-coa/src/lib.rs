//! COA planning and execution (spec §4.8, §4.9).

pub mod executor;
pub mod generator;
pub mod physics;
pub mod store;

pub use executor::{CoaExecState, CoaExecutor, ExecutionStatus};
pub use generator::CoaGenerator;
pub use store::{CoaStore, InMemoryCoaStore};
