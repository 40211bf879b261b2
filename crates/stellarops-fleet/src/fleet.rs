//! The satellite fleet façade (spec §4.5).

use crate::actor::{self, SatelliteCommand};
use crate::registry::{DistributedRegistry, InProcessRegistry};
use std::sync::Arc;
use stellarops_clock::Clock;
use stellarops_types::{Position, Satellite, SatelliteId, SatelliteMode, TleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Updated,
    NotFound,
}

/// Fleet façade: `start`/`stop`/`get_state`/`list`/`count`/`list_states`
/// plus the per-actor mutation operations, all delegating to
/// [`DistributedRegistry`].
pub struct SatelliteFleet {
    registry: Arc<dyn DistributedRegistry>,
    clock: Arc<dyn Clock>,
}

impl SatelliteFleet {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(InProcessRegistry::new()),
            clock,
        }
    }

    pub fn with_registry(registry: Arc<dyn DistributedRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub async fn start(&self, id: SatelliteId) -> StartOutcome {
        let handle = actor::spawn(id.clone(), self.clock.clone());
        if self.registry.insert(id, handle.clone()).await {
            StartOutcome::Started
        } else {
            // Lost the race to another `start`; shut down the orphaned actor.
            let _ = handle.send(SatelliteCommand::Stop).await;
            StartOutcome::AlreadyExists
        }
    }

    pub async fn stop(&self, id: &SatelliteId) -> MutationOutcome {
        match self.registry.remove(id).await {
            Some(handle) => {
                let _ = handle.send(SatelliteCommand::Stop).await;
                MutationOutcome::Updated
            }
            None => MutationOutcome::NotFound,
        }
    }

    pub async fn get_state(&self, id: &SatelliteId) -> Option<Satellite> {
        let handle = self.registry.get(id).await?;
        Some(handle.current())
    }

    pub async fn list(&self) -> Vec<SatelliteId> {
        self.registry.ids().await
    }

    pub async fn count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn list_states(&self) -> Vec<Satellite> {
        let mut states = Vec::new();
        for id in self.registry.ids().await {
            if let Some(handle) = self.registry.get(&id).await {
                states.push(handle.current());
            }
        }
        states
    }

    pub async fn update_energy(&self, id: &SatelliteId, delta: f64) -> MutationOutcome {
        self.dispatch(id, SatelliteCommand::UpdateEnergy { delta }).await
    }

    pub async fn update_memory(&self, id: &SatelliteId, absolute: f64) -> MutationOutcome {
        self.dispatch(id, SatelliteCommand::UpdateMemory { absolute }).await
    }

    pub async fn set_mode(&self, id: &SatelliteId, mode: SatelliteMode) -> MutationOutcome {
        self.dispatch(id, SatelliteCommand::SetMode { mode }).await
    }

    pub async fn update_position(&self, id: &SatelliteId, position: Position) -> MutationOutcome {
        self.dispatch(id, SatelliteCommand::UpdatePosition { position }).await
    }

    pub async fn set_tle(&self, id: &SatelliteId, tle: TleSet) -> MutationOutcome {
        self.dispatch(id, SatelliteCommand::SetTle { tle }).await
    }

    async fn dispatch(&self, id: &SatelliteId, command: SatelliteCommand) -> MutationOutcome {
        match self.registry.get(id).await {
            Some(handle) => {
                let _ = handle.send(command).await;
                MutationOutcome::Updated
            }
            None => MutationOutcome::NotFound,
        }
    }
}
