//! A single satellite actor: one `tokio::task` per id, owning its own
//! mutable [`Satellite`] state exclusively (spec §3 ownership rule, §4.5).

use std::sync::Arc;
use stellarops_clock::Clock;
use stellarops_types::{Satellite, SatelliteId, SatelliteMode};
use tokio::sync::{mpsc, oneshot, watch};

pub enum SatelliteCommand {
    UpdateEnergy { delta: f64 },
    UpdateMemory { absolute: f64 },
    SetMode { mode: SatelliteMode },
    UpdatePosition { position: stellarops_types::Position },
    SetTle { tle: stellarops_types::TleSet },
    Snapshot { reply: oneshot::Sender<Satellite> },
    Stop,
}

/// The fleet's handle onto one running actor: a command sender plus a
/// `watch` channel of its latest state, so reads never contend with the
/// actor's own mutation loop.
#[derive(Clone)]
pub struct ActorHandle {
    tx: mpsc::Sender<SatelliteCommand>,
    state: watch::Receiver<Satellite>,
}

impl ActorHandle {
    pub async fn send(&self, command: SatelliteCommand) -> Result<(), mpsc::error::SendError<SatelliteCommand>> {
        self.tx.send(command).await
    }

    /// Lock-free read of the actor's most recently published state.
    pub fn current(&self) -> Satellite {
        self.state.borrow().clone()
    }

    pub async fn snapshot(&self) -> Satellite {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SatelliteCommand::Snapshot { reply }).await.is_err() {
            return self.current();
        }
        rx.await.unwrap_or_else(|_| self.current())
    }
}

/// Spawns the actor task for `id` and returns its handle.
pub fn spawn(id: SatelliteId, clock: Arc<dyn Clock>) -> ActorHandle {
    let initial = Satellite::new(id, clock.now_utc());
    let (tx, mut rx) = mpsc::channel::<SatelliteCommand>(64);
    let (state_tx, state_rx) = watch::channel(initial.clone());

    tokio::spawn(async move {
        let mut satellite = initial;
        while let Some(command) = rx.recv().await {
            match command {
                SatelliteCommand::UpdateEnergy { delta } => {
                    satellite.apply_energy_delta(delta);
                }
                SatelliteCommand::UpdateMemory { absolute } => {
                    satellite.set_memory_used(absolute);
                }
                SatelliteCommand::SetMode { mode } => {
                    satellite.set_mode_override(mode);
                }
                SatelliteCommand::UpdatePosition { position } => {
                    satellite.update_position(position);
                }
                SatelliteCommand::SetTle { tle } => {
                    satellite.tle = Some(tle);
                }
                SatelliteCommand::Snapshot { reply } => {
                    let _ = reply.send(satellite.clone());
                    continue;
                }
                SatelliteCommand::Stop => break,
            }
            // `watch::Sender::send` only errors when every receiver (and the
            // fleet's own retained clone) has been dropped; at that point the
            // actor has nothing left to publish to and simply exits.
            if state_tx.send(satellite.clone()).is_err() {
                break;
            }
        }
    });

    ActorHandle {
        tx,
        state: state_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellarops_clock::FixedClock;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(chrono::Utc::now()))
    }

    #[tokio::test]
    async fn update_energy_clamps_and_derives_mode() {
        let handle = spawn(SatelliteId::new("SAT-1"), clock());
        handle
            .send(SatelliteCommand::UpdateEnergy { delta: -1000.0 })
            .await
            .unwrap();
        let state = handle.snapshot().await;
        assert_eq!(state.energy, 0.0);
        assert_eq!(state.mode, SatelliteMode::Survival);
    }

    #[tokio::test]
    async fn set_mode_overrides_then_next_energy_update_re_derives() {
        let handle = spawn(SatelliteId::new("SAT-1"), clock());
        handle
            .send(SatelliteCommand::SetMode {
                mode: SatelliteMode::Safe,
            })
            .await
            .unwrap();
        assert_eq!(handle.snapshot().await.mode, SatelliteMode::Safe);

        handle
            .send(SatelliteCommand::UpdateEnergy { delta: 0.0 })
            .await
            .unwrap();
        assert_eq!(handle.snapshot().await.mode, SatelliteMode::Nominal);
    }

    #[tokio::test]
    async fn current_reads_never_block_on_mutation() {
        let handle = spawn(SatelliteId::new("SAT-1"), clock());
        handle
            .send(SatelliteCommand::UpdateEnergy { delta: -50.0 })
            .await
            .unwrap();
        tokio::task::yield_now().await;
        // `current()` is a plain watch-channel borrow, no await needed.
        assert_eq!(handle.current().energy, 50.0);
    }
}
