//! Single task owning the engine. Ticks and commands are serialized through
//! one `select!` loop; background saves run beside it, one at a time.

use crate::clock::Clock;
use crate::engine::Engine;
use crate::view::EngineSnapshot;
use persistence::KeyValueStore;
use sim_core::GameState;
use sim_econ::AdministrationView;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 64;

pub enum Command {
    Tap,
    BuyAgent {
        administration_id: String,
        agent_id: String,
        reply: oneshot::Sender<bool>,
    },
    UnlockAdministration {
        administration_id: String,
        reply: oneshot::Sender<bool>,
    },
    SetActiveAdministration {
        administration_id: String,
        reply: oneshot::Sender<bool>,
    },
    BuyStorageUpgrade {
        upgrade_id: String,
        reply: oneshot::Sender<bool>,
    },
    ActivateConformite {
        reply: oneshot::Sender<bool>,
    },
    RunConformiteTest {
        reply: oneshot::Sender<bool>,
    },
    BuyPrestigeUpgrade {
        upgrade_id: String,
        reply: oneshot::Sender<bool>,
    },
    PerformPrestige {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    Administrations {
        reply: oneshot::Sender<Vec<AdministrationView>>,
    },
    State {
        reply: oneshot::Sender<GameState>,
    },
    /// Final save, then stop the loop.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running engine. Every call returns `false`
/// (or `None`) once the actor has stopped.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn ask<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.ok()?;
        rx.await.ok()
    }

    pub async fn tap(&self) -> bool {
        self.tx.send(Command::Tap).await.is_ok()
    }

    pub async fn buy_agent(&self, administration_id: &str, agent_id: &str) -> bool {
        let (administration_id, agent_id) = (administration_id.to_string(), agent_id.to_string());
        self.ask(|reply| Command::BuyAgent {
            administration_id,
            agent_id,
            reply,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn unlock_administration(&self, administration_id: &str) -> bool {
        let administration_id = administration_id.to_string();
        self.ask(|reply| Command::UnlockAdministration {
            administration_id,
            reply,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn set_active_administration(&self, administration_id: &str) -> bool {
        let administration_id = administration_id.to_string();
        self.ask(|reply| Command::SetActiveAdministration {
            administration_id,
            reply,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn buy_storage_upgrade(&self, upgrade_id: &str) -> bool {
        let upgrade_id = upgrade_id.to_string();
        self.ask(|reply| Command::BuyStorageUpgrade { upgrade_id, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn activate_conformite(&self) -> bool {
        self.ask(|reply| Command::ActivateConformite { reply })
            .await
            .unwrap_or(false)
    }

    pub async fn run_conformite_test(&self) -> bool {
        self.ask(|reply| Command::RunConformiteTest { reply })
            .await
            .unwrap_or(false)
    }

    pub async fn buy_prestige_upgrade(&self, upgrade_id: &str) -> bool {
        let upgrade_id = upgrade_id.to_string();
        self.ask(|reply| Command::BuyPrestigeUpgrade { upgrade_id, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn perform_prestige(&self) -> bool {
        self.ask(|reply| Command::PerformPrestige { reply })
            .await
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> Option<EngineSnapshot> {
        self.ask(|reply| Command::Snapshot { reply }).await
    }

    pub async fn administrations(&self) -> Option<Vec<AdministrationView>> {
        self.ask(|reply| Command::Administrations { reply }).await
    }

    pub async fn state(&self) -> Option<GameState> {
        self.ask(|reply| Command::State { reply }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.ask(|reply| Command::Shutdown { reply }).await;
    }
}

/// Start the game loop on the current runtime.
pub fn spawn<S, C>(engine: Engine<S, C>) -> (EngineHandle, JoinHandle<()>)
where
    S: KeyValueStore + Clone + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(engine, rx));
    (EngineHandle { tx }, task)
}

async fn run<S, C>(mut engine: Engine<S, C>, mut rx: mpsc::Receiver<Command>)
where
    S: KeyValueStore + Clone + 'static,
    C: Clock + 'static,
{
    let mut interval = tokio::time::interval(Duration::from_millis(engine.config().tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;
    info!(tick_ms = engine.config().tick_interval_ms, "game loop started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.tick();
                if in_flight.as_ref().map_or(true, |h| h.is_finished()) {
                    in_flight = start_save(&mut engine);
                }
            }
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("all handles dropped");
                    break;
                };
                match cmd {
                    Command::PerformPrestige { reply } => {
                        settle(in_flight.take()).await;
                        let _ = reply.send(engine.perform_prestige().await);
                    }
                    Command::Shutdown { reply } => {
                        settle(in_flight.take()).await;
                        if let Err(err) = engine.save_now().await {
                            warn!(error = %err, "final save failed");
                        }
                        let _ = reply.send(());
                        info!("game loop stopped");
                        return;
                    }
                    other => dispatch(&mut engine, other),
                }
            }
        }
    }

    settle(in_flight.take()).await;
    if let Err(err) = engine.save_now().await {
        warn!(error = %err, "final save failed");
    }
}

fn start_save<S, C>(engine: &mut Engine<S, C>) -> Option<JoinHandle<()>>
where
    S: KeyValueStore + Clone + 'static,
    C: Clock,
{
    let payload = engine.take_save_payload()?;
    let store = engine.store().clone();
    let key = engine.config().state_key.clone();
    Some(tokio::spawn(async move {
        match store.set(&key, &payload).await {
            Ok(()) => debug!(bytes = payload.len(), "state saved"),
            Err(err) => warn!(error = %err, "background save failed, retrying next window"),
        }
    }))
}

async fn settle(save: Option<JoinHandle<()>>) {
    if let Some(save) = save {
        if let Err(err) = save.await {
            warn!(error = %err, "background save task failed");
        }
    }
}

fn dispatch<S: KeyValueStore, C: Clock>(engine: &mut Engine<S, C>, cmd: Command) {
    match cmd {
        Command::Tap => engine.tap(),
        Command::BuyAgent {
            administration_id,
            agent_id,
            reply,
        } => {
            let _ = reply.send(engine.buy_agent(&administration_id, &agent_id));
        }
        Command::UnlockAdministration {
            administration_id,
            reply,
        } => {
            let _ = reply.send(engine.unlock_administration(&administration_id));
        }
        Command::SetActiveAdministration {
            administration_id,
            reply,
        } => {
            let _ = reply.send(engine.set_active_administration(&administration_id));
        }
        Command::BuyStorageUpgrade { upgrade_id, reply } => {
            let _ = reply.send(engine.buy_storage_upgrade(&upgrade_id));
        }
        Command::ActivateConformite { reply } => {
            let _ = reply.send(engine.activate_conformite());
        }
        Command::RunConformiteTest { reply } => {
            let _ = reply.send(engine.run_conformite_test());
        }
        Command::BuyPrestigeUpgrade { upgrade_id, reply } => {
            let _ = reply.send(engine.buy_prestige_upgrade(&upgrade_id));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        Command::Administrations { reply } => {
            let _ = reply.send(engine.administrations());
        }
        Command::State { reply } => {
            let _ = reply.send(engine.state().clone());
        }
        // Handled by the loop itself.
        Command::PerformPrestige { reply } => {
            let _ = reply.send(false);
        }
        Command::Shutdown { reply } => {
            let _ = reply.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;
    use persistence::{MemoryStore, SqliteStore};
    use sim_core::{Catalog, SimConfig};
    use std::sync::Arc;

    fn config() -> SimConfig {
        SimConfig {
            tick_interval_ms: 10,
            rng_seed: Some(1),
            ..SimConfig::default()
        }
    }

    async fn start<S: KeyValueStore + Clone + 'static>(store: S) -> (EngineHandle, JoinHandle<()>) {
        let clock = ManualClock::new(Utc::now());
        let engine = Engine::load(Arc::new(Catalog::standard()), config(), store, clock).await;
        spawn(engine)
    }

    #[tokio::test]
    async fn commands_are_applied_in_order() {
        let (handle, task) = start(MemoryStore::new()).await;
        for _ in 0..50 {
            assert!(handle.tap().await);
        }
        let catalog = Catalog::standard();
        assert!(
            handle
                .buy_agent(catalog.first_administration_id(), "stagiaire-administratif")
                .await
        );
        assert!(!handle.unlock_administration("nowhere").await);
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.resources.dossiers, 0.0);
        assert_eq!(snap.prestige.current_value, 50.0);
        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_persists_state() {
        let store = MemoryStore::new();
        let (handle, task) = start(store.clone()).await;
        handle.tap().await;
        handle.shutdown().await;
        task.await.unwrap();
        assert!(!handle.tap().await);

        let (again, task) = start(store).await;
        let state = again.state().await.unwrap();
        assert_eq!(state.resources.dossiers, 1.0);
        again.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn prestige_through_the_actor() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let (handle, task) = start(store.clone()).await;
        assert!(!handle.perform_prestige().await);
        for _ in 0..1_000 {
            handle.tap().await;
        }
        assert!(handle.perform_prestige().await);
        let state = handle.state().await.unwrap();
        assert_eq!(state.paperclips, 1);
        assert_eq!(state.total_administrative_value, 0.0);
        assert!(store.get(&config().transaction_key).await.unwrap().is_none());
        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_handles_stops_the_loop() {
        let (handle, task) = start(MemoryStore::new()).await;
        drop(handle);
        task.await.unwrap();
    }
}
