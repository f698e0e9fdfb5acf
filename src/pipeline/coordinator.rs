//! Composition root. Owns the queue engine, the validation engine, the
//! actor registry, and the shutdown token; the session router calls in
//! here and nothing else.

use super::actor::{MatchActor, PipelineContext};
use super::config::CoordinatorConfig;
use super::events::MatchEvent;
use crate::error::{CoordinatorError, Result};
use crate::penalty::PenaltyTracker;
use crate::persistence::{MatchLogSource, MatchStore};
use crate::player::{PlayerId, RankFunction};
use crate::queue::{QueueEngine, QueueEntry};
use crate::session::{ConnectionRegistry, Outbound, ServerMessage};
use crate::store::StateStore;
use crate::team::Cohort;
use crate::validation::ValidationEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

pub struct Coordinator {
    pub config: CoordinatorConfig,
    store: Arc<dyn StateStore>,
    matches: Arc<dyn MatchStore>,
    penalties: Arc<PenaltyTracker>,
    queue: Arc<QueueEngine>,
    registry: Arc<ConnectionRegistry>,
    outbound: Arc<dyn Outbound>,
    validation: Arc<ValidationEngine>,
    cohort_rx: Mutex<Option<mpsc::Receiver<Cohort>>>,
    actors: RwLock<HashMap<String, mpsc::Sender<MatchEvent>>>,
    memberships: RwLock<HashMap<PlayerId, String>>,
    shutdown: CancellationToken,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<dyn StateStore>,
        matches: Arc<dyn MatchStore>,
        logs: Arc<dyn MatchLogSource>,
        rank: Arc<dyn RankFunction>,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        let penalties = Arc::new(PenaltyTracker::new(store.clone()));
        let (cohort_tx, cohort_rx) = mpsc::channel(32);
        let queue = Arc::new(QueueEngine::new(
            config.queue.clone(),
            store.clone(),
            matches.clone(),
            penalties.clone(),
            cohort_tx,
        ));
        let validation = Arc::new(ValidationEngine::new(
            config.validation.clone(),
            logs,
            matches.clone(),
            store.clone(),
            rank,
        ));
        let outbound: Arc<dyn Outbound> = registry.clone();

        Arc::new(Self {
            config,
            store,
            matches,
            penalties,
            queue,
            registry,
            outbound,
            validation,
            cohort_rx: Mutex::new(Some(cohort_rx)),
            actors: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Launch the background services: cohort consumer, validation loop,
    /// and the stale-transport heartbeat.
    pub async fn start(self: Arc<Self>) {
        let mut cohort_rx = self
            .cohort_rx
            .lock()
            .await
            .take()
            .unwrap_or_else(|| mpsc::channel(1).1);

        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = coordinator.shutdown.cancelled() => break,
                    cohort = cohort_rx.recv() => match cohort {
                        Some(cohort) => coordinator.clone().launch_match(cohort).await,
                        None => break,
                    }
                }
            }
        });

        self.validation
            .clone()
            .spawn_loop(self.shutdown.child_token());

        let coordinator = self.clone();
        tokio::spawn(async move {
            let interval = coordinator.config.heartbeat_interval;
            loop {
                tokio::select! {
                    _ = coordinator.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                let stale = coordinator.registry.sweep_stale(interval).await;
                for player in stale {
                    tracing::info!(player = %player, "stale transport terminated");
                    coordinator.disconnect(player).await;
                }
            }
        });
    }

    async fn launch_match(self: Arc<Self>, cohort: Cohort) {
        let (tx, rx) = mpsc::channel(64);
        let match_id = cohort.match_id.clone();
        let player_ids = cohort.player_ids();

        {
            let mut actors = self.actors.write().await;
            actors.insert(match_id.clone(), tx);
            let mut memberships = self.memberships.write().await;
            for player in &player_ids {
                memberships.insert(*player, match_id.clone());
            }
        }

        let ctx = Arc::new(PipelineContext {
            config: self.config.clone(),
            store: self.store.clone(),
            matches: self.matches.clone(),
            penalties: self.penalties.clone(),
            queue: self.queue.clone(),
            outbound: self.outbound.clone(),
            validation: self.validation.clone(),
        });
        let actor = MatchActor::new(ctx, cohort, rx, self.shutdown.child_token());

        let coordinator = self.clone();
        tokio::spawn(async move {
            actor.run().await;
            coordinator.finish_match(&match_id, &player_ids).await;
        });
    }

    async fn finish_match(&self, match_id: &str, players: &[PlayerId]) {
        self.actors.write().await.remove(match_id);
        let mut memberships = self.memberships.write().await;
        for player in players {
            if memberships.get(player).map(String::as_str) == Some(match_id) {
                memberships.remove(player);
            }
        }
    }

    // ---- router entry points --------------------------------------------

    pub async fn queue_join(
        &self,
        player: PlayerId,
        classes: Option<crate::player::ClassProfile>,
    ) -> Result<(QueueEntry, usize)> {
        if self.memberships.read().await.contains_key(&player) {
            return Err(CoordinatorError::AlreadyInQueue(player));
        }
        let entry = self.queue.admit(player, classes).await?;
        self.queue.clone().ensure_loop();
        let size = self.queue.queue_size().await;
        Ok((entry, size))
    }

    pub async fn queue_leave(&self, player: PlayerId) -> Result<bool> {
        self.queue.remove(player).await
    }

    /// Forward a match-scoped event from an authenticated player to the
    /// owning actor.
    pub async fn dispatch(&self, match_id: &str, player: PlayerId, event: MatchEvent) -> Result<()> {
        let member_of = self.memberships.read().await.get(&player).cloned();
        if member_of.as_deref() != Some(match_id) {
            return Err(CoordinatorError::NotInMatch {
                match_id: match_id.to_string(),
                player,
            });
        }
        let sender = self.actors.read().await.get(match_id).cloned();
        match sender {
            Some(sender) => sender
                .send(event)
                .await
                .map_err(|_| CoordinatorError::MatchNotFound(match_id.to_string())),
            None => Err(CoordinatorError::MatchNotFound(match_id.to_string())),
        }
    }

    /// Disconnect cascade: queue removal plus a Disconnected event to the
    /// player's active match, if any.
    pub async fn disconnect(&self, player: PlayerId) {
        if let Err(e) = self.queue.remove(player).await {
            tracing::warn!(player = %player, error = %e, "queue removal on disconnect failed");
        }
        let match_id = self.memberships.read().await.get(&player).cloned();
        if let Some(match_id) = match_id {
            let sender = self.actors.read().await.get(&match_id).cloned();
            if let Some(sender) = sender {
                let _ = sender.send(MatchEvent::Disconnected(player)).await;
            }
        }
        self.registry.unbind(player).await;
    }

    pub async fn active_matches(&self) -> usize {
        self.actors.read().await.len()
    }

    pub async fn membership_of(&self, player: PlayerId) -> Option<String> {
        self.memberships.read().await.get(&player).cloned()
    }

    pub fn penalties(&self) -> &PenaltyTracker {
        &self.penalties
    }

    /// Graceful shutdown: stop the queue loop, cancel every actor and the
    /// validation loop, then notify and close all transports.
    pub async fn shutdown(&self) {
        tracing::info!("coordinator shutting down");
        self.queue.stop_loop();
        self.shutdown.cancel();
        self.registry.close_all(ServerMessage::ServerShutdown).await;
    }
}
