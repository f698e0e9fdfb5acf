//! Per-match actor. Each published cohort gets one task owning the ready →
//! veto → host → validation progression, its stage timers, and a cancel
//! token. The session router feeds it typed events; everything else is
//! private to the task.

use super::config::CoordinatorConfig;
use super::events::MatchEvent;
use crate::error::Result;
use crate::host::{HostAttempt, HostSelector};
use crate::lobby::{chat_recipients, sender_name_for, Lobby, LobbyPhase, VetoOutcome};
use crate::penalty::PenaltyTracker;
use crate::persistence::{MatchRecord, MatchStore};
use crate::player::PlayerId;
use crate::queue::{QueueEngine, QueueEntry};
use crate::ready::{ReadyCheck, ReadyProgress};
use crate::session::{ChatChannel, Outbound, ServerMessage};
use crate::store::{self, keys, StateStore, StoreBatch};
use crate::team::{ClassAssignment, Cohort};
use crate::validation::{MatchVerdict, ValidationEngine};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shared dependencies handed to every actor.
pub struct PipelineContext {
    pub config: CoordinatorConfig,
    pub store: Arc<dyn StateStore>,
    pub matches: Arc<dyn MatchStore>,
    pub penalties: Arc<PenaltyTracker>,
    pub queue: Arc<QueueEngine>,
    pub outbound: Arc<dyn Outbound>,
    pub validation: Arc<ValidationEngine>,
}

enum StageResult {
    Proceed,
    Stop,
}

pub struct MatchActor {
    ctx: Arc<PipelineContext>,
    cohort: Cohort,
    rx: mpsc::Receiver<MatchEvent>,
    cancel: CancellationToken,
}

impl MatchActor {
    pub fn new(
        ctx: Arc<PipelineContext>,
        cohort: Cohort,
        rx: mpsc::Receiver<MatchEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            cohort,
            rx,
            cancel,
        }
    }

    pub async fn run(mut self) {
        let match_id = self.cohort.match_id.clone();
        tracing::info!(match_id = %match_id, "match pipeline started");
        if let Err(e) = self.drive().await {
            tracing::error!(match_id = %match_id, error = %e, "match pipeline aborted");
            let _ = self.fail_logical(&e.to_string()).await;
        }
        tracing::info!(match_id = %match_id, "match pipeline finished");
    }

    async fn drive(&mut self) -> Result<()> {
        let ready = ReadyCheck::new(
            self.ctx.store.clone(),
            self.ctx.outbound.clone(),
            self.ctx.config.ready_timeout,
        );
        if let StageResult::Stop = self.ready_phase(&ready).await? {
            return Ok(());
        }
        ready.clear(&self.cohort.match_id).await?;

        let mut lobby = Lobby::new(&self.cohort, &self.ctx.config.map_pool);
        self.ctx
            .matches
            .create_match(&MatchRecord::pending(&self.cohort.match_id))
            .await?;

        let map_number = match self.lobby_phase(&mut lobby).await? {
            Some(map_number) => map_number,
            None => return Ok(()),
        };

        let attempt = match self.host_phase(&mut lobby, map_number).await? {
            Some(attempt) => attempt,
            None => return Ok(()),
        };

        self.validation_phase(map_number, &attempt).await
    }

    // ---- ready -----------------------------------------------------------

    async fn ready_phase(&mut self, ready: &ReadyCheck) -> Result<StageResult> {
        ready.start(&self.cohort).await?;
        let deadline = Instant::now() + self.ctx.config.ready_timeout;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.cancel_ready(ready, &[], "SHUTDOWN").await?;
                    return Ok(StageResult::Stop);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let pending = ready.pending_players(&self.cohort).await?;
                    self.cancel_ready(ready, &pending, "TIMEOUT").await?;
                    return Ok(StageResult::Stop);
                }
                event = self.rx.recv() => match event {
                    None => return Ok(StageResult::Stop),
                    Some(MatchEvent::ReadyAccept(player)) => {
                        if let ReadyProgress::Completed =
                            ready.accept(&self.cohort, player).await?
                        {
                            return Ok(StageResult::Proceed);
                        }
                    }
                    Some(MatchEvent::ReadyDecline(player)) => {
                        self.ctx
                            .outbound
                            .send_to(
                                player,
                                ServerMessage::ReadyDeclined {
                                    match_id: self.cohort.match_id.clone(),
                                },
                            )
                            .await;
                        if let Some(grant) = self.ctx.penalties.record_decline(player).await? {
                            self.ctx
                                .outbound
                                .send_to(
                                    player,
                                    ServerMessage::CooldownSet {
                                        seconds: grant.seconds,
                                        ends_at: grant.ends_at,
                                    },
                                )
                                .await;
                        }
                        self.cancel_ready(ready, &[player], "DECLINED").await?;
                        return Ok(StageResult::Stop);
                    }
                    Some(MatchEvent::Disconnected(player)) => {
                        self.cancel_ready(ready, &[player], "DISCONNECTED").await?;
                        return Ok(StageResult::Stop);
                    }
                    Some(other) => {
                        tracing::debug!(match_id = %self.cohort.match_id, ?other, "event ignored during ready check");
                    }
                }
            }
        }
    }

    /// Ready cancel cascade: clear keys, notify all ten, hint the
    /// survivors back into the queue with their original priority.
    async fn cancel_ready(
        &self,
        ready: &ReadyCheck,
        offenders: &[PlayerId],
        reason: &str,
    ) -> Result<()> {
        let snapshot = self.load_snapshot().await?;
        ready.clear(&self.cohort.match_id).await?;

        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::ReadyCheckFailed {
                    match_id: self.cohort.match_id.clone(),
                    declined_by: offenders.first().copied(),
                    reason: reason.to_string(),
                },
            )
            .await;

        self.requeue_survivors(&snapshot, offenders).await?;
        store::clear_match_keys(self.ctx.store.as_ref(), &self.cohort.match_id).await?;
        tracing::info!(match_id = %self.cohort.match_id, reason, "ready check cancelled");
        Ok(())
    }

    // ---- lobby / veto ----------------------------------------------------

    async fn lobby_phase(&mut self, lobby: &mut Lobby) -> Result<Option<u32>> {
        self.save_lobby(lobby).await?;
        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::LobbyReady {
                    match_id: self.cohort.match_id.clone(),
                    redirect_to: format!("/lobby/{}", self.cohort.match_id),
                },
            )
            .await;
        self.sync_lobby_views(lobby).await;
        self.announce_turn(lobby).await;

        let mut turn_deadline = Instant::now() + self.ctx.config.veto_turn_timeout;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.abort_lobby(lobby, &[], "SHUTDOWN", false).await?;
                    return Ok(None);
                }
                _ = tokio::time::sleep_until(turn_deadline) => {
                    let outcome = lobby.veto.timeout()?;
                    if self.after_veto(lobby, outcome).await? {
                        break;
                    }
                    turn_deadline = Instant::now() + self.ctx.config.veto_turn_timeout;
                }
                event = self.rx.recv() => match event {
                    None => return Ok(None),
                    Some(MatchEvent::Veto { player, map_id }) => {
                        match self.try_veto(lobby, player, &map_id).await? {
                            Some(selected) => {
                                if selected {
                                    break;
                                }
                                turn_deadline =
                                    Instant::now() + self.ctx.config.veto_turn_timeout;
                            }
                            None => {}
                        }
                    }
                    Some(MatchEvent::SwapRequest { from, to }) => {
                        self.handle_swap_request(lobby, from, to).await;
                    }
                    Some(MatchEvent::SwapAccept { player, request_id }) => {
                        self.handle_swap_accept(lobby, player, request_id).await?;
                    }
                    Some(MatchEvent::Chat { from, channel, message }) => {
                        self.route_chat(from, channel, &message).await;
                    }
                    Some(MatchEvent::Abandon(player)) => {
                        let grant = self.ctx.penalties.record_abandon(player).await?;
                        self.ctx
                            .outbound
                            .send_to(
                                player,
                                ServerMessage::CooldownSet {
                                    seconds: grant.seconds,
                                    ends_at: grant.ends_at,
                                },
                            )
                            .await;
                        self.abort_lobby(lobby, &[player], "ABANDONED", true).await?;
                        return Ok(None);
                    }
                    Some(MatchEvent::Disconnected(player)) => {
                        self.abort_lobby(lobby, &[player], "DISCONNECTED", true).await?;
                        return Ok(None);
                    }
                    Some(other) => {
                        tracing::debug!(match_id = %self.cohort.match_id, ?other, "event ignored during veto");
                    }
                }
            }
        }

        // Sole remaining map selected.
        lobby.transition_to(LobbyPhase::MapSelected)?;
        let selected = lobby
            .veto
            .selected()
            .cloned()
            .ok_or_else(|| crate::error::CoordinatorError::InvalidTransition(
                "map-selected phase without a selected map".to_string(),
            ))?;

        let batch = StoreBatch::new()
            .set(
                keys::lobby_selected_map(&self.cohort.match_id),
                serde_json::to_string(&selected)?,
                Some(keys::MATCH_KEY_TTL),
            )
            .set(
                keys::match_status(&self.cohort.match_id),
                "ready",
                Some(keys::MATCH_KEY_TTL),
            );
        self.ctx.store.batch(batch).await?;
        self.save_lobby(lobby).await?;
        self.ctx
            .matches
            .set_map(&self.cohort.match_id, &selected.map_id)
            .await?;

        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::MapSelected {
                    match_id: self.cohort.match_id.clone(),
                    map_id: selected.map_id.clone(),
                    map_number: selected.map_number,
                },
            )
            .await;

        Ok(Some(selected.map_number))
    }

    /// Validate and apply one veto. Returns Some(selected?) when the veto
    /// counted, None when it was rejected.
    async fn try_veto(
        &self,
        lobby: &mut Lobby,
        player: PlayerId,
        map_id: &str,
    ) -> Result<Option<bool>> {
        let turn = lobby.veto.current_turn();
        let leader = self.cohort.leader(turn).map(|p| p.player_id);
        if leader != Some(player) {
            tracing::debug!(match_id = %self.cohort.match_id, player = %player, "veto from non-leader ignored");
            return Ok(None);
        }
        match lobby.veto.apply(turn, map_id) {
            Ok(outcome) => {
                let selected = self.after_veto(lobby, outcome).await?;
                Ok(Some(selected))
            }
            Err(e) => {
                tracing::debug!(match_id = %self.cohort.match_id, error = %e, "veto rejected");
                Ok(None)
            }
        }
    }

    /// Broadcast one veto's effects. Returns true when the map got locked.
    async fn after_veto(&self, lobby: &mut Lobby, outcome: VetoOutcome) -> Result<bool> {
        self.ctx
            .store
            .set(
                &keys::lobby_vetos(&self.cohort.match_id),
                &serde_json::to_string(lobby.veto.history())?,
                Some(keys::MATCH_KEY_TTL),
            )
            .await?;
        self.save_lobby(lobby).await?;

        let record = lobby.veto.history().last().cloned();
        let (map_id, by_team, reason) = match record {
            Some(record) => (record.map_id, record.team, record.reason),
            None => return Ok(false),
        };
        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::VetoUpdate {
                    match_id: self.cohort.match_id.clone(),
                    map_id,
                    by_team,
                    reason,
                    remaining: lobby.veto.remaining_ids(),
                },
            )
            .await;

        match outcome {
            VetoOutcome::Continue { next_turn, .. } => {
                self.ctx
                    .outbound
                    .broadcast(
                        &self.cohort.player_ids(),
                        ServerMessage::TurnChange {
                            match_id: self.cohort.match_id.clone(),
                            current_turn: next_turn,
                            seconds: self.ctx.config.veto_turn_timeout.as_secs(),
                        },
                    )
                    .await;
                Ok(false)
            }
            VetoOutcome::Selected { .. } => Ok(true),
        }
    }

    async fn announce_turn(&self, lobby: &Lobby) {
        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::TurnChange {
                    match_id: self.cohort.match_id.clone(),
                    current_turn: lobby.veto.current_turn(),
                    seconds: self.ctx.config.veto_turn_timeout.as_secs(),
                },
            )
            .await;
    }

    async fn handle_swap_request(&self, lobby: &mut Lobby, from: PlayerId, to: PlayerId) {
        let same_team = match (self.cohort.side_of(from), self.cohort.side_of(to)) {
            (Some(a), Some(b)) => a == b && from != to,
            _ => false,
        };
        if !same_team {
            tracing::debug!(match_id = %self.cohort.match_id, "cross-team swap request ignored");
            return;
        }
        let request = lobby.swaps.request(from, to);
        let offered_role = lobby.role_of(from).unwrap_or(crate::player::Role::T1);
        self.ctx
            .outbound
            .send_to(
                to,
                ServerMessage::LobbySwapRequested {
                    match_id: self.cohort.match_id.clone(),
                    request_id: request.id,
                    from,
                    offered_role,
                },
            )
            .await;
    }

    async fn handle_swap_accept(
        &self,
        lobby: &mut Lobby,
        player: PlayerId,
        request_id: Uuid,
    ) -> Result<()> {
        let request = match lobby.swaps.accept(request_id, player) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(match_id = %self.cohort.match_id, error = %e, "swap accept rejected");
                return Ok(());
            }
        };
        lobby.apply_swap(&self.cohort, request.from, request.to)?;

        // Keep the durable role assignment in step with the swap.
        let classes_key = keys::match_classes(&self.cohort.match_id);
        let mut batch = StoreBatch::new();
        for player_id in [request.from, request.to] {
            if let Some(raw) = self.ctx.store.hget(&classes_key, &player_id.to_string()).await? {
                if let Ok(mut assignment) = serde_json::from_str::<ClassAssignment>(&raw) {
                    if let Some(role) = lobby.role_of(player_id) {
                        assignment.assigned_role = role;
                        batch = batch.hset(
                            &classes_key,
                            player_id.to_string(),
                            serde_json::to_string(&assignment)?,
                        );
                    }
                }
            }
        }
        self.ctx.store.batch(batch).await?;
        self.save_lobby(lobby).await?;

        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::LobbySwapCompleted {
                    match_id: self.cohort.match_id.clone(),
                    first: request.from,
                    second: request.to,
                },
            )
            .await;
        self.sync_lobby_views(lobby).await;
        Ok(())
    }

    /// Cancel out of the lobby: cancelled row, cleaned keys, survivors
    /// requeued. Offenders never get a requeue hint.
    async fn abort_lobby(
        &self,
        lobby: &mut Lobby,
        offenders: &[PlayerId],
        reason: &str,
        requeue: bool,
    ) -> Result<()> {
        let snapshot = self.load_snapshot().await?;
        lobby.transition_to(LobbyPhase::Closed)?;
        self.ctx
            .matches
            .cancel_match(&self.cohort.match_id, reason)
            .await?;
        store::clear_match_keys(self.ctx.store.as_ref(), &self.cohort.match_id).await?;

        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::MatchCancelled {
                    match_id: self.cohort.match_id.clone(),
                    reason: reason.to_string(),
                },
            )
            .await;

        if requeue {
            self.requeue_survivors(&snapshot, offenders).await?;
        }
        tracing::info!(match_id = %self.cohort.match_id, reason, "lobby aborted");
        Ok(())
    }

    // ---- host ------------------------------------------------------------

    async fn host_phase(
        &mut self,
        lobby: &mut Lobby,
        map_number: u32,
    ) -> Result<Option<HostAttempt>> {
        lobby.transition_to(LobbyPhase::HostSelecting)?;
        self.save_lobby(lobby).await?;

        let selector = HostSelector::new(
            self.ctx.store.clone(),
            self.ctx.matches.clone(),
            self.ctx.penalties.clone(),
            self.ctx.outbound.clone(),
            self.ctx.config.host_timeout,
        );
        let attempt = selector.start(&self.cohort, map_number).await?;
        let deadline = Instant::now() + self.ctx.config.host_timeout;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    selector.fail(&self.cohort, &attempt, "SHUTDOWN").await?;
                    return Ok(None);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.fail_host(&selector, &attempt, "TIMEOUT").await?;
                    return Ok(None);
                }
                event = self.rx.recv() => match event {
                    None => return Ok(None),
                    Some(MatchEvent::HostRoomCreated { player, room_id, map_number: confirmed_map }) => {
                        match selector
                            .confirm(&self.cohort, &attempt, player, &room_id, confirmed_map)
                            .await
                        {
                            Ok(()) => {
                                lobby.transition_to(LobbyPhase::InProgress)?;
                                self.save_lobby(lobby).await?;
                                return Ok(Some(HostAttempt {
                                    room_id,
                                    ..attempt.clone()
                                }));
                            }
                            Err(e) => {
                                tracing::debug!(match_id = %self.cohort.match_id, error = %e, "room confirmation rejected");
                            }
                        }
                    }
                    Some(MatchEvent::HostFailed { player, reason }) => {
                        if player == attempt.host {
                            self.fail_host(&selector, &attempt, &reason).await?;
                            return Ok(None);
                        }
                    }
                    Some(MatchEvent::Disconnected(player)) => {
                        if player == attempt.host {
                            self.fail_host(&selector, &attempt, "HOST_DISCONNECTED").await?;
                            return Ok(None);
                        }
                    }
                    Some(MatchEvent::Chat { from, channel, message }) => {
                        self.route_chat(from, channel, &message).await;
                    }
                    Some(other) => {
                        tracing::debug!(match_id = %self.cohort.match_id, ?other, "event ignored during host selection");
                    }
                }
            }
        }
    }

    async fn fail_host(
        &self,
        selector: &HostSelector,
        attempt: &HostAttempt,
        reason: &str,
    ) -> Result<()> {
        let snapshot = self.load_snapshot().await?;
        selector.fail(&self.cohort, attempt, reason).await?;
        self.requeue_survivors(&snapshot, &[attempt.host]).await?;
        Ok(())
    }

    // ---- validation ------------------------------------------------------

    async fn validation_phase(&mut self, map_number: u32, _attempt: &HostAttempt) -> Result<()> {
        let mut verdict_rx = self
            .ctx
            .validation
            .watch(self.cohort.clone(), map_number)
            .await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.ctx.validation.unwatch(&self.cohort.match_id).await;
                    return Ok(());
                }
                verdict = verdict_rx.recv() => {
                    match verdict {
                        None => return Ok(()),
                        Some(MatchVerdict::Completed { winner, players, .. }) => {
                            let players = players
                                .into_iter()
                                .map(|p| crate::session::messages::MatchEndedPlayer {
                                    player_id: p.player_id,
                                    team: p.team,
                                    mmr_change: p.mmr_change,
                                    abandoned: p.abandoned,
                                })
                                .collect();
                            self.ctx
                                .outbound
                                .broadcast(
                                    &self.cohort.player_ids(),
                                    ServerMessage::MatchEnded {
                                        match_id: self.cohort.match_id.clone(),
                                        winner,
                                        players,
                                    },
                                )
                                .await;
                            return Ok(());
                        }
                        Some(MatchVerdict::Invalid { reason }) => {
                            self.ctx
                                .outbound
                                .broadcast(
                                    &self.cohort.player_ids(),
                                    ServerMessage::MatchInvalid {
                                        match_id: self.cohort.match_id.clone(),
                                        reason,
                                    },
                                )
                                .await;
                            return Ok(());
                        }
                        Some(MatchVerdict::TimedOut) => {
                            self.ctx
                                .outbound
                                .broadcast(
                                    &self.cohort.player_ids(),
                                    ServerMessage::MatchCancelled {
                                        match_id: self.cohort.match_id.clone(),
                                        reason: "VALIDATION_TIMEOUT".to_string(),
                                    },
                                )
                                .await;
                            return Ok(());
                        }
                    }
                }
                event = self.rx.recv() => match event {
                    None => {
                        self.ctx.validation.unwatch(&self.cohort.match_id).await;
                        return Ok(());
                    }
                    Some(MatchEvent::Chat { from, channel, message }) => {
                        self.route_chat(from, channel, &message).await;
                    }
                    Some(other) => {
                        tracing::debug!(match_id = %self.cohort.match_id, ?other, "event ignored while in progress");
                    }
                }
            }
        }
    }

    // ---- shared helpers --------------------------------------------------

    async fn route_chat(&self, from: PlayerId, channel: ChatChannel, message: &str) {
        if !self.cohort.contains(from) || message.trim().is_empty() {
            return;
        }
        let sent_at = Utc::now().timestamp_millis();
        for recipient in chat_recipients(&self.cohort, from, channel) {
            let display = sender_name_for(&self.cohort, from, recipient);
            self.ctx
                .outbound
                .send_to(
                    recipient,
                    ServerMessage::ChatMessage {
                        match_id: self.cohort.match_id.clone(),
                        channel,
                        from: display,
                        message: message.to_string(),
                        sent_at,
                    },
                )
                .await;
        }
    }

    async fn sync_lobby_views(&self, lobby: &Lobby) {
        for player in &self.cohort.players {
            if let Some(view) = lobby.view_for(&self.cohort, player.player_id) {
                self.ctx
                    .outbound
                    .send_to(player.player_id, ServerMessage::LobbyData(view))
                    .await;
            }
        }
    }

    async fn save_lobby(&self, lobby: &Lobby) -> Result<()> {
        self.ctx
            .store
            .set(
                &keys::lobby_state(&self.cohort.match_id),
                &serde_json::to_string(lobby)?,
                Some(keys::MATCH_KEY_TTL),
            )
            .await
    }

    async fn load_snapshot(&self) -> Result<Vec<QueueEntry>> {
        match self
            .ctx
            .store
            .get(&keys::match_queue_snapshot(&self.cohort.match_id))
            .await?
        {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn requeue_survivors(
        &self,
        snapshot: &[QueueEntry],
        offenders: &[PlayerId],
    ) -> Result<()> {
        let hinted = self
            .ctx
            .queue
            .write_requeue_hints(snapshot, offenders)
            .await?;
        for entry in snapshot {
            if hinted.contains(&entry.player_id) {
                self.ctx
                    .outbound
                    .send_to(
                        entry.player_id,
                        ServerMessage::Requeue {
                            queued_at: entry.queued_at,
                        },
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Logical-failure escape hatch: cancel the row if it exists, clean
    /// keys, tell the players.
    async fn fail_logical(&self, reason: &str) -> Result<()> {
        let _ = self
            .ctx
            .matches
            .cancel_match(&self.cohort.match_id, reason)
            .await;
        store::clear_match_keys(self.ctx.store.as_ref(), &self.cohort.match_id).await?;
        self.ctx
            .outbound
            .broadcast(
                &self.cohort.player_ids(),
                ServerMessage::MatchCancelled {
                    match_id: self.cohort.match_id.clone(),
                    reason: "INTERNAL_ERROR".to_string(),
                },
            )
            .await;
        Ok(())
    }
}
