use super::entry::{QueueEntry, RequeueHint};
use super::picker::pick_role_contract;
use super::window::WindowPolicy;
use crate::error::{CoordinatorError, Result};
use crate::penalty::PenaltyTracker;
use crate::persistence::MatchStore;
use crate::player::{ClassProfile, PlayerId};
use crate::store::{keys, StateStore, StoreBatch};
use crate::team::{build_teams, Cohort, CohortPlayer};
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone)]
pub struct QueueEngineConfig {
    /// Matchmaking tick cadence.
    pub tick_interval: Duration,
    /// Wait after which a player may be flexed onto any role.
    pub flex_after: Duration,
    /// Oldest-entry wait that triggers the hard-autofill emergency pass.
    pub emergency_after: Duration,
    pub window: WindowPolicy,
}

impl Default for QueueEngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(3500),
            flex_after: Duration::from_secs(120),
            emergency_after: Duration::from_secs(300),
            window: WindowPolicy::default(),
        }
    }
}

impl QueueEngineConfig {
    /// Short timings for tests.
    pub fn fast() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            ..Self::default()
        }
    }
}

/// Admits players, runs the matchmaking loop, and publishes cohorts.
///
/// The in-memory entry map is the working set; every entry is mirrored to
/// the state store under `queue:ranked:{id}` so a restart can rebuild it.
pub struct QueueEngine {
    config: QueueEngineConfig,
    store: Arc<dyn StateStore>,
    players: Arc<dyn MatchStore>,
    penalties: Arc<PenaltyTracker>,
    entries: Arc<RwLock<HashMap<PlayerId, QueueEntry>>>,
    tick_running: AtomicBool,
    loop_running: AtomicBool,
    cohorts: mpsc::Sender<Cohort>,
}

impl QueueEngine {
    pub fn new(
        config: QueueEngineConfig,
        store: Arc<dyn StateStore>,
        players: Arc<dyn MatchStore>,
        penalties: Arc<PenaltyTracker>,
        cohorts: mpsc::Sender<Cohort>,
    ) -> Self {
        Self {
            config,
            store,
            players,
            penalties,
            entries: Arc::new(RwLock::new(HashMap::new())),
            tick_running: AtomicBool::new(false),
            loop_running: AtomicBool::new(false),
            cohorts,
        }
    }

    /// Admit a player into the ranked queue. A pending requeue hint is
    /// consumed here and restores the original `queued_at`. The caller
    /// schedules the matchmaking loop after a successful admit.
    pub async fn admit(
        &self,
        player_id: PlayerId,
        classes: Option<ClassProfile>,
    ) -> Result<QueueEntry> {
        let player = self
            .players
            .find_player(player_id)
            .await?
            .ok_or(CoordinatorError::UserNotFound(player_id))?;

        let now = Utc::now().timestamp_millis();
        if let Some(until) = player.active_ban(now) {
            return Err(CoordinatorError::Banned { until });
        }

        if let Some(social_id) = &player.social_id {
            if let Some(existing) = self.players.find_player_by_social_id(social_id).await? {
                if existing.id != player.id {
                    return Err(CoordinatorError::DuplicateSocialId {
                        existing_account: existing.id,
                    });
                }
            }
        }

        if self.entries.read().await.contains_key(&player_id) {
            return Err(CoordinatorError::AlreadyInQueue(player_id));
        }

        if let Some(ends_at) = self.penalties.active_cooldown(player_id).await? {
            return Err(CoordinatorError::CooldownActive { ends_at });
        }

        let hint_key = keys::requeue_hint(player_id);
        let hint: Option<RequeueHint> = match self.store.get(&hint_key).await? {
            Some(raw) => {
                self.store.del(&hint_key).await?;
                serde_json::from_str(&raw).ok()
            }
            None => None,
        };

        let entry = QueueEntry {
            player_id,
            display_name: player.display_name.clone(),
            mmr: player.mmr,
            classes: classes
                .or(hint.as_ref().map(|h| h.classes))
                .unwrap_or(player.classes),
            queued_at: hint.map(|h| h.queued_at).unwrap_or(now),
            party_id: None,
        };

        self.store
            .set(
                &keys::queue_entry(player_id),
                &serde_json::to_string(&entry)?,
                Some(keys::QUEUE_ENTRY_TTL),
            )
            .await?;
        self.entries.write().await.insert(player_id, entry.clone());

        tracing::debug!(player = %player_id, queued_at = entry.queued_at, "player admitted to queue");
        Ok(entry)
    }

    /// Idempotent removal; the loop tears itself down once the queue
    /// empties.
    pub async fn remove(&self, player_id: PlayerId) -> Result<bool> {
        let removed = self.entries.write().await.remove(&player_id).is_some();
        self.store.del(&keys::queue_entry(player_id)).await?;
        Ok(removed)
    }

    pub async fn queue_size(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, player_id: PlayerId) -> bool {
        self.entries.read().await.contains_key(&player_id)
    }

    /// Spawn the periodic matchmaking loop if it is not already running.
    pub fn ensure_loop(self: Arc<Self>) {
        if self.loop_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let engine = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !engine.loop_running.load(Ordering::SeqCst) {
                    break;
                }
                if engine.entries.read().await.is_empty() {
                    engine.loop_running.store(false, Ordering::SeqCst);
                    break;
                }
                if let Err(e) = engine.run_tick().await {
                    tracing::warn!(error = %e, "matchmaking tick failed");
                }
            }
        });
    }

    pub fn stop_loop(&self) {
        self.loop_running.store(false, Ordering::SeqCst);
    }

    /// One matchmaking pass. Single-flight: overlapping invocations drop
    /// out immediately.
    pub async fn run_tick(&self) -> Result<usize> {
        if self.tick_running.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let result = self.tick_inner().await;
        self.tick_running.store(false, Ordering::SeqCst);
        result
    }

    async fn tick_inner(&self) -> Result<usize> {
        let mut published = 0;

        loop {
            let mut snapshot: Vec<QueueEntry> =
                self.entries.read().await.values().cloned().collect();
            if snapshot.len() < 10 {
                break;
            }
            snapshot.sort_by_key(|e| e.queued_at);
            let now = Utc::now().timestamp_millis();
            let flex_after_ms = self.config.flex_after.as_millis() as i64;

            let mut formed: Option<Vec<QueueEntry>> = None;
            for reference in &snapshot {
                let window = self
                    .config
                    .window
                    .window(reference.mmr, reference.wait_ms(now));
                let pool: Vec<QueueEntry> = snapshot
                    .iter()
                    .filter(|e| (e.mmr - reference.mmr).abs() <= window)
                    .cloned()
                    .collect();
                if pool.len() < 10 {
                    continue;
                }
                if let Some(picked) = pick_role_contract(&pool, now, flex_after_ms) {
                    formed = Some(picked);
                    break;
                }
            }

            if formed.is_none() {
                formed = self.emergency_pass(&snapshot, now);
            }

            match formed {
                Some(picked) => {
                    if self.publish_cohort(picked).await? {
                        published += 1;
                    } else {
                        break;
                    }
                }
                None => break,
            }
        }

        Ok(published)
    }

    /// Hard autofill once the oldest entry has waited past the emergency
    /// threshold: take the ten oldest players inside the oldest entry's
    /// window, role contract be damned.
    fn emergency_pass(&self, snapshot: &[QueueEntry], now: i64) -> Option<Vec<QueueEntry>> {
        let oldest = snapshot.first()?;
        if oldest.wait_ms(now) < self.config.emergency_after.as_millis() as i64 {
            return None;
        }
        let window = self.config.window.window(oldest.mmr, oldest.wait_ms(now));
        let pool: Vec<QueueEntry> = snapshot
            .iter()
            .filter(|e| (e.mmr - oldest.mmr).abs() <= window)
            .cloned()
            .collect();
        if pool.len() < 10 {
            return None;
        }
        tracing::info!(player = %oldest.player_id, "emergency autofill pass engaged");
        Some(pool.into_iter().take(10).collect())
    }

    /// Balance teams and publish. On solver failure the entries simply
    /// stay queued; on success the ten queue keys are removed and the
    /// per-match keys written in one atomic batch.
    async fn publish_cohort(&self, picked: Vec<QueueEntry>) -> Result<bool> {
        let split = match build_teams(&picked) {
            Ok(split) => split,
            Err(e) => {
                tracing::warn!(error = %e, "cohort rejected by team solver");
                return Ok(false);
            }
        };

        let seq = self
            .store
            .incr(&keys::match_counter(), Some(keys::MATCH_COUNTER_TTL))
            .await?;
        let match_id = seq.to_string();

        let mut players: Vec<CohortPlayer> = split
            .placements
            .iter()
            .map(|p| {
                let entry = &picked[p.entry_index];
                CohortPlayer {
                    player_id: entry.player_id,
                    display_name: entry.display_name.clone(),
                    mmr: entry.mmr,
                    classes: entry.classes,
                    queued_at: entry.queued_at,
                    team: p.team,
                    role: p.role,
                    was_autofill: p.was_autofill,
                }
            })
            .collect();
        players.shuffle(&mut rand::thread_rng());

        let classes_key = keys::match_classes(&match_id);
        let mut batch = StoreBatch::new();
        for player in &players {
            let assignment = crate::team::cohort::ClassAssignment {
                primary: player.classes.primary,
                secondary: player.classes.secondary,
                assigned_role: player.role,
                was_autofill: player.was_autofill,
            };
            batch = batch.hset(
                &classes_key,
                player.player_id.to_string(),
                serde_json::to_string(&assignment)?,
            );
        }
        batch = batch
            .expire(&classes_key, keys::MATCH_KEY_TTL)
            .set(
                keys::match_queue_snapshot(&match_id),
                serde_json::to_string(&picked)?,
                Some(keys::MATCH_KEY_TTL),
            );
        for entry in &picked {
            batch = batch.del(keys::queue_entry(entry.player_id));
        }
        self.store.batch(batch).await?;

        {
            let mut entries = self.entries.write().await;
            for entry in &picked {
                entries.remove(&entry.player_id);
            }
        }

        tracing::info!(
            match_id = %match_id,
            mmr_diff = split.mmr_diff,
            "cohort published"
        );

        let cohort = Cohort { match_id, players };
        if self.cohorts.send(cohort).await.is_err() {
            tracing::error!("cohort channel closed; pipeline is gone");
        }
        Ok(true)
    }

    /// Write requeue hints for every survivor except the offenders, so
    /// their next join keeps the original priority.
    pub async fn write_requeue_hints(
        &self,
        survivors: &[QueueEntry],
        exclude: &[PlayerId],
    ) -> Result<Vec<PlayerId>> {
        let mut hinted = Vec::new();
        for entry in survivors {
            if exclude.contains(&entry.player_id) {
                continue;
            }
            let hint = RequeueHint {
                queued_at: entry.queued_at,
                classes: entry.classes,
            };
            self.store
                .set(
                    &keys::requeue_hint(entry.player_id),
                    &serde_json::to_string(&hint)?,
                    Some(keys::REQUEUE_HINT_TTL),
                )
                .await?;
            hinted.push(entry.player_id);
        }
        Ok(hinted)
    }
}
