//! Twenty-second ready consensus over the `match:{id}:ready` hash.
//!
//! Every player must explicitly accept. The `_status` field is the
//! completion latch: once it reads COMPLETING no decline or late accept
//! can change the outcome.

use crate::error::Result;
use crate::player::PlayerId;
use crate::session::{Outbound, ServerMessage};
use crate::store::{keys, StateStore, StoreBatch};
use crate::team::Cohort;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const FIELD_STATUS: &str = "_status";
const FIELD_STARTED_AT: &str = "_startedAt";
const FIELD_EXPIRES_AT: &str = "_expiresAt";
const FIELD_TOTAL: &str = "_totalPlayers";

const STATUS_PENDING: &str = "PENDING";
const STATUS_READY: &str = "READY";
const STATUS_COMPLETING: &str = "COMPLETING";

/// Outcome of a single accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyProgress {
    Updated { ready: usize, total: usize },
    Completed,
    /// Late, duplicate, or post-latch accept; dropped without effect.
    Ignored,
}

pub struct ReadyCheck {
    store: Arc<dyn StateStore>,
    outbound: Arc<dyn Outbound>,
    pub timeout: Duration,
}

impl ReadyCheck {
    pub fn new(store: Arc<dyn StateStore>, outbound: Arc<dyn Outbound>, timeout: Duration) -> Self {
        Self {
            store,
            outbound,
            timeout,
        }
    }

    /// Initialize the ready hash and tell every player a match was found.
    pub async fn start(&self, cohort: &Cohort) -> Result<()> {
        let key = keys::match_ready(&cohort.match_id);
        let now = Utc::now().timestamp_millis();
        let expires = now + self.timeout.as_millis() as i64;

        let mut batch = StoreBatch::new();
        for player in &cohort.players {
            batch = batch.hset(&key, player.player_id.to_string(), STATUS_PENDING);
        }
        batch = batch
            .hset(&key, FIELD_STATUS, STATUS_PENDING)
            .hset(&key, FIELD_STARTED_AT, now.to_string())
            .hset(&key, FIELD_EXPIRES_AT, expires.to_string())
            .hset(&key, FIELD_TOTAL, cohort.players.len().to_string())
            .expire(&key, keys::READY_HASH_TTL)
            .set(
                keys::lobby_temp(&cohort.match_id),
                serde_json::to_string(cohort)?,
                Some(keys::LOBBY_TEMP_TTL),
            );
        self.store.batch(batch).await?;

        for player in &cohort.players {
            self.outbound
                .send_to(
                    player.player_id,
                    ServerMessage::MatchFound {
                        match_id: cohort.match_id.clone(),
                        team: player.team,
                        role: player.role,
                        ready_seconds: self.timeout.as_secs(),
                    },
                )
                .await;
        }
        Ok(())
    }

    /// Record an accept. Broadcasts the running count; flips the latch
    /// when the last player accepts.
    pub async fn accept(&self, cohort: &Cohort, player: PlayerId) -> Result<ReadyProgress> {
        let key = keys::match_ready(&cohort.match_id);
        let hash = self.store.hgetall(&key).await?;
        if hash.is_empty() {
            return Ok(ReadyProgress::Ignored);
        }
        if hash.get(FIELD_STATUS).map(String::as_str) == Some(STATUS_COMPLETING) {
            return Ok(ReadyProgress::Ignored);
        }
        if hash.get(&player.to_string()).map(String::as_str) != Some(STATUS_PENDING) {
            return Ok(ReadyProgress::Ignored);
        }

        self.store
            .hset(&key, &player.to_string(), STATUS_READY)
            .await?;

        let total = cohort.players.len();
        let ready = {
            let hash = self.store.hgetall(&key).await?;
            cohort
                .players
                .iter()
                .filter(|p| hash.get(&p.player_id.to_string()).map(String::as_str) == Some(STATUS_READY))
                .count()
        };

        self.outbound
            .send_to(
                player,
                ServerMessage::ReadyAccepted {
                    match_id: cohort.match_id.clone(),
                },
            )
            .await;
        self.outbound
            .broadcast(
                &cohort.player_ids(),
                ServerMessage::ReadyUpdate {
                    match_id: cohort.match_id.clone(),
                    ready,
                    total,
                },
            )
            .await;

        if ready == total {
            self.store
                .hset(&key, FIELD_STATUS, STATUS_COMPLETING)
                .await?;
            return Ok(ReadyProgress::Completed);
        }
        Ok(ReadyProgress::Updated { ready, total })
    }

    /// Players who never accepted (timeout offenders).
    pub async fn pending_players(&self, cohort: &Cohort) -> Result<Vec<PlayerId>> {
        let hash = self
            .store
            .hgetall(&keys::match_ready(&cohort.match_id))
            .await?;
        Ok(cohort
            .players
            .iter()
            .filter(|p| {
                hash.get(&p.player_id.to_string()).map(String::as_str) != Some(STATUS_READY)
            })
            .map(|p| p.player_id)
            .collect())
    }

    /// Tear down the ready hash and the temporary lobby key.
    pub async fn clear(&self, match_id: &str) -> Result<()> {
        let batch = StoreBatch::new()
            .del(keys::match_ready(match_id))
            .del(keys::lobby_temp(match_id));
        self.store.batch(batch).await
    }
}
