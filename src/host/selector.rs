//! Host selection: the strongest available player opens the game room.
//! Candidates are ordered by MMR descending; anyone carrying a host
//! cooldown is skipped unless nobody is left.

use crate::error::{CoordinatorError, Result};
use crate::penalty::PenaltyTracker;
use crate::persistence::MatchStore;
use crate::player::PlayerId;
use crate::session::{Outbound, ServerMessage};
use crate::store::{self, keys, StateStore, StoreBatch};
use crate::team::Cohort;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Persisted under `match:{id}:host` while the confirm window runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAttempt {
    pub match_id: String,
    pub host: PlayerId,
    pub password: String,
    pub room_id: String,
    pub started_at: i64,
    pub expires_at: i64,
}

/// Persisted under `match:{id}:room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: String,
    pub map_number: u32,
}

pub struct HostSelector {
    store: Arc<dyn StateStore>,
    matches: Arc<dyn MatchStore>,
    penalties: Arc<PenaltyTracker>,
    outbound: Arc<dyn Outbound>,
    pub timeout: Duration,
}

impl HostSelector {
    pub fn new(
        store: Arc<dyn StateStore>,
        matches: Arc<dyn MatchStore>,
        penalties: Arc<PenaltyTracker>,
        outbound: Arc<dyn Outbound>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            matches,
            penalties,
            outbound,
            timeout,
        }
    }

    /// Pick the host, reserve room credentials, and start the confirm
    /// window. The relational row must still be `ready`, otherwise the
    /// stage does not advance.
    pub async fn start(&self, cohort: &Cohort, map_number: u32) -> Result<HostAttempt> {
        let mut candidates: Vec<(i32, PlayerId)> = cohort
            .players
            .iter()
            .map(|p| (p.mmr, p.player_id))
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let mut host = None;
        for (_, candidate) in &candidates {
            if !self.penalties.host_cooldown_active(*candidate).await? {
                host = Some(*candidate);
                break;
            }
        }
        let host = match host {
            Some(host) => host,
            None => {
                // Everyone is in cooldown: take the strongest anyway
                // rather than burning the match for nine bystanders.
                tracing::warn!(match_id = %cohort.match_id, "all host candidates in cooldown");
                candidates[0].1
            }
        };

        let (password, room_id) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(1000..=9999).to_string(),
                rng.gen_range(1000..=9999).to_string(),
            )
        };
        let started_at = Utc::now().timestamp_millis();
        let attempt = HostAttempt {
            match_id: cohort.match_id.clone(),
            host,
            password: password.clone(),
            room_id: room_id.clone(),
            started_at,
            expires_at: started_at + self.timeout.as_millis() as i64,
        };
        let room = RoomInfo {
            room_id: room_id.clone(),
            map_number,
        };

        let batch = StoreBatch::new()
            .set(
                keys::match_host_password(&cohort.match_id),
                &password,
                Some(keys::MATCH_KEY_TTL),
            )
            .set(
                keys::match_room(&cohort.match_id),
                serde_json::to_string(&room)?,
                Some(keys::MATCH_KEY_TTL),
            )
            .set(
                keys::match_status(&cohort.match_id),
                "awaiting-host",
                Some(keys::MATCH_KEY_TTL),
            )
            .set(
                keys::match_host(&cohort.match_id),
                serde_json::to_string(&attempt)?,
                Some(keys::HOST_ATTEMPT_TTL),
            );
        self.store.batch(batch).await?;

        if !self.matches.set_host(&cohort.match_id, host).await? {
            return Err(CoordinatorError::InvalidTransition(format!(
                "match {} row left ready state before host assignment",
                cohort.match_id
            )));
        }

        self.outbound
            .send_to(
                host,
                ServerMessage::HostSelected {
                    match_id: cohort.match_id.clone(),
                    room_id,
                    password,
                    map_number,
                },
            )
            .await;
        for player in &cohort.players {
            if player.player_id != host {
                self.outbound
                    .send_to(
                        player.player_id,
                        ServerMessage::HostWaiting {
                            match_id: cohort.match_id.clone(),
                            host,
                        },
                    )
                    .await;
            }
        }

        tracing::info!(match_id = %cohort.match_id, host = %host, "host selected");
        Ok(attempt)
    }

    /// Host confirms the room. Accepted only from the active host; flips
    /// the match row to in-progress before validation starts.
    pub async fn confirm(
        &self,
        cohort: &Cohort,
        attempt: &HostAttempt,
        by: PlayerId,
        room_id: &str,
        map_number: u32,
    ) -> Result<()> {
        if by != attempt.host {
            return Err(CoordinatorError::NotActiveHost(cohort.match_id.clone()));
        }

        self.matches
            .confirm_room(&cohort.match_id, room_id, map_number)
            .await?;

        let room = RoomInfo {
            room_id: room_id.to_string(),
            map_number,
        };
        let batch = StoreBatch::new()
            .set(
                keys::match_status(&cohort.match_id),
                "in-progress",
                Some(keys::MATCH_KEY_TTL),
            )
            .set(
                keys::match_room(&cohort.match_id),
                serde_json::to_string(&room)?,
                Some(keys::MATCH_KEY_TTL),
            )
            .del(keys::match_host(&cohort.match_id));
        self.store.batch(batch).await?;

        self.outbound
            .broadcast(
                &cohort.player_ids(),
                ServerMessage::HostConfirmed {
                    match_id: cohort.match_id.clone(),
                    room_id: room_id.to_string(),
                    map_number,
                },
            )
            .await;

        tracing::info!(match_id = %cohort.match_id, room_id = %room_id, "room confirmed");
        Ok(())
    }

    /// Timeout or client-reported failure: cooldown the offender, cancel
    /// the match row, and drop every per-match key.
    pub async fn fail(&self, cohort: &Cohort, attempt: &HostAttempt, reason: &str) -> Result<()> {
        self.penalties
            .record_host_failure(attempt.host, reason)
            .await?;
        self.matches.cancel_match(&cohort.match_id, reason).await?;
        store::clear_match_keys(self.store.as_ref(), &cohort.match_id).await?;

        self.outbound
            .send_to(
                attempt.host,
                ServerMessage::HostFailed {
                    match_id: cohort.match_id.clone(),
                    reason: reason.to_string(),
                },
            )
            .await;

        tracing::warn!(match_id = %cohort.match_id, host = %attempt.host, reason, "host attempt failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{InMemoryMatchStore, MatchRecord};
    use crate::player::{ClassProfile, Role, TeamSide, WeaponClass};
    use crate::session::ConnectionRegistry;
    use crate::store::InMemoryStore;
    use crate::team::CohortPlayer;

    fn cohort() -> Cohort {
        let players = (1..=10u64)
            .map(|id| CohortPlayer {
                player_id: PlayerId(id),
                display_name: format!("player-{id}"),
                // Player 10 has the highest MMR and should host.
                mmr: 1400 + id as i32 * 10,
                classes: ClassProfile::new(WeaponClass::T1, WeaponClass::T2),
                queued_at: 0,
                team: if id <= 5 { TeamSide::Alpha } else { TeamSide::Bravo },
                role: Role::T1,
                was_autofill: false,
            })
            .collect();
        Cohort {
            match_id: "5".to_string(),
            players,
        }
    }

    struct Harness {
        selector: HostSelector,
        store: Arc<InMemoryStore>,
        matches: Arc<InMemoryMatchStore>,
        penalties: Arc<PenaltyTracker>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let matches = Arc::new(InMemoryMatchStore::new());
        let penalties = Arc::new(PenaltyTracker::new(store.clone()));
        matches
            .create_match(&MatchRecord::new("5", "quarry"))
            .await
            .unwrap();
        let selector = HostSelector::new(
            store.clone(),
            matches.clone(),
            penalties.clone(),
            Arc::new(ConnectionRegistry::new()),
            Duration::from_secs(120),
        );
        Harness {
            selector,
            store,
            matches,
            penalties,
        }
    }

    #[tokio::test]
    async fn highest_mmr_player_hosts() -> Result<()> {
        let h = harness().await;
        let attempt = h.selector.start(&cohort(), 1).await?;
        assert_eq!(attempt.host, PlayerId(10));
        assert_eq!(attempt.password.len(), 4);
        assert_eq!(attempt.room_id.len(), 4);

        assert_eq!(
            h.store.get(&keys::match_status("5")).await?,
            Some("awaiting-host".to_string())
        );
        let record = h.matches.load_match("5").await?.unwrap();
        assert_eq!(record.host, Some(PlayerId(10)));
        Ok(())
    }

    #[tokio::test]
    async fn cooldown_candidates_are_skipped() -> Result<()> {
        let h = harness().await;
        h.penalties
            .record_host_failure(PlayerId(10), "TIMEOUT")
            .await?;
        let attempt = h.selector.start(&cohort(), 1).await?;
        assert_eq!(attempt.host, PlayerId(9));
        Ok(())
    }

    #[tokio::test]
    async fn all_in_cooldown_picks_first_anyway() -> Result<()> {
        let h = harness().await;
        for id in 1..=10 {
            h.penalties
                .record_host_failure(PlayerId(id), "TIMEOUT")
                .await?;
        }
        let attempt = h.selector.start(&cohort(), 1).await?;
        assert_eq!(attempt.host, PlayerId(10));
        Ok(())
    }

    #[tokio::test]
    async fn confirm_rejects_non_host() -> Result<()> {
        let h = harness().await;
        let cohort = cohort();
        let attempt = h.selector.start(&cohort, 1).await?;
        let err = h
            .selector
            .confirm(&cohort, &attempt, PlayerId(3), "7777", 1)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "NOT_ACTIVE_HOST");
        Ok(())
    }

    #[tokio::test]
    async fn confirm_flips_row_in_progress_and_drops_host_key() -> Result<()> {
        let h = harness().await;
        let cohort = cohort();
        let attempt = h.selector.start(&cohort, 1).await?;
        h.selector
            .confirm(&cohort, &attempt, attempt.host, "7777", 1)
            .await?;

        let record = h.matches.load_match("5").await?.unwrap();
        assert_eq!(record.room_id.as_deref(), Some("7777"));
        assert!(!h.store.exists(&keys::match_host("5")).await?);
        assert_eq!(
            h.store.get(&keys::match_status("5")).await?,
            Some("in-progress".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn failure_cooldowns_host_and_cancels_row() -> Result<()> {
        let h = harness().await;
        let cohort = cohort();
        let attempt = h.selector.start(&cohort, 1).await?;
        h.selector.fail(&cohort, &attempt, "TIMEOUT").await?;

        assert!(h.penalties.host_cooldown_active(attempt.host).await?);
        let record = h.matches.load_match("5").await?.unwrap();
        assert_eq!(record.end_reason.as_deref(), Some("TIMEOUT"));
        assert!(!h.store.exists(&keys::match_status("5")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn stale_row_blocks_host_assignment() -> Result<()> {
        let h = harness().await;
        h.matches.cancel_match("5", "TEST").await?;
        assert!(h.selector.start(&cohort(), 1).await.is_err());
        Ok(())
    }
}
