//! Out-of-band match validation. A single polling loop fetches logs for
//! every in-flight match in one round-trip, accumulates evidence per
//! match, and settles, invalidates, or times each one out.

use super::classify::{validate_teams, Classification};
use crate::error::Result;
use crate::persistence::{
    LogQuery, MatchLogRow, MatchLogSource, MatchRecordStatus, MatchStore, PlayerResultRow,
    PlayerStatsRow,
};
use crate::player::{MatchOutcome, PlayerId, RankFunction, TeamSide};
use crate::store::{self, StateStore};
use crate::team::Cohort;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub game_mode: u8,
    /// Poll cadence while every match is younger than `aggressive_after`.
    pub monitoring_interval: Duration,
    /// Poll cadence once any match has aged past `aggressive_after`.
    pub aggressive_interval: Duration,
    pub aggressive_after: Duration,
    /// Partial evidence settles after this many polls with no new rows.
    pub stable_attempts: u32,
    pub max_attempts: u32,
    pub max_elapsed: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            game_mode: 5,
            monitoring_interval: Duration::from_secs(30),
            aggressive_interval: Duration::from_secs(10),
            aggressive_after: Duration::from_secs(600),
            stable_attempts: 3,
            max_attempts: 100,
            max_elapsed: Duration::from_secs(50 * 60),
        }
    }
}

impl ValidationConfig {
    pub fn fast() -> Self {
        Self {
            monitoring_interval: Duration::from_millis(50),
            aggressive_interval: Duration::from_millis(20),
            aggressive_after: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

/// Final word on a watched match, delivered to its actor.
#[derive(Debug, Clone)]
pub enum MatchVerdict {
    Completed {
        winner: TeamSide,
        score_alpha: i32,
        score_bravo: i32,
        players: Vec<SettledPlayer>,
    },
    Invalid {
        reason: String,
    },
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SettledPlayer {
    pub player_id: PlayerId,
    pub team: TeamSide,
    pub mmr_change: i32,
    pub abandoned: bool,
}

struct Watched {
    cohort: Cohort,
    map_number: u32,
    started_at: DateTime<Utc>,
    attempts: u32,
    stable_polls: u32,
    rows: HashMap<PlayerId, MatchLogRow>,
    notify: mpsc::Sender<MatchVerdict>,
}

pub struct ValidationEngine {
    config: ValidationConfig,
    logs: Arc<dyn MatchLogSource>,
    matches: Arc<dyn MatchStore>,
    store: Arc<dyn StateStore>,
    rank: Arc<dyn RankFunction>,
    active: RwLock<HashMap<String, Watched>>,
    last_check: RwLock<DateTime<Utc>>,
}

impl ValidationEngine {
    pub fn new(
        config: ValidationConfig,
        logs: Arc<dyn MatchLogSource>,
        matches: Arc<dyn MatchStore>,
        store: Arc<dyn StateStore>,
        rank: Arc<dyn RankFunction>,
    ) -> Self {
        Self {
            config,
            logs,
            matches,
            store,
            rank,
            active: RwLock::new(HashMap::new()),
            last_check: RwLock::new(Utc::now()),
        }
    }

    /// Start watching a confirmed match; the verdict arrives on the
    /// returned channel.
    pub async fn watch(&self, cohort: Cohort, map_number: u32) -> mpsc::Receiver<MatchVerdict> {
        let (tx, rx) = mpsc::channel(1);
        let watched = Watched {
            map_number,
            started_at: Utc::now(),
            attempts: 0,
            stable_polls: 0,
            rows: HashMap::new(),
            notify: tx,
            cohort,
        };
        let mut active = self.active.write().await;
        active.insert(watched.cohort.match_id.clone(), watched);
        rx
    }

    pub async fn unwatch(&self, match_id: &str) {
        self.active.write().await.remove(match_id);
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Monitoring cadence normally; aggressive once anything is old.
    pub async fn current_interval(&self) -> Duration {
        let active = self.active.read().await;
        let now = Utc::now();
        let any_aged = active.values().any(|w| {
            (now - w.started_at).num_milliseconds() as u128
                > self.config.aggressive_after.as_millis()
        });
        if any_aged {
            self.config.aggressive_interval
        } else {
            self.config.monitoring_interval
        }
    }

    pub fn spawn_loop(self: Arc<Self>, cancel: CancellationToken) {
        tokio::spawn(async move {
            loop {
                let interval = self.current_interval().await;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if let Err(e) = self.run_tick().await {
                    tracing::warn!(error = %e, "validation tick failed");
                }
            }
        });
    }

    /// One polling pass: a single log fetch covering all active matches,
    /// then per-match evaluation.
    pub async fn run_tick(&self) -> Result<()> {
        let since = *self.last_check.read().await;
        let now = Utc::now();

        let (player_union, earliest_start) = {
            let active = self.active.read().await;
            if active.is_empty() {
                *self.last_check.write().await = now;
                return Ok(());
            }
            let mut union: Vec<PlayerId> = Vec::new();
            let mut earliest = now;
            for watched in active.values() {
                union.extend(watched.cohort.player_ids());
                earliest = earliest.min(watched.started_at);
            }
            union.sort();
            union.dedup();
            (union, earliest)
        };

        let query = LogQuery {
            game_mode: self.config.game_mode,
            valid_only: true,
            since: since.min(earliest_start - chrono::Duration::seconds(30)),
            until: now,
            player_ids: player_union,
        };
        let fetched = self.logs.fetch_logs(&query).await?;
        *self.last_check.write().await = now;

        let mut finished: Vec<(String, MatchVerdict)> = Vec::new();
        {
            let mut active = self.active.write().await;
            for (match_id, watched) in active.iter_mut() {
                watched.attempts += 1;

                // Clients stamp rows before the coordinator observes the
                // room confirm; accept a short skew behind started_at.
                let earliest = watched.started_at - chrono::Duration::seconds(30);
                let fresh: Vec<&MatchLogRow> = fetched
                    .iter()
                    .filter(|row| {
                        row.map_number == watched.map_number
                            && row.logged_at >= earliest
                            && watched.cohort.contains(row.player_id)
                    })
                    .collect();
                let mut grew = false;
                for row in fresh {
                    if watched.rows.insert(row.player_id, row.clone()).is_none() {
                        grew = true;
                    }
                }
                watched.stable_polls = if grew { 0 } else { watched.stable_polls + 1 };

                if let Some(verdict) = self.evaluate(watched, now).await? {
                    finished.push((match_id.clone(), verdict));
                }
            }
            for (match_id, _) in &finished {
                active.remove(match_id);
            }
        }

        for (match_id, verdict) in finished {
            store::clear_match_keys(self.store.as_ref(), &match_id).await?;
            tracing::info!(
                match_id = %match_id,
                verdict = match &verdict {
                    MatchVerdict::Completed { .. } => "completed",
                    MatchVerdict::Invalid { .. } => "invalid",
                    MatchVerdict::TimedOut => "timed-out",
                },
                "validation verdict delivered"
            );
        }
        Ok(())
    }

    /// Decide whether a match is ready for a verdict this tick. Settles
    /// the databases as a side effect on completion/invalidation.
    async fn evaluate(&self, watched: &mut Watched, now: DateTime<Utc>) -> Result<Option<MatchVerdict>> {
        let expected = watched.cohort.players.len();
        let min_distinct = expected.min(6);
        let distinct = watched.rows.len();

        let evidence_complete = distinct >= expected;
        let evidence_stable =
            distinct >= min_distinct && watched.stable_polls >= self.config.stable_attempts;

        if evidence_complete || evidence_stable {
            let rows: Vec<MatchLogRow> = watched.rows.values().cloned().collect();
            return match validate_teams(&watched.cohort, &rows) {
                Some(classification) => {
                    let verdict = self.settle(watched, &classification, now).await?;
                    let _ = watched.notify.send(verdict.clone()).await;
                    Ok(Some(verdict))
                }
                None => {
                    let reason = "INVALID_TEAMS".to_string();
                    self.matches
                        .cancel_match(&watched.cohort.match_id, &reason)
                        .await?;
                    let verdict = MatchVerdict::Invalid { reason };
                    let _ = watched.notify.send(verdict.clone()).await;
                    Ok(Some(verdict))
                }
            };
        }

        let elapsed = now - watched.started_at;
        if watched.attempts >= self.config.max_attempts
            || elapsed.num_milliseconds() as u128 > self.config.max_elapsed.as_millis()
        {
            self.matches
                .cancel_match(&watched.cohort.match_id, "VALIDATION_TIMEOUT")
                .await?;
            let verdict = MatchVerdict::TimedOut;
            let _ = watched.notify.send(verdict.clone()).await;
            return Ok(Some(verdict));
        }

        Ok(None)
    }

    /// Write the final result: match row, per-player rows, rating and
    /// ladder updates. Idempotent: an already-completed row is left alone.
    async fn settle(
        &self,
        watched: &Watched,
        classification: &Classification,
        now: DateTime<Utc>,
    ) -> Result<MatchVerdict> {
        let match_id = &watched.cohort.match_id;
        let already_settled = matches!(
            self.matches.load_match(match_id).await?.map(|r| r.status),
            Some(MatchRecordStatus::Completed)
        );

        let mut settled_players = Vec::with_capacity(watched.cohort.players.len());
        let mut result_rows = Vec::with_capacity(watched.cohort.players.len());

        for player in &watched.cohort.players {
            let outcome = if player.team == classification.winner {
                MatchOutcome::Win
            } else {
                MatchOutcome::Loss
            };
            let opponent_avg = watched.cohort.team_avg_mmr(player.team.opposite());
            let log = watched.rows.get(&player.player_id);
            let abandoned = log.is_none();

            let mmr_change = match self.matches.find_player(player.player_id).await? {
                Some(profile) => {
                    let adjustment =
                        self.rank
                            .adjust(profile.mmr, profile.rank, opponent_avg, outcome);
                    if !already_settled {
                        self.matches
                            .update_player_rating(
                                player.player_id,
                                profile.mmr + adjustment.mmr_change,
                                adjustment.new_rank,
                            )
                            .await?;

                        let stats = self.matches.load_player_stats(player.player_id).await?;
                        let (played, won) = stats
                            .as_ref()
                            .map(|s| (s.matches_played, s.matches_won))
                            .unwrap_or((0, 0));
                        self.matches
                            .upsert_player_stats(&PlayerStatsRow {
                                player_id: player.player_id,
                                rank_tier: adjustment.new_rank.tier,
                                rank_points: adjustment.new_rank.points,
                                elo_rating: profile.mmr + adjustment.mmr_change,
                                matches_played: played + 1,
                                matches_won: won
                                    + if outcome == MatchOutcome::Win { 1 } else { 0 },
                                placement_completed: stats
                                    .map(|s| s.placement_completed)
                                    .unwrap_or(false),
                                last_match_at: now,
                                updated_at: now,
                            })
                            .await?;
                    }
                    adjustment.mmr_change
                }
                None => {
                    tracing::warn!(player = %player.player_id, "settling unknown player profile");
                    0
                }
            };

            settled_players.push(SettledPlayer {
                player_id: player.player_id,
                team: player.team,
                mmr_change,
                abandoned,
            });
            result_rows.push(PlayerResultRow {
                match_id: match_id.clone(),
                player_id: player.player_id,
                team: player.team,
                kills: log.map(|l| l.kills).unwrap_or(0),
                deaths: log.map(|l| l.deaths).unwrap_or(0),
                assists: log.map(|l| l.assists).unwrap_or(0),
                headshots: log.map(|l| l.headshots).unwrap_or(0),
                mmr_change,
                placement_seeding_bonus: 0,
                abandoned,
                confirmed_result: !abandoned,
                confirmed_at: (!abandoned).then_some(now),
            });
        }

        if !already_settled {
            let duration = (now - watched.started_at).num_seconds();
            self.matches
                .complete_match(
                    match_id,
                    classification.winner,
                    classification.score_alpha,
                    classification.score_bravo,
                    duration,
                )
                .await?;
            self.matches.insert_player_results(&result_rows).await?;
        }

        Ok(MatchVerdict::Completed {
            winner: classification.winner,
            score_alpha: classification.score_alpha,
            score_bravo: classification.score_bravo,
            players: settled_players,
        })
    }
}
