use super::records::{MatchRecord, MatchRecordStatus, PlayerResultRow, PlayerStatsRow};
use super::traits::MatchStore;
use crate::error::{CoordinatorError, Result};
use crate::player::{Player, PlayerId, PlayerRank, TeamSide};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory relational store (for development/testing).
pub struct InMemoryMatchStore {
    players: Arc<RwLock<HashMap<PlayerId, Player>>>,
    matches: Arc<RwLock<HashMap<String, MatchRecord>>>,
    player_results: Arc<RwLock<Vec<PlayerResultRow>>>,
    player_stats: Arc<RwLock<HashMap<PlayerId, PlayerStatsRow>>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self {
            players: Arc::new(RwLock::new(HashMap::new())),
            matches: Arc::new(RwLock::new(HashMap::new())),
            player_results: Arc::new(RwLock::new(Vec::new())),
            player_stats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Test helper: all settlement rows recorded for a match.
    pub async fn results_for(&self, match_id: &str) -> Vec<PlayerResultRow> {
        self.player_results
            .read()
            .await
            .iter()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>> {
        let players = self.players.read().await;
        Ok(players.get(&id).cloned())
    }

    async fn find_player_by_social_id(&self, social_id: &str) -> Result<Option<Player>> {
        let players = self.players.read().await;
        Ok(players
            .values()
            .find(|p| p.social_id.as_deref() == Some(social_id))
            .cloned())
    }

    async fn upsert_player(&self, player: &Player) -> Result<()> {
        let mut players = self.players.write().await;
        players.insert(player.id, player.clone());
        Ok(())
    }

    async fn update_player_rating(&self, id: PlayerId, mmr: i32, rank: PlayerRank) -> Result<()> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(&id)
            .ok_or(CoordinatorError::UserNotFound(id))?;
        player.mmr = mmr;
        player.rank = rank;
        Ok(())
    }

    async fn create_match(&self, record: &MatchRecord) -> Result<()> {
        let mut matches = self.matches.write().await;
        matches.insert(record.match_id.clone(), record.clone());
        Ok(())
    }

    async fn load_match(&self, match_id: &str) -> Result<Option<MatchRecord>> {
        let matches = self.matches.read().await;
        Ok(matches.get(match_id).cloned())
    }

    async fn update_status(&self, match_id: &str, status: MatchRecordStatus) -> Result<()> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        record.status = status;
        Ok(())
    }

    async fn set_map(&self, match_id: &str, map: &str) -> Result<()> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        record.map = Some(map.to_string());
        Ok(())
    }

    async fn set_host(&self, match_id: &str, host: PlayerId) -> Result<bool> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        if record.status != MatchRecordStatus::Ready {
            return Ok(false);
        }
        record.host = Some(host);
        Ok(true)
    }

    async fn confirm_room(&self, match_id: &str, room_id: &str, map_number: u32) -> Result<()> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        record.room_id = Some(room_id.to_string());
        record.status = MatchRecordStatus::InProgress;
        let _ = map_number;
        Ok(())
    }

    async fn cancel_match(&self, match_id: &str, end_reason: &str) -> Result<()> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        record.status = MatchRecordStatus::Cancelled;
        record.end_reason = Some(end_reason.to_string());
        record.ended_at = Some(Utc::now());
        Ok(())
    }

    async fn complete_match(
        &self,
        match_id: &str,
        winner: TeamSide,
        score_alpha: i32,
        score_bravo: i32,
        duration_seconds: i64,
    ) -> Result<()> {
        let mut matches = self.matches.write().await;
        let record = matches
            .get_mut(match_id)
            .ok_or_else(|| CoordinatorError::MatchNotFound(match_id.to_string()))?;
        record.status = MatchRecordStatus::Completed;
        record.winner_team = Some(winner);
        record.score_alpha = score_alpha;
        record.score_bravo = score_bravo;
        record.duration_seconds = Some(duration_seconds);
        record.ended_at = Some(Utc::now());
        Ok(())
    }

    async fn insert_player_results(&self, rows: &[PlayerResultRow]) -> Result<()> {
        let mut results = self.player_results.write().await;
        for row in rows {
            // Upsert on (match_id, player_id) keeps settlement idempotent.
            results.retain(|r| !(r.match_id == row.match_id && r.player_id == row.player_id));
            results.push(row.clone());
        }
        Ok(())
    }

    async fn load_player_stats(&self, id: PlayerId) -> Result<Option<PlayerStatsRow>> {
        let all = self.player_stats.read().await;
        Ok(all.get(&id).cloned())
    }

    async fn upsert_player_stats(&self, stats: &PlayerStatsRow) -> Result<()> {
        let mut all = self.player_stats.write().await;
        all.insert(stats.player_id, stats.clone());
        Ok(())
    }
}
